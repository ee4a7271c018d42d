use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache backend error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache value encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("cache connect timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("cache configuration error: {0}")]
    Config(String),

    #[error("failed to read {path}: {source}")]
    Certificate {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;
