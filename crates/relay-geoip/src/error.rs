use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("geo store error: {0}")]
    Store(#[from] redb::Error),

    #[error("geo record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("geo lookup failed: {0}")]
    Lookup(#[from] relay_httpx::HttpError),

    #[error("geo lookup returned no usable result: {0}")]
    Rejected(String),

    #[error("geo store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub(crate) fn store_err(e: impl Into<redb::Error>) -> GeoError {
    GeoError::Store(e.into())
}

pub type Result<T> = std::result::Result<T, GeoError>;
