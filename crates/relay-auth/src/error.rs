use relay_cache::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("not authorization data")]
    Missing,

    #[error("authorization data invalidate")]
    Malformed,

    #[error("authorization data expiration")]
    Rejected,

    #[error("session cache unavailable: {0}")]
    CacheUnavailable(#[source] StoreError),

    #[error("checking login information failed")]
    LoginInvalid,

    #[error("login persistence failed: {0}")]
    LoginPersist(#[source] StoreError),
}

impl AuthError {
    pub fn code(&self) -> i32 {
        match self {
            Self::Missing => -10,
            Self::Malformed => -11,
            Self::Rejected => -12,
            Self::CacheUnavailable(_) => -13,
            Self::LoginInvalid => -101,
            Self::LoginPersist(_) => -102,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
