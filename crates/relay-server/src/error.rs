use relay_auth::AuthError;
use relay_httpx::HttpError;
use thiserror::Error;

/// Failures of a single inbound request.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Your HTTP request body is null. Rejected your request.")]
    BodyMissing,

    #[error("Your HTTP request body is incomplete ({received} of {expected} bytes). Rejected your request.")]
    BodyTruncated { expected: usize, received: usize },

    #[error("Your HTTP request body could not be read. Rejected your request.")]
    BodyUnreadable,

    #[error("Your HTTP request body is not valid gzip. Rejected your request.")]
    BodyEncoding,

    #[error("Your HTTP request body not in JSON format. Rejected your request.")]
    BodyNotJson,

    #[error("Request payload data error.")]
    PayloadNotObject,

    #[error("Not found openai models")]
    ModelsUnavailable,

    #[error("{0}")]
    LoginParams(String),

    #[error("Write stream failed.")]
    StreamWrite,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Upstream(#[from] HttpError),
}

impl BridgeError {
    pub fn code(&self) -> i32 {
        match self {
            Self::BodyMissing
            | Self::BodyTruncated { .. }
            | Self::BodyUnreadable
            | Self::BodyEncoding
            | Self::BodyNotJson => -9,
            Self::PayloadNotObject | Self::ModelsUnavailable => -1,
            Self::LoginParams(_) => -100,
            Self::StreamWrite => -10,
            Self::Auth(e) => e.code(),
            Self::Upstream(e) => e.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(BridgeError::BodyMissing.code(), -9);
        assert_eq!(BridgeError::BodyNotJson.code(), -9);
        assert_eq!(BridgeError::PayloadNotObject.code(), -1);
        assert_eq!(BridgeError::LoginParams("bad".into()).code(), -100);
        assert_eq!(BridgeError::from(AuthError::Malformed).code(), -11);
        assert_eq!(
            BridgeError::from(AuthError::Rejected).to_string(),
            "authorization data expiration"
        );
    }
}
