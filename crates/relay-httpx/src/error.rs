//! Upstream client error types

use std::time::Duration;

use thiserror::Error;

use crate::Content;

/// Code reported for transport and connect failures.
pub const TRANSPORT_FAILURE: i32 = -1;
/// Code reported when the response body cannot be read.
pub const BODY_READ_FAILURE: i32 = -2;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid request url: {0}")]
    InvalidUrl(String),

    #[error("invalid request header: {0}")]
    InvalidHeader(String),

    #[error("Request timeout ({}ms)", .elapsed.as_millis())]
    Timeout { elapsed: Duration },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("response body read failed: {0}")]
    BodyRead(String),

    #[error("Read stream chunked timeout. ({}ms)", .elapsed.as_millis())]
    StreamTimeout { elapsed: Duration },

    #[error("Read stream chunked error: {0}")]
    StreamRead(String),

    /// The upstream answered with something other than `200 OK`.
    #[error("{status} {reason}")]
    Status {
        status: u16,
        reason: String,
        body: Content,
    },
}

impl HttpError {
    /// Numeric code carried in the `error_code` field of client envelopes.
    ///
    /// Local faults are negative; upstream replies keep their HTTP status so
    /// that a `401` stays distinguishable from a broken connection.
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidUrl(_)
            | Self::InvalidHeader(_)
            | Self::Timeout { .. }
            | Self::Transport(_) => TRANSPORT_FAILURE,
            Self::BodyRead(_) | Self::StreamTimeout { .. } | Self::StreamRead(_) => {
                BODY_READ_FAILURE
            }
            Self::Status { status, .. } => i32::from(*status),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::StreamTimeout { .. })
    }

    /// Decoded upstream body, present only for [`HttpError::Status`].
    pub fn body(&self) -> Option<&Content> {
        match self {
            Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_taxonomy() {
        let timeout = HttpError::Timeout {
            elapsed: Duration::from_millis(3004),
        };
        assert_eq!(timeout.code(), -1);
        assert_eq!(timeout.to_string(), "Request timeout (3004ms)");

        assert_eq!(HttpError::BodyRead("eof".into()).code(), -2);
        assert_eq!(
            HttpError::StreamTimeout {
                elapsed: Duration::from_millis(60_000)
            }
            .to_string(),
            "Read stream chunked timeout. (60000ms)"
        );

        let status = HttpError::Status {
            status: 401,
            reason: "Unauthorized".into(),
            body: Content::Text(String::new()),
        };
        assert_eq!(status.code(), 401);
        assert_eq!(status.to_string(), "401 Unauthorized");
        assert!(status.body().is_some());
    }
}
