//! Inbound request body decoding.

use std::io::Read;

use axum::body::{to_bytes, Body};
use axum::http::header::{CONTENT_ENCODING, CONTENT_LENGTH};
use axum::http::HeaderMap;
use bytes::Bytes;
use flate2::read::GzDecoder;
use serde_json::{Map, Value};
use tracing::warn;

use crate::BridgeError;

pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Reads the whole body, checking it against `Content-Length` and inflating
/// gzip. Returns an empty buffer for an empty body.
pub async fn read_body(headers: &HeaderMap, body: Body) -> Result<Bytes, BridgeError> {
    let raw = to_bytes(body, MAX_BODY_BYTES).await.map_err(|e| {
        warn!(error = %e, "Inbound body read failed");
        BridgeError::BodyUnreadable
    })?;

    let expected = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<usize>().ok());
    if let Some(expected) = expected {
        if raw.len() < expected {
            return Err(BridgeError::BodyTruncated {
                expected,
                received: raw.len(),
            });
        }
    }

    let gzip_declared = headers
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("gzip"));
    if gzip_declared || raw.starts_with(&GZIP_MAGIC) {
        return inflate(&raw);
    }
    Ok(raw)
}

fn inflate(raw: &[u8]) -> Result<Bytes, BridgeError> {
    let mut decoder = GzDecoder::new(raw).take(MAX_BODY_BYTES as u64);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(|e| {
        warn!(error = %e, len = raw.len(), "Inbound gzip body invalid");
        BridgeError::BodyEncoding
    })?;
    Ok(Bytes::from(out))
}

/// Parses a required JSON object body.
pub fn json_object(bytes: &[u8]) -> Result<Map<String, Value>, BridgeError> {
    if bytes.is_empty() {
        return Err(BridgeError::BodyMissing);
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(BridgeError::PayloadNotObject),
        Err(_) => Err(BridgeError::BodyNotJson),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, v.parse().unwrap());
        }
        map
    }

    #[tokio::test]
    async fn test_plain_body() {
        let bytes = read_body(&headers(&[]), Body::from(r#"{"a":1}"#)).await.unwrap();
        assert_eq!(json_object(&bytes).unwrap()["a"], 1);
    }

    #[tokio::test]
    async fn test_gzip_body_inflated() {
        let compressed = gzip(br#"{"model":"gpt-4"}"#);
        let h = headers(&[("content-encoding", "gzip")]);
        let bytes = read_body(&h, Body::from(compressed.clone())).await.unwrap();
        assert_eq!(json_object(&bytes).unwrap()["model"], "gpt-4");

        // Detected by magic bytes without the header.
        let bytes = read_body(&headers(&[]), Body::from(compressed)).await.unwrap();
        assert_eq!(&bytes[..], br#"{"model":"gpt-4"}"#);
    }

    #[tokio::test]
    async fn test_truncated_body_rejected() {
        let h = headers(&[("content-length", "100")]);
        let err = read_body(&h, Body::from("{}")).await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::BodyTruncated {
                expected: 100,
                received: 2
            }
        ));
        assert_eq!(err.code(), -9);
    }

    #[tokio::test]
    async fn test_bad_gzip_rejected() {
        let h = headers(&[("content-encoding", "gzip")]);
        let err = read_body(&h, Body::from("plain")).await.unwrap_err();
        assert!(matches!(err, BridgeError::BodyEncoding));
    }

    #[test]
    fn test_json_object_errors() {
        assert!(matches!(json_object(b""), Err(BridgeError::BodyMissing)));
        assert!(matches!(json_object(b"{oops"), Err(BridgeError::BodyNotJson)));
        assert!(matches!(
            json_object(b"[1,2]"),
            Err(BridgeError::PayloadNotObject)
        ));
    }
}
