//! Decoded HTTP bodies.
//!
//! Bodies are classified once, at the boundary, into [`Content`]. A body that
//! does not parse as JSON is never an error: it degrades to text (or binary
//! when it is not valid UTF-8).

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Object(Map<String, Value>),
    Array(Vec<Value>),
    Text(String),
    Binary(Bytes),
}

/// Coarse classification reported alongside a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Json,
    Text,
    Binary,
}

impl Content {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) => Self::Object(map),
            Ok(Value::Array(items)) => Self::Array(items),
            _ => match std::str::from_utf8(bytes) {
                Ok(text) => Self::Text(text.to_string()),
                Err(_) => Self::Binary(Bytes::copy_from_slice(bytes)),
            },
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Object(_) | Self::Array(_) => ContentKind::Json,
            Self::Text(_) => ContentKind::Text,
            Self::Binary(_) => ContentKind::Binary,
        }
    }

    pub fn is_json(&self) -> bool {
        self.kind() == ContentKind::Json
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Object view of any body.
    ///
    /// Arrays are keyed by their element index; text and binary bodies become
    /// an empty object.
    pub fn into_object_lossy(self) -> Map<String, Value> {
        match self {
            Self::Object(map) => map,
            Self::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            Self::Text(_) | Self::Binary(_) => Map::new(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Object(map) => Value::Object(map.clone()),
            Self::Array(items) => Value::Array(items.clone()),
            Self::Text(text) => Value::String(text.clone()),
            Self::Binary(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_object_and_array() {
        let content = Content::from_bytes(br#"{"object":"list","data":[]}"#);
        assert_eq!(content.kind(), ContentKind::Json);
        assert_eq!(content.as_object().unwrap()["object"], "list");

        let content = Content::from_bytes(b"[1,2]");
        assert!(matches!(content, Content::Array(ref a) if a.len() == 2));
    }

    #[test]
    fn test_non_json_degrades_to_text() {
        let content = Content::from_bytes(b"<html>bad gateway</html>");
        assert_eq!(content, Content::Text("<html>bad gateway</html>".into()));
        assert!(content.into_object_lossy().is_empty());
    }

    #[test]
    fn test_scalar_json_is_text() {
        assert_eq!(Content::from_bytes(b"42").kind(), ContentKind::Text);
        assert_eq!(Content::from_bytes(b"").kind(), ContentKind::Text);
    }

    #[test]
    fn test_invalid_utf8_is_binary() {
        let content = Content::from_bytes(&[0xff, 0xfe, 0x00]);
        assert_eq!(content.kind(), ContentKind::Binary);
    }

    #[test]
    fn test_array_keyed_by_index() {
        let map = Content::Array(vec![json!("a"), json!({"b": 1})]).into_object_lossy();
        assert_eq!(map["0"], "a");
        assert_eq!(map["1"]["b"], 1);
    }
}
