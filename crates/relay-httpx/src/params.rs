use std::fmt;

use url::Url;

/// A query parameter value, rendered by type.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{:.6}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Str(v) => f.write_str(v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// Ordered query parameters appended to a request URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams(Vec<(String, ParamValue)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.push((key.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Appends every pair to `url`, percent-encoding keys and values.
    pub fn apply_to(&self, url: &mut Url) {
        if self.0.is_empty() {
            return;
        }
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &self.0 {
            pairs.append_pair(key, &value.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_rendering() {
        assert_eq!(ParamValue::from(42).to_string(), "42");
        assert_eq!(ParamValue::from(1.5).to_string(), "1.500000");
        assert_eq!(ParamValue::from(false).to_string(), "false");
        assert_eq!(ParamValue::from("en").to_string(), "en");
    }

    #[test]
    fn test_apply_encodes_values() {
        let mut url = Url::parse("http://ip-api.com/json/8.8.8.8").unwrap();
        QueryParams::new()
            .with("lang", "en")
            .with("fields", "status,message,country")
            .with("q", "a b&c")
            .apply_to(&mut url);
        assert_eq!(
            url.as_str(),
            "http://ip-api.com/json/8.8.8.8?lang=en&fields=status%2Cmessage%2Ccountry&q=a+b%26c"
        );
    }

    #[test]
    fn test_apply_keeps_existing_query() {
        let mut url = Url::parse("http://localhost/v1/models?a=1").unwrap();
        QueryParams::new().with("b", true).apply_to(&mut url);
        assert_eq!(url.query(), Some("a=1&b=true"));
    }
}
