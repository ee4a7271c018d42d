//! Chat-completion request normalization.

use serde_json::{Map, Value};

use crate::KnownModels;

pub const DEFAULT_USER: &str = "id0000";

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub body: Map<String, Value>,
    pub model: String,
    pub user: String,
}

/// Applies the fixed sampling parameters and resolves the model.
///
/// `max_tokens` is 2048, or 4096 for the `gpt-4` family.
pub fn normalize(mut body: Map<String, Value>, models: &KnownModels) -> Completion {
    body.insert("temperature".into(), Value::from(1));
    body.insert("top_p".into(), Value::from(1));
    body.insert("presence_penalty".into(), Value::from(0));
    body.insert("frequency_penalty".into(), Value::from(0));
    body.insert("stream".into(), Value::Bool(true));
    body.insert("stop".into(), Value::Null);

    let user = body
        .get("user")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_USER)
        .trim()
        .to_lowercase();

    let model = models.resolve(body.get("model").and_then(Value::as_str));
    let max_tokens = if model.contains("gpt-4") { 4096 } else { 2048 };
    body.insert("max_tokens".into(), Value::from(max_tokens));
    body.insert("model".into(), Value::String(model.clone()));

    Completion { body, model, user }
}
