//! Known-models table, loaded once before the router is built.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::upstream::OpenAiUpstream;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const BUILTIN_MODELS: [&str; 2] = ["gpt-3.5-turbo", "gpt-4"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub owned_by: String,
}

impl ModelEntry {
    fn builtin(id: &str) -> Self {
        Self {
            id: id.to_string(),
            object: "model".to_string(),
            created: 0,
            owned_by: "openai".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnownModels {
    entries: Vec<ModelEntry>,
}

impl KnownModels {
    pub fn new(entries: Vec<ModelEntry>) -> Self {
        Self { entries }
    }

    pub fn builtin() -> Self {
        Self::new(BUILTIN_MODELS.iter().map(|id| ModelEntry::builtin(id)).collect())
    }

    /// Parses a `{"object":"list","data":[...]}` body.
    pub fn from_value(value: Value) -> Option<Self> {
        let list: ModelList = serde_json::from_value(value).ok()?;
        Some(Self::new(list.data))
    }

    /// Fetches the upstream list, falling back to the built-in table when the
    /// upstream is unreachable or returns nothing usable.
    pub async fn load(upstream: &OpenAiUpstream) -> Self {
        match upstream.models().await {
            Ok(content) => match Self::from_value(content.to_value()) {
                Some(models) if !models.is_empty() => {
                    info!(count = models.len(), "Loaded upstream models");
                    models
                }
                _ => {
                    warn!("Upstream models list unusable, using built-in models");
                    Self::builtin()
                }
            },
            Err(e) => {
                warn!(error = %e, code = e.code(), "Models request failed, using built-in models");
                Self::builtin()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&ModelEntry> {
        self.entries.iter().find(|m| m.id == id)
    }

    /// Normalized model id for a request: trimmed, lowercased, and replaced
    /// by the default when unknown.
    pub fn resolve(&self, requested: Option<&str>) -> String {
        let id = requested
            .map(|m| m.trim().to_lowercase())
            .unwrap_or_default();
        if self.find(&id).is_some() {
            id
        } else {
            DEFAULT_MODEL.to_string()
        }
    }

    pub fn to_list(&self) -> Value {
        json!({
            "object": "list",
            "data": self.entries,
        })
    }
}
