use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{Keep, MemoryStore, RedisConfig, RedisStore, Result, SessionStore};

/// Typed JSON view over a [`SessionStore`].
#[derive(Clone)]
pub struct SessionCache {
    store: Arc<dyn SessionStore>,
    keep: Keep,
}

impl SessionCache {
    pub fn new(store: Arc<dyn SessionStore>, keep: Keep) -> Self {
        Self { store, keep }
    }

    pub fn in_memory(keep: Keep) -> Self {
        Self::new(Arc::new(MemoryStore::new()), keep)
    }

    /// Connects to Redis, or falls back to the in-memory store when no server
    /// is configured.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        if !config.is_configured() {
            warn!("No redis server configured, using in-memory session cache");
            return Ok(Self::in_memory(config.keep()));
        }
        let store = RedisStore::connect(config).await?;
        Ok(Self::new(Arc::new(store), config.keep()))
    }

    pub fn keep(&self) -> Keep {
        self.keep
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Stores `value` with the cache's configured retention.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, &raw, self.keep).await
    }

    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    /// Pings the backend every `every` until the returned task is aborted.
    pub fn spawn_heartbeat(&self, every: Duration) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match store.ping().await {
                    Ok(()) => debug!(backend = store.backend(), "Cache heartbeat ok"),
                    Err(e) => warn!(backend = store.backend(), error = %e, "Cache heartbeat failed"),
                }
            }
        })
    }
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCache")
            .field("backend", &self.store.backend())
            .field("keep", &self.keep)
            .finish()
    }
}
