use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{Keep, Result};

/// Expired entries are swept once every this many writes, and on every ping.
const SWEEP_INTERVAL: usize = 256;

type Entries = HashMap<String, (String, Option<Instant>)>;

/// A string key-value store with per-entry retention.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str, keep: Keep) -> Result<()>;

    /// Liveness check.
    async fn ping(&self) -> Result<()>;

    fn backend(&self) -> &'static str;
}

/// Process-local store, used when no cache server is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Entries>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|(_, expires)| expires.map_or(true, |at| at > now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        sweep(&mut self.entries.lock(), Instant::now())
    }
}

fn sweep(entries: &mut Entries, now: Instant) -> usize {
    let before = entries.len();
    entries.retain(|_, (_, expires)| expires.map_or(true, |at| at > now));
    before - entries.len()
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((_, Some(expires))) if *expires <= Instant::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, keep: Keep) -> Result<()> {
        let now = Instant::now();
        let expires = keep.ttl().and_then(|ttl| now.checked_add(ttl));
        let mut entries = self.entries.lock();
        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            sweep(&mut entries, now);
        }
        entries.insert(key.to_string(), (value.to_string(), expires));
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.purge_expired();
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
