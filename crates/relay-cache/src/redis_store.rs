//! Redis-backed session store.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, ClientTlsConfig, TlsCertificates};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::{Keep, Result, SessionStore, StoreError};

const DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings for the session cache.
///
/// A zero port or empty address means no server is configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub redis_address: String,
    pub redis_port: u16,
    pub redis_user: String,
    pub redis_pass: String,
    pub redis_db: i64,
    pub redis_tls_ca: Option<String>,
    pub redis_tls_crt: Option<String>,
    pub redis_tls_key: Option<String>,
    /// `> 0` TTL seconds, `0` no expiry, `-1` retain effectively forever.
    pub keep_secs: i64,
    pub heartbeat_secs: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            redis_address: "127.0.0.1".to_string(),
            redis_port: 0,
            redis_user: String::new(),
            redis_pass: String::new(),
            redis_db: 0,
            redis_tls_ca: None,
            redis_tls_crt: None,
            redis_tls_key: None,
            keep_secs: 86_400,
            heartbeat_secs: 30,
        }
    }
}

impl RedisConfig {
    pub fn is_configured(&self) -> bool {
        self.redis_port != 0 && !self.redis_address.trim().is_empty()
    }

    /// Mutual TLS is used only when CA, certificate and key are all set.
    pub fn uses_tls(&self) -> bool {
        [&self.redis_tls_ca, &self.redis_tls_crt, &self.redis_tls_key]
            .iter()
            .all(|p| p.as_deref().is_some_and(|p| !p.trim().is_empty()))
    }

    pub fn keep(&self) -> Keep {
        Keep::from_secs(self.keep_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }

    pub fn connection_url(&self) -> Result<Url> {
        let scheme = if self.uses_tls() { "rediss" } else { "redis" };
        let raw = format!(
            "{}://{}:{}/{}",
            scheme,
            self.redis_address.trim(),
            self.redis_port,
            self.redis_db
        );
        let mut url = Url::parse(&raw).map_err(|e| StoreError::Config(format!("{raw}: {e}")))?;
        if !self.redis_user.is_empty() {
            url.set_username(&self.redis_user)
                .map_err(|_| StoreError::Config("invalid redis user".into()))?;
        }
        if !self.redis_pass.is_empty() {
            url.set_password(Some(&self.redis_pass))
                .map_err(|_| StoreError::Config("invalid redis password".into()))?;
        }
        Ok(url)
    }

    fn certificates(&self) -> Result<TlsCertificates> {
        let read = |path: &Option<String>| -> Result<Vec<u8>> {
            let path = path.as_deref().unwrap_or_default();
            std::fs::read(path).map_err(|source| StoreError::Certificate {
                path: path.to_string(),
                source,
            })
        };
        Ok(TlsCertificates {
            client_tls: Some(ClientTlsConfig {
                client_cert: read(&self.redis_tls_crt)?,
                client_key: read(&self.redis_tls_key)?,
            }),
            root_cert: Some(read(&self.redis_tls_ca)?),
        })
    }
}

pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let url = config.connection_url()?;
        let client = if config.uses_tls() {
            redis::Client::build_with_tls(url.as_str(), config.certificates()?)?
        } else {
            redis::Client::open(url.as_str())?
        };

        let conn = tokio::time::timeout(DIAL_TIMEOUT, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| StoreError::Timeout(DIAL_TIMEOUT))??;

        let store = Self { conn };
        store.ping().await?;
        info!(
            address = %config.redis_address,
            port = config.redis_port,
            db = config.redis_db,
            tls = config.uses_tls(),
            "Connected to redis"
        );
        Ok(store)
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, keep: Keep) -> Result<()> {
        let mut conn = self.conn.clone();
        match keep.ttl() {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1)).await?,
            None => conn.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
