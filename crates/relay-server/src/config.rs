//! Configuration from `config.yaml` and environment variables.
//!
//! ```yaml
//! server:
//!   port: 8080
//! upstream:
//!   openai_api_url: "https://api.openai.com"
//!   openai_api_key: "sk-..."
//! redis:
//!   redis_address: "127.0.0.1"
//!   redis_port: 6379
//!   keep_secs: -1
//! geoip:
//!   db_path: "./ipv4.db"
//! ```
//!
//! **Environment variables** (applied after the file):
//! - `PORT`: listen port
//! - `OPENAI_API_URL`, `OPENAI_API_KEY`, `OPENAI_API_ORG`: upstream API
//! - `REQUEST_TIMEOUT_SECS`: completions response-start timeout

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use relay_cache::RedisConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub redis: RedisConfig,
    pub geoip: GeoIpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub ipv6: bool,
    pub port: u16,
    /// Every route is also mounted under this prefix. Empty disables it.
    pub route_prefix_alias: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            ipv6: false,
            port: 8080,
            route_prefix_alias: "/server".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub openai_api_url: String,
    pub openai_api_key: String,
    pub openai_api_org: String,
    pub request_timeout_secs: u64,
    pub stream_idle_timeout_secs: u64,
    pub skip_tls_verify: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            openai_api_url: "https://api.openai.com".to_string(),
            openai_api_key: String::new(),
            openai_api_org: String::new(),
            request_timeout_secs: 30,
            stream_idle_timeout_secs: 60,
            skip_tls_verify: true,
        }
    }
}

impl UpstreamConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_idle_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoIpConfig {
    pub db_path: PathBuf,
    pub provider_url: String,
    pub lang: String,
}

impl Default for GeoIpConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./ipv4.db"),
            provider_url: relay_geoip::DEFAULT_PROVIDER_URL.to_string(),
            lang: "en".to_string(),
        }
    }
}

impl RelayConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml_ng::from_str(content).context("Failed to parse relay config")
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        Self::from_yaml_str(&content).with_context(|| format!("Invalid config file {:?}", path))
    }

    /// Loads `path`, or `config.yaml` when present, then applies environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_yaml_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(url) = lookup("OPENAI_API_URL") {
            self.upstream.openai_api_url = url;
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.upstream.openai_api_key = key;
        }
        if let Some(org) = lookup("OPENAI_API_ORG") {
            self.upstream.openai_api_org = org;
        }
        if let Some(secs) = lookup("REQUEST_TIMEOUT_SECS").and_then(|p| p.parse().ok()) {
            self.upstream.request_timeout_secs = secs;
        }
    }

    pub fn bind_address(&self) -> String {
        let host = if self.server.ipv6 {
            "[::]"
        } else if self.server.address.trim().is_empty() {
            "0.0.0.0"
        } else {
            self.server.address.trim()
        };
        format!("{}:{}", host, self.server.port)
    }
}
