use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub(crate) fn format_time(at: &DateTime<Local>) -> String {
    at.format(TIME_FORMAT).to_string()
}

pub fn login_key(idx: &str) -> String {
    format!("login_user_{idx}")
}

pub fn auth_key(idx: &str, token: &str) -> String {
    format!("auth_user_{idx}_{token}")
}

/// Verified-credential entry, keyed by account id and token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthRecord {
    pub idx: String,
    pub auth_code: String,
    pub auth_token: String,
    pub create_time: String,
    pub auth_time: String,
    pub auth_count: u64,
    pub ip_address: String,
    pub ip_localized: String,
    pub device_uid: String,
}

/// Per-device part of a login.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginEntry {
    pub auth_code: String,
    pub auth_token: String,
    pub create_time: String,
    pub login_time: String,
    pub ip_address: String,
    pub ip_localized: String,
    pub device_uid: String,
}

/// One account's logins, at most one entry per device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginSession {
    pub idx: String,
    pub list: BTreeMap<String, LoginEntry>,
}

impl LoginSession {
    pub fn new(idx: &str) -> Self {
        Self {
            idx: idx.to_string(),
            list: BTreeMap::new(),
        }
    }

    /// Inserts or overwrites the device entry, keeping its first creation time.
    pub fn upsert(&mut self, mut entry: LoginEntry) {
        if let Some(existing) = self.list.get(&entry.device_uid) {
            entry.create_time = existing.create_time.clone();
        }
        self.list.insert(entry.device_uid.clone(), entry);
    }
}

/// Login response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginGrant {
    pub idx: String,
    pub auth_code: String,
    pub auth_token: String,
    /// Unix milliseconds at issue.
    pub timestamp: i64,
    pub create_time: String,
    pub ip_address: String,
    pub device_uid: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(device: &str, token: &str, created: &str) -> LoginEntry {
        LoginEntry {
            auth_token: token.into(),
            create_time: created.into(),
            device_uid: device.into(),
            ..LoginEntry::default()
        }
    }

    #[test]
    fn test_keys() {
        assert_eq!(login_key("123456"), "login_user_123456");
        assert_eq!(auth_key("123456", "ABC"), "auth_user_123456_ABC");
    }

    #[test]
    fn test_upsert_preserves_create_time() {
        let mut session = LoginSession::new("123456");
        session.upsert(entry("dev1", "T1", "2024-01-01 00:00:00.000"));
        session.upsert(entry("dev1", "T2", "2024-02-02 00:00:00.000"));
        session.upsert(entry("dev2", "T3", "2024-03-03 00:00:00.000"));

        assert_eq!(session.list.len(), 2);
        let dev1 = &session.list["dev1"];
        assert_eq!(dev1.auth_token, "T2");
        assert_eq!(dev1.create_time, "2024-01-01 00:00:00.000");
    }

    #[test]
    fn test_time_format() {
        let at = Local::now();
        let text = format_time(&at);
        assert_eq!(text.len(), "2024-01-01 00:00:00.000".len());
        assert_eq!(&text[4..5], "-");
        assert_eq!(&text[19..20], ".");
    }
}
