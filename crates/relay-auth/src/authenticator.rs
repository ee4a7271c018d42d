use chrono::Local;
use rand::Rng;
use relay_cache::{SessionCache, StoreError};
use relay_geoip::GeoIpCache;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::record::format_time;
use crate::{
    auth_key, login_key, AccountId, AuthError, AuthRecord, Credential, LoginEntry, LoginGrant,
    LoginSession, Result,
};

/// Login input after transport decoding.
#[derive(Debug, Clone, Default)]
pub struct LoginRequest {
    pub idx: String,
    pub device_uid: String,
    pub ip_address: String,
}

/// Issues and verifies code/token pairs against the session cache.
#[derive(Debug, Clone)]
pub struct Authenticator {
    cache: SessionCache,
    geo: Option<GeoIpCache>,
}

impl Authenticator {
    pub fn new(cache: SessionCache, geo: Option<GeoIpCache>) -> Self {
        Self { cache, geo }
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    async fn localize(&self, addr: &str) -> String {
        match &self.geo {
            Some(geo) => geo.localize(addr).await,
            None => String::new(),
        }
    }

    /// Issues a fresh code and token for `(idx, device_uid)`.
    ///
    /// Both the login session and the auth record must be written; a failure
    /// of either is reported as [`AuthError::LoginPersist`].
    pub async fn login(&self, request: LoginRequest) -> Result<LoginGrant> {
        let account = AccountId::parse(&request.idx).ok_or(AuthError::LoginInvalid)?;
        let idx = account.as_str();
        let device_uid = request.device_uid.trim().to_string();

        let now = Local::now();
        let (auth_code, auth_token) = issue_pair(idx, now.timestamp_micros());
        let time = format_time(&now);
        let ip_localized = self.localize(&request.ip_address).await;

        // An undecodable session is replaced rather than locking the account out.
        let mut session = match self.cache.get_json::<LoginSession>(&login_key(idx)).await {
            Ok(session) => session.unwrap_or_else(|| LoginSession::new(idx)),
            Err(StoreError::Encoding(e)) => {
                warn!(idx = %idx, error = %e, "Discarding unreadable login session");
                LoginSession::new(idx)
            }
            Err(e) => return Err(AuthError::LoginPersist(e)),
        };
        session.upsert(LoginEntry {
            auth_code: auth_code.clone(),
            auth_token: auth_token.clone(),
            create_time: time.clone(),
            login_time: time.clone(),
            ip_address: request.ip_address.clone(),
            ip_localized: ip_localized.clone(),
            device_uid: device_uid.clone(),
        });

        let record = AuthRecord {
            idx: idx.to_string(),
            auth_code: auth_code.clone(),
            auth_token: auth_token.clone(),
            create_time: time.clone(),
            auth_time: time.clone(),
            auth_count: 1,
            ip_address: request.ip_address.clone(),
            ip_localized,
            device_uid: device_uid.clone(),
        };

        self.cache
            .set_json(&login_key(idx), &session)
            .await
            .map_err(AuthError::LoginPersist)?;
        self.cache
            .set_json(&auth_key(idx, &auth_token), &record)
            .await
            .map_err(AuthError::LoginPersist)?;

        info!(idx = %idx, device = %device_uid, devices = session.list.len(), "Login issued");
        Ok(LoginGrant {
            idx: idx.to_string(),
            auth_code,
            auth_token,
            timestamp: now.timestamp_millis(),
            create_time: time,
            ip_address: request.ip_address,
            device_uid,
        })
    }

    /// Checks `credential` against its stored record and records the use.
    ///
    /// The counter update is a plain read-increment-write without a lock, so
    /// concurrent verifications of one token may lose an increment.
    pub async fn verify(&self, credential: &Credential, remote_addr: &str) -> Result<AuthRecord> {
        self.verify_with(credential, remote_addr, |record| {
            record.auth_token == credential.token.as_str()
        })
        .await
    }

    /// Like [`Self::verify`], but compares the issued code instead of the token.
    pub async fn verify_by_code(
        &self,
        credential: &Credential,
        code: &str,
        remote_addr: &str,
    ) -> Result<AuthRecord> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::Malformed);
        }
        self.verify_with(credential, remote_addr, |record| record.auth_code == code)
            .await
    }

    async fn verify_with<F>(
        &self,
        credential: &Credential,
        remote_addr: &str,
        matches: F,
    ) -> Result<AuthRecord>
    where
        F: Fn(&AuthRecord) -> bool,
    {
        let idx = credential.account.as_str();
        let key = auth_key(idx, credential.token.as_str());

        let mut record = self
            .cache
            .get_json::<AuthRecord>(&key)
            .await
            .map_err(AuthError::CacheUnavailable)?
            .ok_or(AuthError::Rejected)?;
        if record.idx != idx || !matches(&record) {
            warn!(idx = %idx, "Credential does not match stored record");
            return Err(AuthError::Rejected);
        }

        record.auth_count += 1;
        record.auth_time = format_time(&Local::now());
        self.cache
            .set_json(&key, &record)
            .await
            .map_err(AuthError::CacheUnavailable)?;

        record.ip_address = remote_addr.to_string();
        record.ip_localized = self.localize(remote_addr).await;
        debug!(idx = %idx, count = record.auth_count, "Credential verified");
        Ok(record)
    }
}

/// Six-digit code and the uppercase SHA-256 token for `idx` at `micros`.
fn issue_pair(idx: &str, micros: i64) -> (String, String) {
    let mut rng = rand::thread_rng();
    let code = rng.gen_range(100_000..=999_999u32).to_string();
    let salt = rng.gen_range(100_000..=999_999u32);
    let digest = Sha256::digest(format!("{idx}_{micros}_{salt}").as_bytes());
    (code, hex::encode_upper(digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthToken;

    #[test]
    fn test_issue_pair_shapes() {
        let (code, token) = issue_pair("123456", 1_700_000_000_000_000);
        assert_eq!(code.len(), 6);
        assert!(code.bytes().all(|b| b.is_ascii_digit()));
        assert_eq!(token.len(), 64);
        assert_eq!(token, token.to_uppercase());
        assert!(AuthToken::parse(&token).is_some());
    }
}
