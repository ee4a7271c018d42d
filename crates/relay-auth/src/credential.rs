//! Credential shapes: `"{account_id}-{token}"`.

use std::fmt;

use crate::{AuthError, Result};

pub const ACCOUNT_ID_MIN_LEN: usize = 6;
pub const ACCOUNT_ID_MAX_LEN: usize = 12;
const TOKEN_LENGTHS: [usize; 3] = [16, 32, 64];

/// A numeric account identifier of 6 to 12 digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountId(String);

impl AccountId {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let valid = (ACCOUNT_ID_MIN_LEN..=ACCOUNT_ID_MAX_LEN).contains(&raw.len())
            && raw.bytes().all(|b| b.is_ascii_digit());
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An alphanumeric token of length 16, 32 or 64.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let valid = TOKEN_LENGTHS.contains(&raw.len())
            && raw.bytes().all(|b| b.is_ascii_alphanumeric());
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "AuthToken({prefix}…)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub account: AccountId,
    pub token: AuthToken,
}

impl Credential {
    /// Parses an `Authorization` value. A leading `Bearer ` is ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let text = strip_bearer(text.trim());
        if text.is_empty() {
            return Err(AuthError::Missing);
        }

        let (idx, token) = text.split_once('-').unwrap_or((text, ""));
        Self::from_parts(idx, token)
    }

    pub fn from_parts(idx: &str, token: &str) -> Result<Self> {
        if idx.trim().is_empty() && token.trim().is_empty() {
            return Err(AuthError::Missing);
        }
        let account = AccountId::parse(idx).ok_or(AuthError::Malformed)?;
        let token = AuthToken::parse(token).ok_or(AuthError::Malformed)?;
        Ok(Self { account, token })
    }
}

fn strip_bearer(text: &str) -> &str {
    match text.get(..6) {
        Some(scheme)
            if scheme.eq_ignore_ascii_case("bearer")
                && text[6..].chars().next().map_or(true, char::is_whitespace) =>
        {
            text[6..].trim()
        }
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN32: &str = "0123456789abcdefABCDEF0123456789";

    #[test]
    fn test_account_id_length_boundaries() {
        assert!(AccountId::parse("1234").is_none());
        assert!(AccountId::parse("12345").is_none());
        assert!(AccountId::parse("123456").is_some());
        assert!(AccountId::parse("123456789012").is_some());
        assert!(AccountId::parse("1234567890123").is_none());
        assert!(AccountId::parse("12345a").is_none());
    }

    #[test]
    fn test_token_lengths() {
        assert!(AuthToken::parse(&"a".repeat(16)).is_some());
        assert!(AuthToken::parse(TOKEN32).is_some());
        assert!(AuthToken::parse(&"F".repeat(64)).is_some());
        assert!(AuthToken::parse(&"a".repeat(31)).is_none());
        assert!(AuthToken::parse("bad").is_none());
        assert!(AuthToken::parse(&format!("{}-", "a".repeat(15))).is_none());
    }

    #[test]
    fn test_parse_header_forms() {
        let plain = Credential::parse(&format!("123456-{TOKEN32}")).unwrap();
        assert_eq!(plain.account.as_str(), "123456");
        assert_eq!(plain.token.as_str(), TOKEN32);

        let bearer = Credential::parse(&format!("Bearer 123456-{TOKEN32}")).unwrap();
        assert_eq!(bearer, plain);
    }

    #[test]
    fn test_parse_failures() {
        assert!(matches!(Credential::parse(""), Err(AuthError::Missing)));
        assert!(matches!(Credential::parse("Bearer "), Err(AuthError::Missing)));
        assert!(matches!(
            Credential::parse("123456-bad"),
            Err(AuthError::Malformed)
        ));
        assert!(matches!(
            Credential::parse(&format!("1234-{TOKEN32}")),
            Err(AuthError::Malformed)
        ));
        assert!(matches!(Credential::parse("123456"), Err(AuthError::Malformed)));
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = AuthToken::parse(TOKEN32).unwrap();
        assert_eq!(format!("{:?}", token), "AuthToken(0123…)");
    }
}
