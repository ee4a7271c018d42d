//! Login, token issuing and credential verification.
//!
//! A login writes two cache entries: the account's [`LoginSession`] under
//! `login_user_{idx}` and an [`AuthRecord`] under `auth_user_{idx}_{token}`.
//! Verification reads the latter, bumps its counter and writes it back.

mod authenticator;
mod credential;
mod error;
mod record;

pub use authenticator::{Authenticator, LoginRequest};
pub use credential::{AccountId, AuthToken, Credential, ACCOUNT_ID_MAX_LEN, ACCOUNT_ID_MIN_LEN};
pub use error::{AuthError, Result};
pub use record::{auth_key, login_key, AuthRecord, LoginEntry, LoginGrant, LoginSession};
