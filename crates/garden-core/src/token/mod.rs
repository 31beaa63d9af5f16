//! Signed session tokens.
//!
//! Tokens are HMAC-SHA256 based, scoped to a user, a role, and an expiry.
//! Format: `garden_st_<user_id>_<role>_<expires_unix>_<hmac_hex>`

pub mod guard;

use chrono::{Duration, Utc};
use garden_db::models::Role;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_PREFIX: &str = "garden_st_";

/// Environment variable holding the hex-encoded signing secret.
pub const TOKEN_SECRET_ENV: &str = "GARDEN_TOKEN_SECRET";

/// Default session lifetime.
pub const DEFAULT_TTL_HOURS: i64 = 24;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token format: {0}")]
    InvalidFormat(String),

    #[error("invalid user ID in token: {0}")]
    InvalidUserId(String),

    #[error("invalid role in token: {0}")]
    InvalidRole(String),

    #[error("invalid expiry in token: {0}")]
    InvalidExpiry(String),

    #[error("token HMAC verification failed")]
    HmacMismatch,

    #[error("token expired")]
    Expired,

    #[error("missing token secret")]
    MissingSecret,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// The HMAC secret key bytes.
    pub secret: Vec<u8>,
    pub ttl: Duration,
}

impl TokenConfig {
    /// Config with the given HMAC secret and the default session TTL.
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            secret,
            ttl: Duration::hours(DEFAULT_TTL_HOURS),
        }
    }

    /// Override how long issued tokens stay valid.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Read the hex-encoded secret from `GARDEN_TOKEN_SECRET`.
    pub fn from_env() -> Result<Self, TokenError> {
        let secret_hex = std::env::var(TOKEN_SECRET_ENV).map_err(|_| TokenError::MissingSecret)?;
        let secret = hex::decode(&secret_hex).map_err(|e| {
            TokenError::InvalidFormat(format!("{TOKEN_SECRET_ENV} is not valid hex: {e}"))
        })?;
        Ok(Self::new(secret))
    }
}

/// Claims carried by a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: Uuid,
    pub role: Role,
    /// Unix seconds.
    pub expires_at: i64,
}

/// Issue a token for `user_id` valid for the configured TTL from now.
pub fn issue_token(config: &TokenConfig, user_id: Uuid, role: Role) -> String {
    let expires_at = (Utc::now() + config.ttl).timestamp();
    generate_token(config, user_id, role, expires_at)
}

/// The HMAC covers `<user_id>:<role>:<expires_at>`.
pub fn generate_token(config: &TokenConfig, user_id: Uuid, role: Role, expires_at: i64) -> String {
    let message = signed_message(user_id, role, expires_at);
    let mac = compute_hmac(&config.secret, message.as_bytes());
    format!(
        "{TOKEN_PREFIX}{user_id}_{role}_{expires_at}_{}",
        hex::encode(mac)
    )
}

/// Validate a token against the current time.
pub fn validate_token(config: &TokenConfig, token: &str) -> Result<SessionClaims, TokenError> {
    validate_token_at(config, token, Utc::now().timestamp())
}

/// Validate a token against an explicit clock (unix seconds).
///
/// The signature is checked before the expiry, so a forged token always
/// reports `HmacMismatch`.
pub fn validate_token_at(
    config: &TokenConfig,
    token: &str,
    now: i64,
) -> Result<SessionClaims, TokenError> {
    let rest = token.strip_prefix(TOKEN_PREFIX).ok_or_else(|| {
        TokenError::InvalidFormat(format!("token must start with '{TOKEN_PREFIX}'"))
    })?;

    // <user_id>_<role>_<expires_at>_<hmac_hex>; a UUID is 36 chars.
    if rest.len() < 36 || !rest.is_char_boundary(36) {
        return Err(TokenError::InvalidFormat(
            "token too short to contain a valid UUID".to_string(),
        ));
    }
    let (user_id_str, after_user) = rest.split_at(36);
    let user_id =
        Uuid::parse_str(user_id_str).map_err(|e| TokenError::InvalidUserId(e.to_string()))?;

    let after_user = after_user.strip_prefix('_').ok_or_else(|| {
        TokenError::InvalidFormat("expected underscore after user_id".to_string())
    })?;

    let mut parts = after_user.splitn(3, '_');
    let (Some(role_str), Some(expires_str), Some(hmac_hex)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::InvalidFormat(
            "expected <role>_<expires>_<hmac> after user_id".to_string(),
        ));
    };

    let role: Role = role_str
        .parse()
        .map_err(|e: garden_db::models::RoleParseError| TokenError::InvalidRole(e.to_string()))?;
    let expires_at: i64 = expires_str
        .parse()
        .map_err(|e: std::num::ParseIntError| TokenError::InvalidExpiry(e.to_string()))?;

    let provided_mac = hex::decode(hmac_hex)
        .map_err(|e| TokenError::InvalidFormat(format!("invalid hex in hmac: {e}")))?;

    let message = signed_message(user_id, role, expires_at);
    verify_hmac_constant_time(&config.secret, message.as_bytes(), &provided_mac)?;

    if now >= expires_at {
        return Err(TokenError::Expired);
    }

    Ok(SessionClaims {
        user_id,
        role,
        expires_at,
    })
}

fn signed_message(user_id: Uuid, role: Role, expires_at: i64) -> String {
    format!("{user_id}:{role}:{expires_at}")
}

fn compute_hmac(key: &[u8], message: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

fn verify_hmac_constant_time(
    key: &[u8],
    message: &[u8],
    expected_mac: &[u8],
) -> Result<(), TokenError> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(message);
    mac.verify_slice(expected_mac)
        .map_err(|_| TokenError::HmacMismatch)
}
