//! Access guards for the HTTP layer.
//!
//! Handlers call these explicitly:
//! - [`authenticate`] turns an `Authorization` header into claims
//! - [`require_role`] checks the claims against what the route needs
//!
//! An admin passes every role check.

use garden_db::models::Role;

use super::{SessionClaims, TokenConfig, TokenError, validate_token};

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid session token: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("this action requires the {required} role")]
    Forbidden { required: Role },
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, GuardError> {
    header
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(GuardError::MissingToken)
}

/// Validate the bearer token in `header` and return its claims.
pub fn authenticate(config: &TokenConfig, header: Option<&str>) -> Result<SessionClaims, GuardError> {
    let token = bearer_token(header)?;
    Ok(validate_token(config, token)?)
}

/// Check `claims` carry `required`. Admins pass every check.
pub fn require_role(claims: &SessionClaims, required: Role) -> Result<(), GuardError> {
    if claims.role == Role::Admin || claims.role == required {
        Ok(())
    } else {
        Err(GuardError::Forbidden { required })
    }
}
