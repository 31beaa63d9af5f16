//! Salted PBKDF2-HMAC-SHA256 password hashes.
//!
//! Stored form: `pbkdf2-sha256$<iterations>$<salt_hex>$<hash_hex>`.
//! Verification is CPU-bound; async callers should run it on a blocking
//! thread.

use std::sync::LazyLock;

use pbkdf2::pbkdf2_hmac;
use rand::Rng;
use sha2::Sha256;

const SCHEME: &str = "pbkdf2-sha256";

pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Upper bound accepted from a stored hash.
pub const MAX_ITERATIONS: u32 = 1_000_000;

const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("malformed password hash: {0}")]
    Malformed(String),

    #[error("unsupported password hash scheme: {0}")]
    UnsupportedScheme(String),

    #[error("iteration count {0} exceeds the limit of {MAX_ITERATIONS}")]
    TooManyIterations(u32),
}

/// Hash `password` with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    hash_password_with(password, DEFAULT_ITERATIONS)
}

/// Hash with an explicit iteration count, clamped to `1..=MAX_ITERATIONS`.
pub fn hash_password_with(password: &str, iterations: u32) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill(&mut salt);
    let iterations = iterations.clamp(1, MAX_ITERATIONS);
    let hash = derive(password, &salt, iterations);
    format!(
        "{SCHEME}${iterations}${}${}",
        hex::encode(salt),
        hex::encode(hash)
    )
}

/// Check `password` against a stored hash.
///
/// Returns `Ok(false)` on a wrong password and `Err` only when the stored
/// value cannot be read.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordError> {
    let parts: Vec<&str> = stored.split('$').collect();
    let [scheme, iterations, salt, hash] = parts.as_slice() else {
        return Err(PasswordError::Malformed(format!(
            "expected 4 fields, got {}",
            parts.len()
        )));
    };
    if *scheme != SCHEME {
        return Err(PasswordError::UnsupportedScheme(scheme.to_string()));
    }
    let iterations: u32 = iterations
        .parse()
        .map_err(|e| PasswordError::Malformed(format!("iterations: {e}")))?;
    if iterations == 0 {
        return Err(PasswordError::Malformed("iterations must be positive".to_string()));
    }
    if iterations > MAX_ITERATIONS {
        return Err(PasswordError::TooManyIterations(iterations));
    }
    let salt = hex::decode(salt).map_err(|e| PasswordError::Malformed(format!("salt: {e}")))?;
    let hash = hex::decode(hash).map_err(|e| PasswordError::Malformed(format!("hash: {e}")))?;
    if hash.len() != HASH_LEN {
        return Err(PasswordError::Malformed(format!(
            "hash is {} bytes, expected {HASH_LEN}",
            hash.len()
        )));
    }

    Ok(constant_time_eq(&derive(password, &salt, iterations), &hash))
}

/// A valid hash of a random password, built once.
///
/// Checked against when a login names an unknown user, so that path costs
/// the same as a wrong password.
pub fn decoy_hash() -> &'static str {
    static DECOY: LazyLock<String> = LazyLock::new(|| {
        let mut secret = [0u8; 32];
        rand::rng().fill(&mut secret);
        hash_password(&hex::encode(secret))
    });
    &DECOY
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
