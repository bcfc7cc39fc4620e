//! Password hashing, verification and strength rules.
//!
//! Argon2id with default parameters, stored as PHC strings. Hashing and
//! verification are CPU-bound; async callers run them on the blocking pool.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::warn;

pub const MIN_PASSWORD_LEN: usize = 8;
/// Upper bound so a single login cannot pin a core hashing megabytes.
pub const MAX_PASSWORD_LEN: usize = 128;

const SYMBOLS: &str = "!@#$%^&*(),.?\":{}|<>";

#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct HashError(String);

/// Why a new password was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WeakPassword {
    #[error("password must be at least {min} characters", min = MIN_PASSWORD_LEN)]
    TooShort,
    #[error("password must be at most {max} characters", max = MAX_PASSWORD_LEN)]
    TooLong,
    #[error("password must contain a lowercase letter")]
    MissingLowercase,
    #[error("password must contain an uppercase letter")]
    MissingUppercase,
    #[error("password must contain a digit")]
    MissingDigit,
    #[error("password must contain a symbol")]
    MissingSymbol,
}

/// Check a password chosen at signup.
pub fn check_strength(password: &str) -> Result<(), WeakPassword> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(WeakPassword::TooShort);
    }
    if len > MAX_PASSWORD_LEN {
        return Err(WeakPassword::TooLong);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(WeakPassword::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(WeakPassword::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(WeakPassword::MissingDigit);
    }
    if !password.chars().any(|c| SYMBOLS.contains(c)) {
        return Err(WeakPassword::MissingSymbol);
    }
    Ok(())
}

/// Hash a password using default Argon2 settings.
pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HashError(e.to_string()))
}

/// Verify a password against a stored PHC string. An unparsable hash never
/// verifies.
pub fn verify_password(password: &str, phc: &str) -> bool {
    if password.len() > MAX_PASSWORD_LEN * 4 {
        return false;
    }
    match PasswordHash::new(phc) {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "stored password hash is not a valid PHC string");
            false
        }
    }
}

/// Whether `phc` parses as a PHC hash string.
pub fn is_valid_hash(phc: &str) -> bool {
    PasswordHash::new(phc).is_ok()
}

/// A real hash to verify against when the account does not exist, so unknown
/// emails take as long to reject as wrong passwords.
pub fn decoy_hash() -> &'static str {
    static DECOY: OnceLock<String> = OnceLock::new();
    DECOY.get_or_init(|| hash_password("steelgate-decoy-password").unwrap_or_default())
}
