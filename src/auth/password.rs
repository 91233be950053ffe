//! Argon2 password hashing.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::{debug, error, instrument};

use crate::error::{MarketplaceError, Result};

#[instrument(name = "password::hash", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String> {
    if password.is_empty() {
        return Err(MarketplaceError::InvalidInput("password can't be empty".to_string()));
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 hashing failed");
            MarketplaceError::Internal(format!("password hashing failed: {}", e))
        })
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash itself is unusable.
#[instrument(name = "password::verify", skip_all, err(Display))]
pub fn verify_password(stored_hash: &str, password: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| MarketplaceError::Internal(format!("invalid stored password hash: {}", e)))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => {
            debug!("password mismatch");
            Ok(false)
        }
        Err(e) => Err(MarketplaceError::Internal(format!("password verification failed: {}", e))),
    }
}
