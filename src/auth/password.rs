//! Secret hashing
//! Mission: Never compare or store login secrets in plaintext

use crate::auth::error::AuthError;
use bcrypt::{hash, verify};

pub use bcrypt::DEFAULT_COST;

/// Lowest work factor bcrypt accepts
pub const MIN_COST: u32 = 4;

/// Highest work factor bcrypt accepts
pub const MAX_COST: u32 = 31;

/// Hash a secret with a fresh salt
pub fn hash_secret(secret: &str, cost: u32) -> Result<String, AuthError> {
    hash(secret, cost).map_err(|e| AuthError::Internal(format!("failed to hash secret: {e}")))
}

/// Check a candidate secret against a stored bcrypt hash.
///
/// A stored value that is not a parseable bcrypt hash is a store problem,
/// not a credential mismatch.
pub fn verify_secret(secret: &str, secret_hash: &str) -> Result<bool, AuthError> {
    verify(secret, secret_hash)
        .map_err(|e| AuthError::Internal(format!("failed to verify secret: {e}")))
}
