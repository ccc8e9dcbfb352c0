//! # Secret Verification
//!
//! A revealed secret is checked against every commitment the order's legs
//! verify before any chain action is taken.

use crate::domain::{ChainKind, HashLock, ResolverError, SecureSecret};

/// Fail with `SecretMismatch` unless `secret` opens `lock` under each kind.
pub fn verify_secret(
    secret: &SecureSecret,
    lock: &HashLock,
    kinds: &[ChainKind],
) -> Result<(), ResolverError> {
    if secret.opens(lock, kinds) {
        Ok(())
    } else {
        Err(ResolverError::SecretMismatch)
    }
}
