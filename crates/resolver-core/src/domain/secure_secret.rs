//! # Swap Secret
//!
//! The 32-byte preimage behind an order's hash lock. Zeroized on drop and
//! never printed.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::value_objects::{ChainKind, HashLock};

/// A swap secret that zeroizes on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureSecret {
    inner: [u8; 32],
}

impl SecureSecret {
    /// Wrap raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self { inner: bytes }
    }

    /// Fresh random secret from the thread RNG.
    pub fn generate() -> Self {
        let mut inner = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut inner);
        Self { inner }
    }

    /// Copy from a slice; `None` unless exactly 32 bytes.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let inner: [u8; 32] = slice.try_into().ok()?;
        Some(Self { inner })
    }

    /// Borrow the preimage. Do not hold on to it.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.inner
    }

    /// Both commitments to this secret.
    pub fn hash_lock(&self) -> HashLock {
        HashLock::from_secret(&self.inner)
    }

    /// Check the secret against every commitment the given legs verify.
    pub fn opens(&self, lock: &HashLock, kinds: &[ChainKind]) -> bool {
        kinds.iter().all(|kind| lock.opens_with(&self.inner, *kind))
    }
}

impl std::fmt::Debug for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecureSecret(***)")
    }
}

// The relay delivers the secret as hex; serialize symmetrically.
impl Serialize for SecureSecret {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(self.inner)))
    }
}

impl<'de> Deserialize<'de> for SecureSecret {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let mut bytes = hex::decode(s.strip_prefix("0x").unwrap_or(&s))
            .map_err(serde::de::Error::custom)?;
        let secret = Self::from_slice(&bytes);
        bytes.zeroize();
        secret.ok_or_else(|| serde::de::Error::custom("secret must be 32 bytes"))
    }
}
