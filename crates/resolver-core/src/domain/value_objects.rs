//! # Domain Value Objects
//!
//! Immutable value types shared by the order model, the adapters and the
//! orchestrator.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use sha3::Keccak256;

use super::errors::Hash;

/// Ledger family. Decides which hash function verifies the secret and which
/// escrow mechanism (contract vs. script) a leg uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
    /// Account-based ledger (EVM-style).
    Evm,
    /// UTXO ledger (Bitcoin-style).
    Utxo,
}

impl std::fmt::Display for ChainKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainKind::Evm => f.write_str("evm"),
            ChainKind::Utxo => f.write_str("utxo"),
        }
    }
}

/// Which side of the swap an escrow belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leg {
    /// Maker's funds, withdrawn by the resolver.
    Src,
    /// Resolver's funds, withdrawn to the maker.
    Dst,
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Leg::Src => f.write_str("src"),
            Leg::Dst => f.write_str("dst"),
        }
    }
}

/// Order lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Accepted by intake, nothing on chain yet.
    #[default]
    Created,
    /// Both escrows exist.
    EscrowCreated,
    /// Both legs withdrawn.
    WithdrawCompleted,
}

impl OrderStatus {
    /// Only single forward steps are allowed.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::EscrowCreated) | (Self::EscrowCreated, Self::WithdrawCompleted)
        )
    }

    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::WithdrawCompleted)
    }

    /// Wire name, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::EscrowCreated => "escrow_created",
            Self::WithdrawCompleted => "withdraw_completed",
        }
    }
}

/// Two commitments to the same secret, one per ledger family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashLock {
    /// keccak-256(secret), verified by escrow contracts.
    pub keccak256: Hash,
    /// sha-256(secret), verified by `OP_SHA256` in the HTLC script.
    pub sha256: Hash,
}

impl HashLock {
    /// Commit to a secret under both hash functions.
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        Self {
            keccak256: Hash::from_slice(&Keccak256::digest(secret)),
            sha256: Hash::from_slice(&Sha256::digest(secret)),
        }
    }

    /// Commitment checked by ledgers of the given kind.
    pub fn for_kind(&self, kind: ChainKind) -> Hash {
        match kind {
            ChainKind::Evm => self.keccak256,
            ChainKind::Utxo => self.sha256,
        }
    }

    /// Does `secret` open the commitment verified by `kind`?
    pub fn opens_with(&self, secret: &[u8; 32], kind: ChainKind) -> bool {
        let digest = match kind {
            ChainKind::Evm => Hash::from_slice(&Keccak256::digest(secret)),
            ChainKind::Utxo => Hash::from_slice(&Sha256::digest(secret)),
        };
        digest == self.for_kind(kind)
    }
}

/// Result of a confirmed (or at least broadcast) ledger transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    /// Transaction hash / txid.
    pub tx_ref: String,
    /// Block that included the transaction, once known.
    pub block_number: Option<u64>,
    /// Timestamp of that block, once known.
    pub block_timestamp: Option<u64>,
}

impl TxReceipt {
    /// Receipt for a broadcast that has not been observed in a block yet.
    pub fn pending(tx_ref: impl Into<String>) -> Self {
        Self {
            tx_ref: tx_ref.into(),
            block_number: None,
            block_timestamp: None,
        }
    }
}

/// Raw bytes carried through JSON as `0x`-prefixed hex.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct HexBytes(pub Vec<u8>);

impl HexBytes {
    /// Borrow the bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Parse from hex with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        hex::decode(trimmed).map(Self)
    }

    /// Lowercase hex with `0x`.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }
}

impl From<Vec<u8>> for HexBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Debug for HexBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for HexBytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
