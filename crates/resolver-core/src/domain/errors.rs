//! # Domain Errors
//!
//! Error taxonomy for the resolver. Every failure surfaced to an
//! orchestration caller is one of these variants (kind + context).

use primitive_types::H256;
use thiserror::Error;

/// Order hash / 32-byte digest.
pub type Hash = H256;

/// Resolver error types.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// Missing or malformed order fields. Raised before touching any chain.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Funding shortfall on either ledger.
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Amount needed (including fees).
        required: String,
        /// Amount available to the wallet.
        available: String,
    },

    /// Contract call reverted on the account chain.
    #[error("Execution reverted: {0}")]
    RevertedExecution(String),

    /// The funding wallet has no spendable outputs.
    #[error("No UTXOs available for {0}")]
    NoUtxos(String),

    /// The UTXO node refused the raw transaction.
    #[error("Broadcast rejected: {0}")]
    BroadcastRejected(String),

    /// A transaction was not confirmed within the polling bound.
    #[error("Confirmation timeout for {tx_ref} after {waited_secs}s")]
    ConfirmationTimeout {
        /// Transaction reference being waited on.
        tx_ref: String,
        /// Seconds spent polling.
        waited_secs: u64,
    },

    /// Revealed secret does not hash to the recorded hash lock.
    #[error("Secret does not match hash lock")]
    SecretMismatch,

    /// HTLC script inputs violate the construction rules, or a script does
    /// not follow the claimable template.
    #[error("Invalid script parameters: {0}")]
    InvalidScriptParameters(String),

    /// Order store could not be reached or returned garbage.
    #[error("Order store unavailable: {0}")]
    StoreUnavailable(String),

    /// No order recorded under this hash.
    #[error("Order not found: {0:?}")]
    OrderNotFound(Hash),

    /// Attempted status change that the lifecycle forbids.
    #[error("Invalid order transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: String,
        /// Attempted status.
        to: String,
    },

    /// A value does not fit its encoded field.
    #[error("Value out of range for {field}: {value}")]
    OutOfRange {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: String,
    },

    /// No adapter is registered for the chain id.
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(u64),

    /// The adapter variant does not provide this capability.
    #[error("Operation {operation} not supported on {chain}")]
    UnsupportedOperation {
        /// Capability name.
        operation: &'static str,
        /// Chain description.
        chain: String,
    },

    /// Signing capability failed or timed out.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Transient RPC failure (network, 5xx, malformed response).
    #[error("RPC error: {0}")]
    Rpc(String),
}

impl ResolverError {
    /// Short machine-readable kind, used in logs and API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::RevertedExecution(_) => "reverted_execution",
            Self::NoUtxos(_) => "no_utxos",
            Self::BroadcastRejected(_) => "broadcast_rejected",
            Self::ConfirmationTimeout { .. } => "confirmation_timeout",
            Self::SecretMismatch => "secret_mismatch",
            Self::InvalidScriptParameters(_) => "invalid_script_parameters",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::OrderNotFound(_) => "order_not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::OutOfRange { .. } => "out_of_range",
            Self::UnsupportedChain(_) => "unsupported_chain",
            Self::UnsupportedOperation { .. } => "unsupported_operation",
            Self::Signing(_) => "signing_failed",
            Self::Rpc(_) => "rpc_error",
        }
    }

    /// Whether a bounded local retry may resolve the failure.
    ///
    /// Only transport-level failures qualify. Reverts, secret mismatches and
    /// script errors are deterministic and surface immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }
}
