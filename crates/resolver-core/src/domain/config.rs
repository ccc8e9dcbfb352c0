//! # Chain Configuration
//!
//! Explicit per-chain parameters handed to adapter constructors.

use std::time::Duration;

use primitive_types::{H160, H256};
use serde::{Deserialize, Serialize};

/// Confirmation polling bounds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Delay between polls, milliseconds.
    pub poll_interval_ms: u64,
    /// Give up after this many seconds.
    pub timeout_secs: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            timeout_secs: 600,
        }
    }
}

impl ConfirmationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Bounded exponential backoff for read-only RPC calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff_ms: 200,
            max_backoff_ms: 2_000,
        }
    }
}

/// Account-based chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmChainConfig {
    pub chain_id: u64,
    /// JSON-RPC endpoint.
    pub rpc_url: String,
    /// Resolver contract holding the resolver's funds.
    pub resolver_contract: H160,
    /// Escrow factory that deploys the CREATE2 clones.
    pub escrow_factory: H160,
    /// Init-code hash of source escrow clones.
    pub src_escrow_code_hash: H256,
    /// Init-code hash of destination escrow clones.
    pub dst_escrow_code_hash: H256,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// UTXO chain reached through an Esplora-style REST API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoChainConfig {
    pub chain_id: u64,
    /// REST base URL, e.g. `http://127.0.0.1:3002`.
    pub esplora_url: String,
    pub network: bitcoin::Network,
    /// Fee rate for fundings and redeems, sat/vbyte.
    #[serde(default = "default_fee_rate")]
    pub fee_rate_sat_vb: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_gas_limit() -> u64 {
    1_000_000
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_fee_rate() -> u64 {
    2
}
