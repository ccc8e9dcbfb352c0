//! # Node Configuration
//!
//! TOML file (path in `RESOLVER_CONFIG`) plus environment overrides.
//!
//! ## Security Requirements
//!
//! - Signing keys come from the environment (`RESOLVER_EVM_KEY`,
//!   `RESOLVER_BTC_KEY`) or a remote signer, and MUST NOT be zero
//! - Every chain id is served by exactly one adapter

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use primitive_types::H160;
use resolver_core::domain::{EvmChainConfig, UtxoChainConfig};
use resolver_core::OrchestratorConfig;
use serde::Deserialize;
use thiserror::Error;

/// Complete node configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// HTTP listener.
    pub server: ServerConfig,
    /// Order persistence.
    pub store: StoreConfig,
    /// Signing capability.
    pub signer: SignerConfig,
    /// Orchestration knobs.
    pub orchestrator: OrchestratorConfig,
    /// Account-based ledgers.
    pub evm: Vec<EvmChainConfig>,
    /// UTXO ledgers.
    pub utxo: Vec<UtxoChainConfig>,
    /// In-memory ledgers used by `--simulate`.
    pub simulation: SimulationConfig,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {error}")]
    Io { path: String, error: String },

    #[error("invalid configuration file: {0}")]
    Parse(String),

    #[error("no {0} ledger configured")]
    MissingLedger(&'static str),

    #[error("chain id {0} configured more than once")]
    DuplicateChain(u64),

    #[error("{0} is required when no remote signer is configured")]
    MissingKey(&'static str),

    #[error(
        "SECURITY VIOLATION: {0} is a zero key. Provide a real key through the environment."
    )]
    ZeroKey(&'static str),

    #[error("{name} is not 32 bytes of hex")]
    MalformedKey { name: &'static str },
}

impl NodeConfig {
    /// Read `RESOLVER_CONFIG` (if set), then apply environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("RESOLVER_CONFIG") {
            Ok(path) => Self::load(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `RESOLVER_*` overrides from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("RESOLVER_EVM_KEY") {
            self.signer.evm_key = Some(key);
        }
        if let Some(key) = lookup("RESOLVER_BTC_KEY") {
            self.signer.btc_key = Some(key);
        }
        if let Some(url) = lookup("RESOLVER_SIGNER_URL") {
            self.signer.remote_url = Some(url);
        }
        if let Some(addr) = lookup("RESOLVER_LISTEN_ADDR") {
            self.server.listen_addr = addr;
        }
        if let Some(dir) = lookup("RESOLVER_DATA_DIR") {
            self.store.data_dir = PathBuf::from(dir);
        }
    }

    /// Validate configuration for running against live ledgers.
    ///
    /// # Returns
    ///
    /// Returns `Err` if:
    /// - either ledger family has no chain configured
    /// - a chain id appears twice
    /// - a local key is missing, malformed or zero
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        if self.evm.is_empty() {
            return Err(ConfigError::MissingLedger("evm"));
        }
        if self.utxo.is_empty() {
            return Err(ConfigError::MissingLedger("utxo"));
        }

        let mut seen = HashSet::new();
        let ids = self
            .evm
            .iter()
            .map(|c| c.chain_id)
            .chain(self.utxo.iter().map(|c| c.chain_id));
        for id in ids {
            if !seen.insert(id) {
                return Err(ConfigError::DuplicateChain(id));
            }
        }

        if self.signer.remote_url.is_none() {
            check_key(self.signer.evm_key.as_deref(), "RESOLVER_EVM_KEY")?;
            check_key(self.signer.btc_key.as_deref(), "RESOLVER_BTC_KEY")?;
        }
        Ok(())
    }
}

fn check_key(key: Option<&str>, name: &'static str) -> Result<(), ConfigError> {
    let key = key.ok_or(ConfigError::MissingKey(name))?;
    let bytes = hex::decode(key.strip_prefix("0x").unwrap_or(key))
        .map_err(|_| ConfigError::MalformedKey { name })?;
    if bytes.len() != 32 {
        return Err(ConfigError::MalformedKey { name });
    }
    if bytes.iter().all(|b| *b == 0) {
        return Err(ConfigError::ZeroKey(name));
    }
    Ok(())
}

/// HTTP listener.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Order persistence.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding one JSON document per order.
    pub data_dir: PathBuf,
    /// Keep orders in memory only (lost on restart).
    pub in_memory: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/orders"),
            in_memory: false,
        }
    }
}

/// Signing capability: a remote signing service, or local keys.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    /// Base URL of a remote signer. Takes precedence over local keys.
    pub remote_url: Option<String>,
    pub timeout_secs: u64,
    /// Hex secp256k1 key for account chains.
    pub evm_key: Option<String>,
    /// Hex secp256k1 key for UTXO chains.
    pub btc_key: Option<String>,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            timeout_secs: 10,
            evm_key: None,
            btc_key: None,
        }
    }
}

impl std::fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |k: &Option<String>| k.as_ref().map(|_| "***");
        f.debug_struct("SignerConfig")
            .field("remote_url", &self.remote_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("evm_key", &redact(&self.evm_key))
            .field("btc_key", &redact(&self.btc_key))
            .finish()
    }
}

/// In-memory ledgers for `--simulate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub evm_chain_id: u64,
    pub utxo_chain_id: u64,
    /// Resolver contract balance, wei.
    pub resolver_balance_wei: u64,
    /// Resolver wallet balance, sat.
    pub resolver_balance_sat: u64,
    /// Maker accounts funded on the simulated account chain.
    pub funded_accounts: Vec<H160>,
    pub account_balance_wei: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            evm_chain_id: 31337,
            utxo_chain_id: 18443,
            resolver_balance_wei: 5_000_000_000_000_000_000,
            resolver_balance_sat: 100_000_000,
            funded_accounts: Vec::new(),
            account_balance_wei: 1_000_000_000_000_000_000,
        }
    }
}
