//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements the outbound ports: ledger adapters for both chain families,
//! signing, order persistence, and an in-memory ledger for simulation.

pub mod evm;
pub mod retry;
pub mod signer;
pub mod simulated;
pub mod store;
pub mod utxo;

pub use evm::EvmAdapter;
pub use retry::RetryPolicy;
pub use signer::{LocalSigner, RemoteSigner};
pub use simulated::{simulated_fill, SimulatedLedger};
pub use store::{InMemoryOrderStore, JsonFileOrderStore};
pub use utxo::UtxoAdapter;
