//! UTXO (Bitcoin-style) ledger adapter.

mod adapter;
pub mod esplora;
pub mod wallet;

pub use adapter::UtxoAdapter;
