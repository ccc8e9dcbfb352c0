//! Account-based (EVM) ledger adapter.

mod adapter;
pub mod rpc;
pub mod tx;

pub use adapter::EvmAdapter;
