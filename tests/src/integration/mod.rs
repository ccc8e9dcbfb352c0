//! End-to-end swaps against `SimulatedLedger`.

mod evm_to_utxo;
mod recovery;
mod utxo_to_evm;
