//! # HTLC Resolver Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # keys, schedules, orders, simulated harness
//! └── integration/      # whole swaps through ResolverService
//!     ├── evm_to_utxo.rs
//!     ├── utxo_to_evm.rs
//!     └── recovery.rs   # failures, retries, idempotence
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p resolver-tests
//! cargo bench -p resolver-tests
//! ```

pub mod fixtures;
pub mod integration;
