//! # Cross-Chain Swap Resolver
//!
//! Executes hashed-timelock atomic swaps between an account-based (EVM)
//! ledger and a UTXO ledger on behalf of a resolver.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Lifecycle
//!
//! ```text
//! created ──create_escrows──▶ escrow_created ──withdraw(secret)──▶ withdraw_completed
//! ```
//!
//! The resolver locks its destination funds only after the source escrow
//! exists, under a hash lock and a refund deadline strictly earlier than the
//! source cancellation. Once the maker reveals the secret, the destination
//! leg pays the maker and the source leg pays the resolver.
//!
//! ## Security Properties
//!
//! | Property | Enforcement |
//! |----------|-------------|
//! | Secret binding | keccak-256 for escrow contracts, sha-256 for HTLC scripts |
//! | Refund ordering | destination cancellation < source cancellation |
//! | Write-once records | escrow addresses and tx refs never change once set |
//! | Secret hygiene | `SecureSecret` zeroizes on drop, never logged |
//!
//! ## Module Structure
//!
//! ```text
//! resolver-core/
//! ├── domain/          # Order, Immutables, errors, config, invariants
//! ├── algorithms/      # time-lock codec, HTLC script, CREATE2, ABI
//! ├── ports/           # ResolverApi, ChainAdapter, OrderStore, signer, clock
//! ├── adapters/        # EVM, UTXO, simulated ledgers; stores; signers
//! └── service.rs       # ResolverService orchestration
//! ```

#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use algorithms::{
    build_claimable_script, compute_escrow_address, deadline, pack, parse_claimable_script,
    set_deployed_at, unpack, verify_secret, HtlcParams, Stage,
};
pub use domain::{
    ChainKind, DstImmutablesComplement, EvmChainConfig, FillAuthorization, Hash, HashLock,
    HexBytes, Immutables, Leg, LimitOrder, Order, OrderBuilder, OrderStatus, ResolverError,
    SecretRevealed, SecureSecret, TimeLockSchedule, TxReceipt, UtxoChainConfig,
};
pub use ports::{
    ChainAdapter, ManualTimeSource, OrderStore, ResolverApi, SystemTimeSource, TimeSource,
    TransactionSigner,
};
pub use service::{OrchestratorConfig, ResolverService};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
