//! Shared fixtures: deterministic keys, the reference schedule and a
//! resolver wired to two simulated ledgers over a manual clock.

use std::sync::Arc;

use k256::ecdsa::SigningKey;
use primitive_types::{H160, U256};
use resolver_core::adapters::{simulated_fill, InMemoryOrderStore, SimulatedLedger};
use resolver_core::algorithms::addressing::format_evm_address;
use resolver_core::algorithms::{build_claimable_script, HtlcParams};
use resolver_core::domain::{
    DstImmutablesComplement, Hash, Order, OrderBuilder, SecureSecret, TimeLockSchedule,
};
use resolver_core::ports::{ManualTimeSource, OrderStore, TimeSource};
use resolver_core::{OrchestratorConfig, ResolverService};

pub const EVM_CHAIN: u64 = 31337;
pub const UTXO_CHAIN: u64 = 18443;
pub const START_TIME: u64 = 1_700_000_000;

pub const MAKING: u64 = 10_000;
pub const TAKING: u64 = 9_999;
pub const SAFETY_DEPOSIT: u64 = 1_000;

pub const RESOLVER_WEI: u64 = 1_000_000_000;
pub const RESOLVER_SAT: u64 = 1_000_000;
pub const MAKER_WEI: u64 = 50_000;

/// Compressed public key for a repeated-byte secret key.
pub fn compressed_key(seed: u8) -> [u8; 33] {
    let sk = SigningKey::from_slice(&[seed; 32]).expect("valid scalar");
    sk.verifying_key()
        .to_encoded_point(true)
        .as_bytes()
        .try_into()
        .expect("33 bytes")
}

pub fn resolver_key() -> [u8; 33] {
    compressed_key(0x01)
}

pub fn maker_key() -> [u8; 33] {
    compressed_key(0x02)
}

pub fn maker_evm() -> H160 {
    H160::repeat_byte(0xaa)
}

pub fn resolver_contract() -> H160 {
    H160::repeat_byte(0x11)
}

pub fn escrow_factory() -> H160 {
    H160::repeat_byte(0x22)
}

/// Offsets used by both reference scenarios.
pub fn schedule() -> TimeLockSchedule {
    TimeLockSchedule {
        src_withdrawal: 10,
        src_public_withdrawal: 120,
        src_cancellation: 121,
        src_public_cancellation: 122,
        dst_withdrawal: 10,
        dst_public_withdrawal: 100,
        dst_cancellation: 101,
    }
}

/// Resolver over two simulated ledgers.
pub struct Harness {
    pub clock: Arc<ManualTimeSource>,
    pub evm: Arc<SimulatedLedger>,
    pub utxo: Arc<SimulatedLedger>,
    pub store: Arc<dyn OrderStore>,
    pub service: Arc<ResolverService>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryOrderStore::new()))
    }

    pub fn with_store(store: Arc<dyn OrderStore>) -> Self {
        let clock = Arc::new(ManualTimeSource::new(START_TIME));
        let evm = Arc::new(
            SimulatedLedger::evm(
                EVM_CHAIN,
                resolver_key(),
                resolver_contract(),
                escrow_factory(),
                clock.clone(),
            )
            .with_resolver_balance(RESOLVER_WEI)
            .with_account(maker_evm(), MAKER_WEI),
        );
        let utxo = Arc::new(
            SimulatedLedger::utxo(UTXO_CHAIN, resolver_key(), clock.clone())
                .with_resolver_balance(RESOLVER_SAT),
        );
        let service = Arc::new(
            ResolverService::new(store.clone(), clock.clone(), OrchestratorConfig::default())
                .with_adapter(evm.clone())
                .with_adapter(utxo.clone()),
        );
        Self {
            clock,
            evm,
            utxo,
            store,
            service,
        }
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn ledger_calls(&self) -> usize {
        self.evm.total_calls() + self.utxo.total_calls()
    }

    /// Persist an order as intake would.
    pub async fn submit(&self, order: &Order) {
        self.store.put(order).await.expect("store order");
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Maker on the account chain sells `MAKING` for `TAKING` sat.
pub fn evm_to_utxo_order(secret: &SecureSecret) -> Order {
    let complement = DstImmutablesComplement {
        maker: H160::zero(),
        amount: U256::from(TAKING),
        token: H160::zero(),
        safety_deposit: U256::zero(),
        chain_id: U256::from(UTXO_CHAIN),
    };
    OrderBuilder::new(Hash::repeat_byte(0xe1), secret.hash_lock(), EVM_CHAIN, UTXO_CHAIN)
        .maker(format_evm_address(maker_evm()), "bcrt1qmaker")
        .taker(format_evm_address(resolver_contract()))
        .amounts(U256::from(MAKING), U256::from(TAKING))
        .safety_deposits(U256::from(SAFETY_DEPOSIT), U256::zero())
        .schedule(schedule())
        .btc_user_key(maker_key().to_vec())
        .src_fill(simulated_fill(&complement))
        .created_at(START_TIME)
        .build()
}

/// The maker's source HTLC, claimable by the resolver.
pub fn maker_htlc(order_hash: Hash, secret: &SecureSecret, funded_at: u64) -> Vec<u8> {
    let s = schedule();
    maker_htlc_with_lock_times(
        order_hash,
        secret,
        funded_at + u64::from(s.src_withdrawal),
        funded_at + u64::from(s.src_cancellation),
    )
}

pub fn maker_htlc_with_lock_times(
    order_hash: Hash,
    secret: &SecureSecret,
    claim_at: u64,
    refund_at: u64,
) -> Vec<u8> {
    build_claimable_script(&HtlcParams {
        order_hash,
        hash_lock: secret.hash_lock().sha256,
        claim_lock_time: claim_at as u32,
        refund_lock_time: refund_at as u32,
        claimer: resolver_key(),
        refunder: maker_key(),
    })
    .expect("valid htlc")
    .to_bytes()
}

pub fn utxo_order_hash() -> Hash {
    Hash::repeat_byte(0xb7)
}

/// Maker on the UTXO chain sells `MAKING` sat for `TAKING` wei. Funds the
/// maker's HTLC on `harness.utxo`.
pub fn utxo_to_evm_order(harness: &Harness, secret: &SecureSecret) -> Order {
    let script = maker_htlc(utxo_order_hash(), secret, harness.now());
    utxo_to_evm_order_funding(harness, secret, script, MAKING)
}

/// A UTXO-source order whose maker paid `amount` sat to `script`.
pub fn utxo_to_evm_order_funding(
    harness: &Harness,
    secret: &SecureSecret,
    script: Vec<u8>,
    amount: u64,
) -> Order {
    let funding_tx = harness
        .utxo
        .fund_htlc_as_user(&script, amount)
        .expect("maker funding");
    OrderBuilder::new(utxo_order_hash(), secret.hash_lock(), UTXO_CHAIN, EVM_CHAIN)
        .maker("bcrt1qmaker", format_evm_address(maker_evm()))
        .amounts(U256::from(MAKING), U256::from(TAKING))
        .safety_deposits(U256::zero(), U256::from(SAFETY_DEPOSIT))
        .schedule(schedule())
        .src_htlc(script, funding_tx)
        .created_at(START_TIME)
        .build()
}
