//! # Outbound Ports
//!
//! Capabilities the orchestrator depends on: ledgers, the order directory,
//! transaction signing and wall-clock time.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use primitive_types::{H160, U256};
use serde::{Deserialize, Serialize};

use crate::domain::{
    ChainKind, DstImmutablesComplement, FillAuthorization, Hash, Immutables, Leg, Order,
    ResolverError, SecureSecret, TxReceipt,
};

/// A mined `deploySrc`: the receipt plus the authoritative parameters read
/// back from the factory's `SrcEscrowCreated` event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SrcDeployment {
    pub receipt: TxReceipt,
    pub immutables: Immutables,
    pub complement: DstImmutablesComplement,
}

/// An HTLC output, created by `fund_htlc` or found by `htlc_output`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HtlcFunding {
    pub tx_ref: String,
    pub vout: u32,
    /// P2SH address paid.
    pub address: String,
    pub amount: u64,
}

/// An unspent output as reported by the UTXO node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoOutput {
    pub txid: String,
    pub vout: u32,
    pub value: u64,
    pub confirmed: bool,
}

fn unsupported<T>(adapter: &(impl ChainAdapter + ?Sized), operation: &'static str) -> Result<T, ResolverError> {
    Err(ResolverError::UnsupportedOperation {
        operation,
        chain: adapter.describe(),
    })
}

/// Ledger capability adapter.
///
/// One instance per configured chain. Operations an adapter variant cannot
/// perform keep the default body and fail with `UnsupportedOperation`.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// Configured chain id.
    fn chain_id(&self) -> u64;

    /// Ledger family.
    fn kind(&self) -> ChainKind;

    /// Human-readable name for logs and errors.
    fn describe(&self) -> String {
        format!("{} chain {}", self.kind(), self.chain_id())
    }

    /// The resolver's 20-byte identity on this chain: the account address,
    /// or the witness program of the P2WPKH wallet.
    fn resolver_identity(&self) -> H160;

    /// The resolver's compressed public key on this chain.
    async fn resolver_public_key(&self) -> Result<[u8; 33], ResolverError>;

    /// Submit `deploySrc` on the resolver contract. Returns the transaction
    /// reference as soon as the node accepted it; see `src_deployment`.
    async fn deploy_src_escrow(
        &self,
        _immutables: &Immutables,
        _fill: &FillAuthorization,
    ) -> Result<String, ResolverError> {
        unsupported(self, "deploy_src_escrow")
    }

    /// Wait for a `deploySrc` transaction and read the `SrcEscrowCreated`
    /// event from its receipt.
    async fn src_deployment(&self, _tx_ref: &str) -> Result<SrcDeployment, ResolverError> {
        unsupported(self, "src_deployment")
    }

    /// Submit `deployDst` on the resolver contract.
    async fn deploy_dst_escrow(
        &self,
        _immutables: &Immutables,
        _src_cancellation_timestamp: u64,
    ) -> Result<String, ResolverError> {
        unsupported(self, "deploy_dst_escrow")
    }

    /// Submit a withdrawal of an escrow through the resolver contract.
    async fn withdraw(
        &self,
        _leg: Leg,
        _escrow: H160,
        _secret: &SecureSecret,
        _immutables: &Immutables,
    ) -> Result<String, ResolverError> {
        unsupported(self, "withdraw")
    }

    /// Pay `amount` to the P2SH output of `script` from the resolver wallet.
    async fn fund_htlc(&self, _script: &[u8], _amount: u64) -> Result<HtlcFunding, ResolverError> {
        unsupported(self, "fund_htlc")
    }

    /// Spend the HTLC output of `funding_tx` through the claim branch.
    async fn redeem_htlc(
        &self,
        _funding_tx: &str,
        _script: &[u8],
        _secret: &SecureSecret,
    ) -> Result<TxReceipt, ResolverError> {
        unsupported(self, "redeem_htlc")
    }

    /// The output of `funding_tx` that pays the P2SH of `script`.
    /// `InvalidScriptParameters` if no output does.
    async fn htlc_output(
        &self,
        _funding_tx: &str,
        _script: &[u8],
    ) -> Result<HtlcFunding, ResolverError> {
        unsupported(self, "htlc_output")
    }

    /// P2SH address of an HTLC script on this network.
    fn htlc_address(&self, _script: &[u8]) -> Result<String, ResolverError> {
        unsupported(self, "htlc_address")
    }

    /// Block until the transaction is in a block or the timeout elapses.
    /// A transaction that was mined but failed is `RevertedExecution`.
    async fn wait_for_confirmation(&self, tx_ref: &str) -> Result<TxReceipt, ResolverError>;

    /// Unspent outputs of an address.
    async fn utxos(&self, _address: &str) -> Result<Vec<UtxoOutput>, ResolverError> {
        unsupported(self, "utxos")
    }

    /// Spendable balance of the resolver wallet, in base units.
    async fn balance(&self) -> Result<U256, ResolverError>;

    /// Submit a signed raw transaction; returns its reference.
    async fn broadcast_raw(&self, raw: &[u8]) -> Result<String, ResolverError>;

    /// CREATE2 address of the escrow holding `immutables` on this chain.
    fn predict_escrow_address(
        &self,
        _immutables: &Immutables,
        _leg: Leg,
    ) -> Result<H160, ResolverError> {
        unsupported(self, "predict_escrow_address")
    }
}

/// Persistent order directory.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Fetch an order; `OrderNotFound` if absent.
    async fn get(&self, hash: &Hash) -> Result<Order, ResolverError>;

    /// Insert or replace an order.
    async fn put(&self, order: &Order) -> Result<(), ResolverError>;

    /// Every stored order.
    async fn list_all(&self) -> Result<Vec<Order>, ResolverError>;
}

/// What a signature is for. Carried to remote signers for policy checks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningContext {
    pub chain_id: u64,
    /// Short label such as `deploy_src` or `fund_htlc/input/0`.
    pub purpose: String,
}

impl SigningContext {
    pub fn new(chain_id: u64, purpose: impl Into<String>) -> Self {
        Self {
            chain_id,
            purpose: purpose.into(),
        }
    }
}

/// Transaction signing capability.
///
/// EVM signatures are 65 bytes `r || s || recovery_id`; UTXO signatures are
/// DER without the sighash byte.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    async fn sign(
        &self,
        kind: ChainKind,
        context: &SigningContext,
        payload_hash: [u8; 32],
    ) -> Result<Vec<u8>, ResolverError>;

    async fn public_key(&self, kind: ChainKind) -> Result<[u8; 33], ResolverError>;
}

/// Time source for deadlines. Unix seconds.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> u64;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Manually driven time source for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    time: AtomicU64,
}

impl ManualTimeSource {
    pub fn new(initial: u64) -> Self {
        Self {
            time: AtomicU64::new(initial),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.time.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn set(&self, time: u64) {
        self.time.store(time, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> u64 {
        self.time.load(Ordering::SeqCst)
    }
}
