//! Resolver Service - order orchestration.
//!
//! Drives an order through `created -> escrow_created -> withdraw_completed`
//! against the two ledger adapters it references. Every completed step is
//! persisted before the next one starts, so a failed call can be retried
//! with the same order hash without redoing finished work.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bitcoin::hashes::{hash160, Hash as _};
use bitcoin::Script;
use parking_lot::Mutex;
use primitive_types::{H160, U256};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::algorithms::addressing::{format_evm_address, parse_evm_address};
use crate::algorithms::{
    build_claimable_script, deadline, pack, parse_claimable_script, set_deployed_at,
    verify_secret, HtlcParams, Stage,
};
use crate::domain::{
    validate_order, ChainKind, DstImmutablesComplement, Hash, HexBytes, Immutables, Leg, Order,
    OrderStatus, ResolverError, SecretRevealed, SecureSecret,
};
use crate::ports::inbound::ResolverApi;
use crate::ports::outbound::{ChainAdapter, OrderStore, TimeSource};

/// Orchestration knobs.
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Wait for the maker's UTXO funding transaction to confirm before
    /// locking destination funds. Its block time anchors the source deadlines.
    pub utxo_finality_wait: bool,
    /// Wait for the resolver's own destination HTLC funding to confirm.
    pub confirm_utxo_funding: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            utxo_finality_wait: true,
            confirm_utxo_funding: true,
        }
    }
}

/// Resolver Service implementation.
pub struct ResolverService {
    adapters: HashMap<u64, Arc<dyn ChainAdapter>>,
    store: Arc<dyn OrderStore>,
    clock: Arc<dyn TimeSource>,
    config: OrchestratorConfig,
    /// One async lock per order; serializes operations on the same hash.
    order_locks: Mutex<HashMap<Hash, Arc<tokio::sync::Mutex<()>>>>,
}

impl ResolverService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        clock: Arc<dyn TimeSource>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            adapters: HashMap::new(),
            store,
            clock,
            config,
            order_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Register the adapter serving `adapter.chain_id()`.
    pub fn with_adapter(mut self, adapter: Arc<dyn ChainAdapter>) -> Self {
        let chain_id = adapter.chain_id();
        if self.adapters.insert(chain_id, adapter).is_some() {
            warn!("[resolver] adapter for chain {} replaced", chain_id);
        }
        self
    }

    /// Registered chain ids, sorted.
    pub fn chains(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.adapters.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn adapter(&self, chain_id: u64) -> Result<Arc<dyn ChainAdapter>, ResolverError> {
        self.adapters
            .get(&chain_id)
            .cloned()
            .ok_or(ResolverError::UnsupportedChain(chain_id))
    }

    fn order_lock(&self, hash: &Hash) -> Arc<tokio::sync::Mutex<()>> {
        self.order_locks.lock().entry(*hash).or_default().clone()
    }

    async fn persist(&self, order: &Order) -> Result<(), ResolverError> {
        self.store.put(order).await
    }

    /// Run `run` while holding the order's lock, inside a correlated span.
    async fn locked<F>(
        &self,
        operation: &'static str,
        hash: &Hash,
        run: F,
    ) -> Result<Order, ResolverError>
    where
        F: Future<Output = Result<Order, ResolverError>>,
    {
        let lock = self.order_lock(hash);
        let _guard = lock.lock().await;
        let span = info_span!(
            "order_operation",
            operation = operation,
            order = %format!("{:#x}", hash),
            correlation_id = %Uuid::new_v4()
        );
        let result = run.instrument(span).await;
        if let Err(e) = &result {
            warn!("[resolver] {} {:#x} failed: {} ({})", operation, hash, e, e.kind());
        }
        result
    }

    /// Persist the reference of a submitted transaction before anything
    /// waits on it. `ConfirmationTimeout` out of a submission means the
    /// broadcast may have happened, so its reference is kept too.
    async fn record_submission(
        &self,
        order: &mut Order,
        step: TxStep,
        submitted: Result<String, ResolverError>,
    ) -> Result<String, ResolverError> {
        let tx_ref = match &submitted {
            Ok(tx_ref) => Some(tx_ref.clone()),
            Err(ResolverError::ConfirmationTimeout { tx_ref, .. }) => {
                warn!("[resolver] {} {} outcome unknown; recorded", step, tx_ref);
                Some(tx_ref.clone())
            }
            Err(_) => None,
        };
        if let Some(tx_ref) = tx_ref {
            step.record(order, tx_ref)?;
            self.persist(order).await?;
        }
        submitted
    }

    /// Drop the reference of a transaction that was mined but reverted, so
    /// the next attempt submits the step again.
    async fn forget_if_reverted<T>(
        &self,
        order: &mut Order,
        step: TxStep,
        outcome: Result<T, ResolverError>,
    ) -> Result<T, ResolverError> {
        if let Err(ResolverError::RevertedExecution(reason)) = &outcome {
            if let Some(tx_ref) = step.forget(order) {
                warn!("[resolver] {} {} reverted: {}", step, tx_ref, reason);
                self.persist(order).await?;
            }
        }
        outcome
    }

    async fn run_create_escrows(&self, hash: &Hash) -> Result<Order, ResolverError> {
        let mut order = self.store.get(hash).await?;
        if order.status >= OrderStatus::EscrowCreated {
            info!("[resolver] escrows already created (status {:?})", order.status);
            return Ok(order);
        }

        let src = self.adapter(order.src_chain_id)?;
        let dst = self.adapter(order.dst_chain_id)?;
        validate_order(&order, src.kind(), dst.kind())?;

        if order.src_immutables.is_none() {
            match src.kind() {
                ChainKind::Evm => self.deploy_evm_src(&mut order, src.as_ref()).await?,
                ChainKind::Utxo => self.adopt_utxo_src(&mut order, src.as_ref()).await?,
            }
            self.persist(&order).await?;
            info!(
                "[resolver] src escrow ready at {} on {}",
                order.src_escrow_address.as_deref().unwrap_or("?"),
                src.describe()
            );
        }

        // A funding recorded by an earlier attempt is trusted only once mined.
        let resumed_funding = dst.kind() == ChainKind::Utxo && order.dst_immutables.is_some();
        if order.dst_immutables.is_none() {
            match dst.kind() {
                ChainKind::Evm => self.deploy_evm_dst(&mut order, dst.as_ref()).await?,
                ChainKind::Utxo => self.fund_utxo_dst(&mut order, dst.as_ref()).await?,
            }
            self.persist(&order).await?;
            info!(
                "[resolver] dst escrow ready at {} on {}",
                order.dst_escrow_address.as_deref().unwrap_or("?"),
                dst.describe()
            );
        }

        if dst.kind() == ChainKind::Utxo && (self.config.confirm_utxo_funding || resumed_funding) {
            if let Some(tx_ref) = order.deploy_tx(Leg::Dst) {
                dst.wait_for_confirmation(tx_ref).await?;
            }
        }

        order.advance_to(OrderStatus::EscrowCreated)?;
        self.persist(&order).await?;
        info!("[resolver] order advanced to escrow_created");
        Ok(order)
    }

    /// Deploy the source escrow through the resolver contract's fill, or
    /// pick up a deployment an earlier attempt submitted.
    async fn deploy_evm_src(
        &self,
        order: &mut Order,
        src: &dyn ChainAdapter,
    ) -> Result<(), ResolverError> {
        let recorded = order.deploy_tx(Leg::Src).map(str::to_owned);
        let tx_ref = match recorded {
            Some(tx_ref) => {
                info!("[resolver] resuming src deployment {}", tx_ref);
                tx_ref
            }
            None => {
                let fill = order
                    .src_fill
                    .clone()
                    .ok_or_else(|| ResolverError::Validation("srcFill is required".into()))?;
                let immutables = Immutables {
                    order_hash: order.hash,
                    hash_lock: order.hash_lock.keccak256,
                    maker: parse_evm_address(&order.maker_address)?,
                    taker: src.resolver_identity(),
                    token: order.src_token,
                    amount: order.making_amount,
                    safety_deposit: order.src_safety_deposit,
                    timelocks: pack(&order.time_lock_schedule),
                };
                let submitted = src.deploy_src_escrow(&immutables, &fill).await;
                self.record_submission(order, TxStep::Deploy(Leg::Src), submitted)
                    .await?
            }
        };

        let deployment = src.src_deployment(&tx_ref).await;
        let deployment = self
            .forget_if_reverted(order, TxStep::Deploy(Leg::Src), deployment)
            .await?;
        let address = src.predict_escrow_address(&deployment.immutables, Leg::Src)?;
        order.record_immutables(Leg::Src, deployment.immutables)?;
        order.record_escrow_address(Leg::Src, format_evm_address(address))?;
        order.dst_complement = Some(deployment.complement);
        Ok(())
    }

    /// Accept the maker's HTLC as the source escrow, after checking the
    /// script and the funding output on chain.
    async fn adopt_utxo_src(
        &self,
        order: &mut Order,
        src: &dyn ChainAdapter,
    ) -> Result<(), ResolverError> {
        let script = order
            .htlc_script
            .clone()
            .ok_or_else(|| ResolverError::Validation("htlcScript is required".into()))?;
        let funding_tx = order
            .src_deploy_tx_ref
            .clone()
            .ok_or_else(|| ResolverError::Validation("srcDeployTxRef is required".into()))?;

        let params = parse_claimable_script(Script::from_bytes(script.as_slice()))?;
        if params.order_hash != order.hash {
            return Err(ResolverError::InvalidScriptParameters(
                "script commits to a different order".into(),
            ));
        }
        if params.hash_lock != order.hash_lock.sha256 {
            return Err(ResolverError::InvalidScriptParameters(
                "script hash lock differs from the order's".into(),
            ));
        }
        if params.claimer != src.resolver_public_key().await? {
            return Err(ResolverError::InvalidScriptParameters(
                "script is not claimable by the resolver".into(),
            ));
        }

        let output = src.htlc_output(&funding_tx, script.as_slice()).await?;
        let making = satoshis(order.making_amount)?;
        if output.amount < making {
            return Err(ResolverError::InvalidScriptParameters(format!(
                "HTLC output {}:{} holds {} sat, order makes {}",
                funding_tx, output.vout, output.amount, making
            )));
        }

        let deployed_at = if self.config.utxo_finality_wait {
            let receipt = src.wait_for_confirmation(&funding_tx).await?;
            receipt.block_timestamp.unwrap_or_else(|| self.clock.now())
        } else {
            warn!("[resolver] not waiting for maker funding {}; anchoring at now", funding_tx);
            self.clock.now()
        };
        let timelocks = set_deployed_at(pack(&order.time_lock_schedule), deployed_at)?;
        check_src_lock_times(&params, timelocks)?;

        let immutables = Immutables {
            order_hash: order.hash,
            hash_lock: order.hash_lock.sha256,
            maker: key_identity(&params.refunder),
            taker: src.resolver_identity(),
            token: order.src_token,
            amount: U256::from(output.amount),
            safety_deposit: order.src_safety_deposit,
            timelocks,
        };
        order.record_immutables(Leg::Src, immutables)?;
        order.record_escrow_address(Leg::Src, output.address)?;
        Ok(())
    }

    /// Destination immutables before deployment, with the hash lock the
    /// destination ledger verifies.
    fn dst_immutables(
        &self,
        order: &Order,
        dst: &dyn ChainAdapter,
    ) -> Result<(Immutables, u64), ResolverError> {
        let src_immutables = order
            .src_immutables
            .ok_or_else(|| ResolverError::Validation("source escrow not recorded".into()))?;
        let complement = match order.dst_complement {
            Some(c) => c,
            None => DstImmutablesComplement {
                maker: self.dst_maker(order, dst.kind())?,
                amount: order.taking_amount,
                token: order.dst_token,
                safety_deposit: order.dst_safety_deposit,
                chain_id: U256::from(order.dst_chain_id),
            },
        };
        let mut immutables = src_immutables.for_destination(&complement, dst.resolver_identity());
        immutables.hash_lock = order.hash_lock.for_kind(dst.kind());
        let src_cancellation = deadline(src_immutables.timelocks, Stage::SrcCancellation);
        Ok((immutables, src_cancellation))
    }

    fn dst_maker(&self, order: &Order, kind: ChainKind) -> Result<H160, ResolverError> {
        match kind {
            ChainKind::Evm => {
                let address = order.maker_dst_address.as_deref().ok_or_else(|| {
                    ResolverError::Validation("makerDstAddress is required".into())
                })?;
                parse_evm_address(address)
            }
            ChainKind::Utxo => {
                let key = order.btc_user_recipient_key.as_ref().ok_or_else(|| {
                    ResolverError::Validation("btcUserRecipientKey is required".into())
                })?;
                Ok(key_identity(key.as_slice()))
            }
        }
    }

    async fn deploy_evm_dst(
        &self,
        order: &mut Order,
        dst: &dyn ChainAdapter,
    ) -> Result<(), ResolverError> {
        let (mut immutables, src_cancellation) = self.dst_immutables(order, dst)?;
        let recorded = order.deploy_tx(Leg::Dst).map(str::to_owned);
        let tx_ref = match recorded {
            Some(tx_ref) => {
                info!("[resolver] resuming dst deployment {}", tx_ref);
                tx_ref
            }
            None => {
                let submitted = dst.deploy_dst_escrow(&immutables, src_cancellation).await;
                self.record_submission(order, TxStep::Deploy(Leg::Dst), submitted)
                    .await?
            }
        };
        let receipt = dst.wait_for_confirmation(&tx_ref).await;
        let receipt = self
            .forget_if_reverted(order, TxStep::Deploy(Leg::Dst), receipt)
            .await?;

        // The escrow stores the deployment block time; the address depends on it.
        let deployed_at = receipt.block_timestamp.unwrap_or_else(|| self.clock.now());
        immutables.timelocks = set_deployed_at(immutables.timelocks, deployed_at)?;
        let address = dst.predict_escrow_address(&immutables, Leg::Dst)?;

        order.record_immutables(Leg::Dst, immutables)?;
        order.record_escrow_address(Leg::Dst, format_evm_address(address))?;
        Ok(())
    }

    async fn fund_utxo_dst(
        &self,
        order: &mut Order,
        dst: &dyn ChainAdapter,
    ) -> Result<(), ResolverError> {
        let (mut immutables, src_cancellation) = self.dst_immutables(order, dst)?;
        immutables.timelocks = set_deployed_at(immutables.timelocks, self.clock.now())?;

        let claim_at = deadline(immutables.timelocks, Stage::DstWithdrawal);
        let refund_at = deadline(immutables.timelocks, Stage::DstCancellation);
        if refund_at >= src_cancellation {
            return Err(ResolverError::Validation(format!(
                "destination refund at {} does not precede source cancellation at {}",
                refund_at, src_cancellation
            )));
        }

        let user_key = order
            .btc_user_recipient_key
            .as_ref()
            .ok_or_else(|| ResolverError::Validation("btcUserRecipientKey is required".into()))?;
        let claimer: [u8; 33] = user_key.as_slice().try_into().map_err(|_| {
            ResolverError::Validation("btcUserRecipientKey must be 33 bytes".into())
        })?;
        let params = HtlcParams {
            order_hash: order.hash,
            hash_lock: order.hash_lock.sha256,
            claim_lock_time: lock_time(claim_at, "claimLockTime")?,
            refund_lock_time: lock_time(refund_at, "refundLockTime")?,
            claimer,
            refunder: dst.resolver_public_key().await?,
        };
        let script = build_claimable_script(&params)?;
        let amount = satoshis(immutables.amount)?;
        let address = dst.htlc_address(script.as_bytes())?;

        let funded = match dst.fund_htlc(script.as_bytes(), amount).await {
            Ok(funding) => Ok(funding.tx_ref),
            Err(ResolverError::ConfirmationTimeout {
                tx_ref,
                waited_secs,
            }) => Err((tx_ref, waited_secs)),
            Err(e) => return Err(e),
        };
        let tx_ref = match &funded {
            Ok(tx_ref) | Err((tx_ref, _)) => tx_ref.clone(),
        };
        order.record_deploy_tx(Leg::Dst, tx_ref)?;
        order.record_immutables(Leg::Dst, immutables)?;
        order.record_escrow_address(Leg::Dst, address)?;
        order.htlc_script = Some(HexBytes(script.to_bytes()));
        if let Err((tx_ref, waited_secs)) = funded {
            // Possibly broadcast: keep it so a retry waits instead of funding twice.
            self.persist(order).await?;
            return Err(ResolverError::ConfirmationTimeout {
                tx_ref,
                waited_secs,
            });
        }
        Ok(())
    }

    async fn run_withdraw(
        &self,
        hash: &Hash,
        secret: &SecureSecret,
    ) -> Result<Order, ResolverError> {
        let mut order = self.store.get(hash).await?;
        let src = self.adapter(order.src_chain_id)?;
        let dst = self.adapter(order.dst_chain_id)?;

        verify_secret(secret, &order.hash_lock, &[src.kind(), dst.kind()])?;
        match order.status {
            OrderStatus::Created => {
                return Err(ResolverError::InvalidTransition {
                    from: format!("{:?}", order.status),
                    to: format!("{:?}", OrderStatus::WithdrawCompleted),
                })
            }
            OrderStatus::WithdrawCompleted => {
                info!("[resolver] order already withdrawn");
                return Ok(order);
            }
            OrderStatus::EscrowCreated => {}
        }

        // Destination first: the maker is paid before the resolver collects.
        match dst.kind() {
            ChainKind::Evm => {
                self.withdraw_escrow(&mut order, Leg::Dst, dst.as_ref(), secret)
                    .await?
            }
            ChainKind::Utxo => {
                info!("[resolver] dst HTLC is claimed by the user with the revealed secret");
            }
        }

        match src.kind() {
            ChainKind::Evm => {
                self.withdraw_escrow(&mut order, Leg::Src, src.as_ref(), secret)
                    .await?
            }
            ChainKind::Utxo => self.redeem_src_htlc(&mut order, src.as_ref(), secret).await?,
        }

        order.advance_to(OrderStatus::WithdrawCompleted)?;
        self.persist(&order).await?;
        info!("[resolver] order advanced to withdraw_completed");
        Ok(order)
    }

    /// Withdraw an escrow, or wait on the withdrawal an earlier attempt
    /// submitted.
    async fn withdraw_escrow(
        &self,
        order: &mut Order,
        leg: Leg,
        adapter: &dyn ChainAdapter,
        secret: &SecureSecret,
    ) -> Result<(), ResolverError> {
        let recorded = order.withdraw_tx(leg).map(str::to_owned);
        let tx_ref = match recorded {
            Some(tx_ref) => tx_ref,
            None => {
                let immutables = order.immutables(leg).copied().ok_or_else(|| {
                    ResolverError::Validation(format!("{} immutables not recorded", leg))
                })?;
                let escrow = order.escrow_address(leg).ok_or_else(|| {
                    ResolverError::Validation(format!("{} escrow not recorded", leg))
                })?;
                let escrow = parse_evm_address(escrow)?;
                let submitted = adapter.withdraw(leg, escrow, secret, &immutables).await;
                self.record_submission(order, TxStep::Withdraw(leg), submitted)
                    .await?
            }
        };
        let confirmed = adapter.wait_for_confirmation(&tx_ref).await;
        self.forget_if_reverted(order, TxStep::Withdraw(leg), confirmed)
            .await?;
        info!("[resolver] {} escrow withdrawn in {}", leg, tx_ref);
        Ok(())
    }

    /// Claim the maker's HTLC. A redeem recorded by an earlier attempt is
    /// waited on rather than rebuilt.
    async fn redeem_src_htlc(
        &self,
        order: &mut Order,
        src: &dyn ChainAdapter,
        secret: &SecureSecret,
    ) -> Result<(), ResolverError> {
        if let Some(tx_ref) = order.withdraw_tx(Leg::Src) {
            src.wait_for_confirmation(tx_ref).await?;
            return Ok(());
        }
        let funding_tx = order
            .src_deploy_tx_ref
            .clone()
            .ok_or_else(|| ResolverError::Validation("srcDeployTxRef is required".into()))?;
        let script = order
            .htlc_script
            .clone()
            .ok_or_else(|| ResolverError::Validation("htlcScript is required".into()))?;
        let submitted = src
            .redeem_htlc(&funding_tx, script.as_slice(), secret)
            .await
            .map(|receipt| receipt.tx_ref);
        let tx_ref = self
            .record_submission(order, TxStep::Withdraw(Leg::Src), submitted)
            .await?;
        info!("[resolver] src HTLC redeemed in {}", tx_ref);
        Ok(())
    }

    async fn run_relay_withdraw(&self, payload: &SecretRevealed) -> Result<Order, ResolverError> {
        let order = self.store.get(&payload.order_hash).await?;
        if order.status != OrderStatus::Created {
            check_relay_payload(&order, payload)?;
        }
        self.run_withdraw(&payload.order_hash, &payload.secret).await
    }
}

/// A transaction slot of an order.
#[derive(Clone, Copy, Debug)]
enum TxStep {
    Deploy(Leg),
    Withdraw(Leg),
}

impl TxStep {
    fn record(self, order: &mut Order, tx_ref: String) -> Result<(), ResolverError> {
        match self {
            TxStep::Deploy(leg) => order.record_deploy_tx(leg, tx_ref),
            TxStep::Withdraw(leg) => order.record_withdraw_tx(leg, tx_ref),
        }
    }

    fn forget(self, order: &mut Order) -> Option<String> {
        match self {
            TxStep::Deploy(leg) => order.forget_deploy_tx(leg),
            TxStep::Withdraw(leg) => order.forget_withdraw_tx(leg),
        }
    }
}

impl std::fmt::Display for TxStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxStep::Deploy(leg) => write!(f, "{} deploy", leg),
            TxStep::Withdraw(leg) => write!(f, "{} withdraw", leg),
        }
    }
}

/// The maker's script must let the resolver claim no later than the source
/// withdrawal window opens, and must keep the maker's refund closed until
/// source cancellation, which follows destination cancellation.
fn check_src_lock_times(params: &HtlcParams, timelocks: U256) -> Result<(), ResolverError> {
    let withdrawal = deadline(timelocks, Stage::SrcWithdrawal);
    let cancellation = deadline(timelocks, Stage::SrcCancellation);
    if u64::from(params.claim_lock_time) > withdrawal {
        return Err(ResolverError::InvalidScriptParameters(format!(
            "claim lock time {} is after source withdrawal at {}",
            params.claim_lock_time, withdrawal
        )));
    }
    if u64::from(params.refund_lock_time) < cancellation {
        return Err(ResolverError::InvalidScriptParameters(format!(
            "refund lock time {} precedes source cancellation at {}",
            params.refund_lock_time, cancellation
        )));
    }
    Ok(())
}

/// Cross-check a relay payload against what was recorded for the order.
fn check_relay_payload(order: &Order, payload: &SecretRevealed) -> Result<(), ResolverError> {
    let mismatch = |what: &str| ResolverError::Validation(format!("relay {} does not match order", what));

    if payload.hash_lock != order.hash_lock {
        return Err(mismatch("hash lock"));
    }
    if payload.src_chain_id != order.src_chain_id || payload.dst_chain_id != order.dst_chain_id {
        return Err(mismatch("chain ids"));
    }
    for (leg, address, immutables) in [
        (Leg::Src, &payload.src_escrow_address, &payload.src_immutables),
        (Leg::Dst, &payload.dst_escrow_address, &payload.dst_immutables),
    ] {
        if let Some(recorded) = order.escrow_address(leg) {
            if !recorded.eq_ignore_ascii_case(address) {
                return Err(mismatch(&format!("{} escrow address", leg)));
            }
        }
        if let Some(recorded) = order.immutables(leg) {
            if recorded != immutables {
                return Err(mismatch(&format!("{} immutables", leg)));
            }
        }
    }
    if let (Some(recorded), Some(relayed)) = (&order.htlc_script, &payload.htlc_script) {
        if recorded != relayed {
            return Err(mismatch("HTLC script"));
        }
    }
    Ok(())
}

/// 20-byte identity of a compressed key (HASH160).
fn key_identity(key: &[u8]) -> H160 {
    H160::from(hash160::Hash::hash(key).to_byte_array())
}

fn lock_time(value: u64, field: &'static str) -> Result<u32, ResolverError> {
    u32::try_from(value).map_err(|_| ResolverError::OutOfRange {
        field,
        value: value.to_string(),
    })
}

fn satoshis(amount: U256) -> Result<u64, ResolverError> {
    if amount > U256::from(u64::MAX) {
        return Err(ResolverError::OutOfRange {
            field: "amount",
            value: amount.to_string(),
        });
    }
    Ok(amount.low_u64())
}

#[async_trait]
impl ResolverApi for ResolverService {
    async fn create_escrows(&self, hash: &Hash) -> Result<Order, ResolverError> {
        self.locked("create_escrows", hash, self.run_create_escrows(hash))
            .await
    }

    async fn withdraw(&self, hash: &Hash, secret: &SecureSecret) -> Result<Order, ResolverError> {
        self.locked("withdraw", hash, self.run_withdraw(hash, secret))
            .await
    }

    /// The payload is checked under the order lock, against the state the
    /// withdrawal then acts on.
    async fn withdraw_from_relay(&self, payload: &SecretRevealed) -> Result<Order, ResolverError> {
        self.locked(
            "withdraw",
            &payload.order_hash,
            self.run_relay_withdraw(payload),
        )
        .await
    }

    async fn get_order(&self, hash: &Hash) -> Result<Order, ResolverError> {
        self.store.get(hash).await
    }

    async fn list_orders(&self) -> Result<Vec<Order>, ResolverError> {
        self.store.list_all().await
    }
}
