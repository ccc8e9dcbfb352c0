//! In-memory ledger implementing [`ChainAdapter`] for either ledger family.
//!
//! Models just enough of each chain to run whole swaps without a node:
//! escrow clones with withdrawal windows and hash-lock checks on the
//! account side, P2SH HTLC outputs with lock-time and preimage checks on the
//! UTXO side. Every transaction is mined immediately in its own block,
//! timestamped from the shared [`TimeSource`].
//!
//! Call counters and one-shot failure injection make it usable as a test
//! double for the orchestrator.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use bitcoin::{CompressedPublicKey, Network};
use parking_lot::Mutex;
use primitive_types::{H160, H256, U256};
use sha2::{Digest, Sha256};
use sha3::Keccak256;
use tracing::{debug, info};

use crate::algorithms::timelocks::{self, Stage};
use crate::algorithms::{abi, compute_escrow_address, p2sh_address, parse_claimable_script};
use crate::domain::{
    ChainKind, DstImmutablesComplement, FillAuthorization, HexBytes, Immutables, Leg,
    ResolverError, SecureSecret, TxReceipt,
};
use crate::ports::outbound::{ChainAdapter, HtlcFunding, SrcDeployment, TimeSource, UtxoOutput};

/// Flat fee charged by the simulated UTXO chain per transaction, in sat.
pub const SIMULATED_UTXO_FEE: u64 = 500;

/// Chain-family specific parameters.
#[derive(Clone, Debug)]
pub enum SimulatedChain {
    Evm {
        resolver_contract: H160,
        escrow_factory: H160,
        src_escrow_code_hash: H256,
        dst_escrow_code_hash: H256,
    },
    Utxo {
        network: Network,
    },
}

/// An escrow clone held by the simulated account chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulatedEscrow {
    pub leg: Leg,
    pub immutables: Immutables,
    pub withdrawn: bool,
}

/// An HTLC output held by the simulated UTXO chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulatedHtlc {
    pub script: HexBytes,
    pub address: String,
    pub amount: u64,
    pub spent_by: Option<String>,
}

#[derive(Default)]
struct LedgerState {
    height: u64,
    tx_counter: u64,
    resolver_balance: U256,
    accounts: HashMap<H160, U256>,
    escrows: HashMap<H160, SimulatedEscrow>,
    htlcs: HashMap<String, SimulatedHtlc>,
    receipts: HashMap<String, TxReceipt>,
    deployments: HashMap<String, SrcDeployment>,
    /// UTXO-chain balances of third parties, by claim key.
    user_balances: HashMap<[u8; 33], u64>,
    calls: HashMap<&'static str, usize>,
    failures: HashMap<&'static str, VecDeque<ResolverError>>,
}

impl LedgerState {
    /// Mine a transaction into a new block and return its receipt.
    fn mine(&mut self, chain_id: u64, kind: ChainKind, now: u64) -> TxReceipt {
        self.height += 1;
        self.tx_counter += 1;
        let mut seed = chain_id.to_be_bytes().to_vec();
        seed.extend_from_slice(&self.tx_counter.to_be_bytes());
        let tx_ref = match kind {
            ChainKind::Evm => format!("0x{}", hex::encode(Keccak256::digest(&seed))),
            ChainKind::Utxo => hex::encode(Sha256::digest(&seed)),
        };
        let receipt = TxReceipt {
            tx_ref: tx_ref.clone(),
            block_number: Some(self.height),
            block_timestamp: Some(now),
        };
        self.receipts.insert(tx_ref, receipt.clone());
        receipt
    }
}

/// In-memory ledger.
pub struct SimulatedLedger {
    chain_id: u64,
    chain: SimulatedChain,
    resolver_key: [u8; 33],
    clock: Arc<dyn TimeSource>,
    state: Mutex<LedgerState>,
}

impl SimulatedLedger {
    /// Account chain with the given contracts.
    pub fn evm(
        chain_id: u64,
        resolver_key: [u8; 33],
        resolver_contract: H160,
        escrow_factory: H160,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            chain_id,
            chain: SimulatedChain::Evm {
                resolver_contract,
                escrow_factory,
                src_escrow_code_hash: H256::from_slice(&Keccak256::digest(b"EscrowSrc")),
                dst_escrow_code_hash: H256::from_slice(&Keccak256::digest(b"EscrowDst")),
            },
            resolver_key,
            clock,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Regtest UTXO chain.
    pub fn utxo(chain_id: u64, resolver_key: [u8; 33], clock: Arc<dyn TimeSource>) -> Self {
        Self {
            chain_id,
            chain: SimulatedChain::Utxo {
                network: Network::Regtest,
            },
            resolver_key,
            clock,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Seed the resolver's spendable balance.
    pub fn with_resolver_balance(self, balance: impl Into<U256>) -> Self {
        self.state.lock().resolver_balance = balance.into();
        self
    }

    /// Seed a third-party account balance (account chains).
    pub fn with_account(self, account: H160, balance: impl Into<U256>) -> Self {
        self.state.lock().accounts.insert(account, balance.into());
        self
    }

    pub fn resolver_balance(&self) -> U256 {
        self.state.lock().resolver_balance
    }

    pub fn account_balance(&self, account: H160) -> U256 {
        self.state
            .lock()
            .accounts
            .get(&account)
            .copied()
            .unwrap_or_default()
    }

    pub fn escrow(&self, address: H160) -> Option<SimulatedEscrow> {
        self.state.lock().escrows.get(&address).cloned()
    }

    /// Sats a user collected by claiming HTLCs with `key`.
    pub fn user_balance(&self, key: &[u8; 33]) -> u64 {
        self.state
            .lock()
            .user_balances
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    pub fn htlc(&self, funding_tx: &str) -> Option<SimulatedHtlc> {
        self.state.lock().htlcs.get(funding_tx).cloned()
    }

    /// How many times an adapter operation was invoked.
    pub fn calls(&self, operation: &str) -> usize {
        self.state.lock().calls.get(operation).copied().unwrap_or(0)
    }

    /// Total adapter operations invoked.
    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.values().sum()
    }

    /// Make the next call of `operation` fail with `error`.
    pub fn fail_next(&self, operation: &'static str, error: ResolverError) {
        self.state
            .lock()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    fn enter(&self, operation: &'static str) -> Result<(), ResolverError> {
        let mut state = self.state.lock();
        *state.calls.entry(operation).or_default() += 1;
        match state.failures.get_mut(operation).and_then(|q| q.pop_front()) {
            Some(error) => {
                debug!("[resolver] simulated {} failure injected: {}", operation, error);
                Err(error)
            }
            None => Ok(()),
        }
    }

    fn evm_params(&self) -> Result<(H160, H160, H256, H256), ResolverError> {
        match &self.chain {
            SimulatedChain::Evm {
                resolver_contract,
                escrow_factory,
                src_escrow_code_hash,
                dst_escrow_code_hash,
            } => Ok((
                *resolver_contract,
                *escrow_factory,
                *src_escrow_code_hash,
                *dst_escrow_code_hash,
            )),
            SimulatedChain::Utxo { .. } => Err(ResolverError::UnsupportedOperation {
                operation: "escrow",
                chain: self.describe(),
            }),
        }
    }

    fn network(&self) -> Result<Network, ResolverError> {
        match &self.chain {
            SimulatedChain::Utxo { network } => Ok(*network),
            SimulatedChain::Evm { .. } => Err(ResolverError::UnsupportedOperation {
                operation: "htlc",
                chain: self.describe(),
            }),
        }
    }

    fn escrow_address(&self, immutables: &Immutables, leg: Leg) -> Result<H160, ResolverError> {
        let (_, factory, src_code, dst_code) = self.evm_params()?;
        let code = match leg {
            Leg::Src => src_code,
            Leg::Dst => dst_code,
        };
        Ok(compute_escrow_address(factory, immutables, code))
    }

    /// Lock a user's HTLC output (the maker funding a UTXO source leg).
    pub fn fund_htlc_as_user(&self, script: &[u8], amount: u64) -> Result<String, ResolverError> {
        parse_claimable_script(bitcoin::Script::from_bytes(script))?;
        let address = p2sh_address(bitcoin::Script::from_bytes(script), self.network()?)?;
        let mut state = self.state.lock();
        let receipt = state.mine(self.chain_id, ChainKind::Utxo, self.clock.now());
        state.htlcs.insert(
            receipt.tx_ref.clone(),
            SimulatedHtlc {
                script: HexBytes(script.to_vec()),
                address: address.to_string(),
                amount,
                spent_by: None,
            },
        );
        Ok(receipt.tx_ref)
    }

    /// The user claims a destination HTLC with the secret.
    pub fn redeem_as_user(
        &self,
        funding_tx: &str,
        secret: &SecureSecret,
    ) -> Result<String, ResolverError> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let htlc = state
            .htlcs
            .get(funding_tx)
            .cloned()
            .ok_or_else(|| ResolverError::Validation(format!("unknown htlc {}", funding_tx)))?;
        let claimer = check_claim(&htlc, secret, now)?;
        let receipt = state.mine(self.chain_id, ChainKind::Utxo, now);
        if let Some(h) = state.htlcs.get_mut(funding_tx) {
            h.spent_by = Some(receipt.tx_ref.clone());
        }
        *state.user_balances.entry(claimer).or_default() +=
            htlc.amount.saturating_sub(SIMULATED_UTXO_FEE);
        Ok(receipt.tx_ref)
    }

    /// Resolver contract / wallet identity of this ledger.
    fn identity(&self) -> H160 {
        match &self.chain {
            SimulatedChain::Evm {
                resolver_contract, ..
            } => *resolver_contract,
            SimulatedChain::Utxo { .. } => CompressedPublicKey::from_slice(&self.resolver_key)
                .map(|k| H160::from_slice(bitcoin::hashes::Hash::as_byte_array(&k.wpubkey_hash())))
                .unwrap_or_default(),
        }
    }
}

/// Script verification a node would perform on a claim-branch spend.
/// Returns the claim key the output is paid to.
fn check_claim(
    htlc: &SimulatedHtlc,
    secret: &SecureSecret,
    now: u64,
) -> Result<[u8; 33], ResolverError> {
    if htlc.spent_by.is_some() {
        return Err(ResolverError::BroadcastRejected("bad-txns-inputs-missingorspent".into()));
    }
    let params = parse_claimable_script(bitcoin::Script::from_bytes(htlc.script.as_slice()))?;
    let digest = H256::from_slice(&Sha256::digest(secret.as_bytes()));
    if digest != params.hash_lock {
        return Err(ResolverError::BroadcastRejected(
            "mandatory-script-verify-flag-failed (OP_EQUALVERIFY)".into(),
        ));
    }
    if now < u64::from(params.claim_lock_time) {
        return Err(ResolverError::BroadcastRejected("non-final".into()));
    }
    Ok(params.claimer)
}

fn u256_to_sat(value: U256) -> Result<u64, ResolverError> {
    if value > U256::from(u64::MAX) {
        return Err(ResolverError::OutOfRange {
            field: "amount",
            value: value.to_string(),
        });
    }
    Ok(value.low_u64())
}

/// Fill whose extension args carry the destination complement, as the
/// simulated resolver contract expects.
pub fn simulated_fill(complement: &DstImmutablesComplement) -> FillAuthorization {
    FillAuthorization {
        args: HexBytes(abi::encode_complement(complement)),
        ..Default::default()
    }
}

#[async_trait]
impl ChainAdapter for SimulatedLedger {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn kind(&self) -> ChainKind {
        match self.chain {
            SimulatedChain::Evm { .. } => ChainKind::Evm,
            SimulatedChain::Utxo { .. } => ChainKind::Utxo,
        }
    }

    fn resolver_identity(&self) -> H160 {
        self.identity()
    }

    async fn resolver_public_key(&self) -> Result<[u8; 33], ResolverError> {
        self.enter("resolver_public_key")?;
        Ok(self.resolver_key)
    }

    async fn deploy_src_escrow(
        &self,
        immutables: &Immutables,
        fill: &FillAuthorization,
    ) -> Result<String, ResolverError> {
        self.enter("deploy_src_escrow")?;
        let (resolver_contract, _, _, _) = self.evm_params()?;
        let complement = abi::decode_complement(fill.args.as_slice())?;
        let now = self.clock.now();

        let mut event_immutables = *immutables;
        event_immutables.taker = resolver_contract;
        event_immutables.timelocks = timelocks::set_deployed_at(immutables.timelocks, now)?;
        let address = self.escrow_address(&event_immutables, Leg::Src)?;

        let mut state = self.state.lock();
        let maker_balance = state.accounts.get(&immutables.maker).copied().unwrap_or_default();
        if maker_balance < immutables.amount {
            return Err(ResolverError::RevertedExecution(
                "TransferFromMakerToTakerFailed".into(),
            ));
        }
        if state.resolver_balance < immutables.safety_deposit {
            return Err(ResolverError::InsufficientFunds {
                required: immutables.safety_deposit.to_string(),
                available: state.resolver_balance.to_string(),
            });
        }
        state
            .accounts
            .insert(immutables.maker, maker_balance - immutables.amount);
        state.resolver_balance -= immutables.safety_deposit;
        state.escrows.insert(
            address,
            SimulatedEscrow {
                leg: Leg::Src,
                immutables: event_immutables,
                withdrawn: false,
            },
        );
        let receipt = state.mine(self.chain_id, ChainKind::Evm, now);
        info!("[resolver] simulated src escrow {:?} on chain {}", address, self.chain_id);
        let tx_ref = receipt.tx_ref.clone();
        state.deployments.insert(
            tx_ref.clone(),
            SrcDeployment {
                receipt,
                immutables: event_immutables,
                complement,
            },
        );
        Ok(tx_ref)
    }

    async fn src_deployment(&self, tx_ref: &str) -> Result<SrcDeployment, ResolverError> {
        self.enter("src_deployment")?;
        self.evm_params()?;
        self.state
            .lock()
            .deployments
            .get(tx_ref)
            .cloned()
            .ok_or_else(|| ResolverError::ConfirmationTimeout {
                tx_ref: tx_ref.to_string(),
                waited_secs: 0,
            })
    }

    async fn deploy_dst_escrow(
        &self,
        immutables: &Immutables,
        src_cancellation_timestamp: u64,
    ) -> Result<String, ResolverError> {
        self.enter("deploy_dst_escrow")?;
        let now = self.clock.now();
        let mut deployed = *immutables;
        deployed.timelocks = timelocks::set_deployed_at(immutables.timelocks, now)?;
        if timelocks::deadline(deployed.timelocks, Stage::DstCancellation) > src_cancellation_timestamp
        {
            return Err(ResolverError::RevertedExecution("InvalidCreationTime".into()));
        }
        let address = self.escrow_address(&deployed, Leg::Dst)?;

        let mut state = self.state.lock();
        let required = immutables.amount.saturating_add(immutables.safety_deposit);
        if state.resolver_balance < required {
            return Err(ResolverError::InsufficientFunds {
                required: required.to_string(),
                available: state.resolver_balance.to_string(),
            });
        }
        state.resolver_balance -= required;
        state.escrows.insert(
            address,
            SimulatedEscrow {
                leg: Leg::Dst,
                immutables: deployed,
                withdrawn: false,
            },
        );
        let receipt = state.mine(self.chain_id, ChainKind::Evm, now);
        info!("[resolver] simulated dst escrow {:?} on chain {}", address, self.chain_id);
        Ok(receipt.tx_ref)
    }

    async fn withdraw(
        &self,
        leg: Leg,
        escrow: H160,
        secret: &SecureSecret,
        immutables: &Immutables,
    ) -> Result<String, ResolverError> {
        self.enter("withdraw")?;
        if self.escrow_address(immutables, leg)? != escrow {
            return Err(ResolverError::RevertedExecution("InvalidImmutables".into()));
        }
        let now = self.clock.now();
        let mut state = self.state.lock();
        let record = state
            .escrows
            .get(&escrow)
            .cloned()
            .ok_or_else(|| ResolverError::RevertedExecution("escrow not deployed".into()))?;
        if record.withdrawn {
            return Err(ResolverError::RevertedExecution("already withdrawn".into()));
        }
        let digest = H256::from_slice(&Keccak256::digest(secret.as_bytes()));
        if digest != record.immutables.hash_lock {
            return Err(ResolverError::RevertedExecution("InvalidSecret".into()));
        }
        let (open, close) = match leg {
            Leg::Src => (Stage::SrcWithdrawal, Stage::SrcCancellation),
            Leg::Dst => (Stage::DstWithdrawal, Stage::DstCancellation),
        };
        let tl = record.immutables.timelocks;
        if now < timelocks::deadline(tl, open) || now >= timelocks::deadline(tl, close) {
            return Err(ResolverError::RevertedExecution("InvalidTime".into()));
        }

        let amount = record.immutables.amount;
        match leg {
            // Source funds go to the taker: the resolver.
            Leg::Src => state.resolver_balance += amount,
            Leg::Dst => {
                *state.accounts.entry(record.immutables.maker).or_default() += amount;
            }
        }
        state.resolver_balance += record.immutables.safety_deposit;
        if let Some(e) = state.escrows.get_mut(&escrow) {
            e.withdrawn = true;
        }
        Ok(state.mine(self.chain_id, ChainKind::Evm, now).tx_ref)
    }

    async fn fund_htlc(&self, script: &[u8], amount: u64) -> Result<HtlcFunding, ResolverError> {
        self.enter("fund_htlc")?;
        let network = self.network()?;
        parse_claimable_script(bitcoin::Script::from_bytes(script))?;
        let address = p2sh_address(bitcoin::Script::from_bytes(script), network)?.to_string();

        let mut state = self.state.lock();
        let available = u256_to_sat(state.resolver_balance)?;
        if available == 0 {
            return Err(ResolverError::NoUtxos("resolver wallet".into()));
        }
        let required = amount + SIMULATED_UTXO_FEE;
        if available < required {
            return Err(ResolverError::InsufficientFunds {
                required: format!("{} sat", required),
                available: format!("{} sat", available),
            });
        }
        state.resolver_balance = U256::from(available - required);
        let receipt = state.mine(self.chain_id, ChainKind::Utxo, self.clock.now());
        state.htlcs.insert(
            receipt.tx_ref.clone(),
            SimulatedHtlc {
                script: HexBytes(script.to_vec()),
                address: address.clone(),
                amount,
                spent_by: None,
            },
        );
        Ok(HtlcFunding {
            tx_ref: receipt.tx_ref,
            vout: 0,
            address,
            amount,
        })
    }

    async fn redeem_htlc(
        &self,
        funding_tx: &str,
        script: &[u8],
        secret: &SecureSecret,
    ) -> Result<TxReceipt, ResolverError> {
        self.enter("redeem_htlc")?;
        self.network()?;
        let params = parse_claimable_script(bitcoin::Script::from_bytes(script))?;
        if params.claimer != self.resolver_key {
            return Err(ResolverError::InvalidScriptParameters(
                "HTLC claim key is not the resolver's".into(),
            ));
        }
        let now = self.clock.now();
        let mut state = self.state.lock();
        let htlc = state
            .htlcs
            .get(funding_tx)
            .cloned()
            .ok_or_else(|| ResolverError::Validation(format!("unknown transaction {}", funding_tx)))?;
        if htlc.script.as_slice() != script {
            return Err(ResolverError::InvalidScriptParameters(format!(
                "{} does not pay the HTLC",
                funding_tx
            )));
        }
        check_claim(&htlc, secret, now)?;
        let receipt = state.mine(self.chain_id, ChainKind::Utxo, now);
        if let Some(h) = state.htlcs.get_mut(funding_tx) {
            h.spent_by = Some(receipt.tx_ref.clone());
        }
        state.resolver_balance += U256::from(htlc.amount.saturating_sub(SIMULATED_UTXO_FEE));
        Ok(receipt)
    }

    async fn htlc_output(
        &self,
        funding_tx: &str,
        script: &[u8],
    ) -> Result<HtlcFunding, ResolverError> {
        self.enter("htlc_output")?;
        self.network()?;
        let htlc = self
            .htlc(funding_tx)
            .ok_or_else(|| ResolverError::Validation(format!("unknown transaction {}", funding_tx)))?;
        if htlc.script.as_slice() != script {
            return Err(ResolverError::InvalidScriptParameters(format!(
                "{} does not pay the HTLC",
                funding_tx
            )));
        }
        Ok(HtlcFunding {
            tx_ref: funding_tx.to_string(),
            vout: 0,
            address: htlc.address,
            amount: htlc.amount,
        })
    }

    fn htlc_address(&self, script: &[u8]) -> Result<String, ResolverError> {
        Ok(p2sh_address(bitcoin::Script::from_bytes(script), self.network()?)?.to_string())
    }

    async fn wait_for_confirmation(&self, tx_ref: &str) -> Result<TxReceipt, ResolverError> {
        self.enter("wait_for_confirmation")?;
        self.state
            .lock()
            .receipts
            .get(tx_ref)
            .cloned()
            .ok_or_else(|| ResolverError::ConfirmationTimeout {
                tx_ref: tx_ref.to_string(),
                waited_secs: 0,
            })
    }

    async fn utxos(&self, address: &str) -> Result<Vec<UtxoOutput>, ResolverError> {
        self.enter("utxos")?;
        self.network()?;
        Ok(self
            .state
            .lock()
            .htlcs
            .iter()
            .filter(|(_, h)| h.address == address && h.spent_by.is_none())
            .map(|(txid, h)| UtxoOutput {
                txid: txid.clone(),
                vout: 0,
                value: h.amount,
                confirmed: true,
            })
            .collect())
    }

    async fn balance(&self) -> Result<U256, ResolverError> {
        self.enter("balance")?;
        Ok(self.state.lock().resolver_balance)
    }

    async fn broadcast_raw(&self, _raw: &[u8]) -> Result<String, ResolverError> {
        self.enter("broadcast_raw")?;
        let kind = self.kind();
        let mut state = self.state.lock();
        Ok(state.mine(self.chain_id, kind, self.clock.now()).tx_ref)
    }

    fn predict_escrow_address(
        &self,
        immutables: &Immutables,
        leg: Leg,
    ) -> Result<H160, ResolverError> {
        self.escrow_address(immutables, leg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{build_claimable_script, HtlcParams};
    use crate::ports::outbound::ManualTimeSource;
    use k256::ecdsa::SigningKey;

    fn key(seed: u8) -> [u8; 33] {
        let sk = SigningKey::from_slice(&[seed; 32]).unwrap();
        sk.verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .try_into()
            .unwrap()
    }

    #[tokio::test]
    async fn test_failure_injection_is_one_shot() {
        let clock = Arc::new(ManualTimeSource::new(1_000));
        let ledger = SimulatedLedger::utxo(2, key(1), clock).with_resolver_balance(10u64);
        ledger.fail_next("balance", ResolverError::Rpc("down".into()));
        assert!(ledger.balance().await.is_err());
        assert_eq!(ledger.balance().await.unwrap(), U256::from(10u64));
        assert_eq!(ledger.calls("balance"), 2);
    }

    #[tokio::test]
    async fn test_utxo_funding_shortfall() {
        let clock = Arc::new(ManualTimeSource::new(1_000));
        let script = build_claimable_script(&HtlcParams {
            order_hash: H256::repeat_byte(1),
            hash_lock: H256::repeat_byte(2),
            claim_lock_time: 1_010,
            refund_lock_time: 1_100,
            claimer: key(2),
            refunder: key(1),
        })
        .unwrap();

        let empty = SimulatedLedger::utxo(2, key(1), clock.clone());
        assert!(matches!(
            empty.fund_htlc(script.as_bytes(), 1_000).await,
            Err(ResolverError::NoUtxos(_))
        ));

        let poor = SimulatedLedger::utxo(2, key(1), clock).with_resolver_balance(1_200u64);
        assert!(matches!(
            poor.fund_htlc(script.as_bytes(), 1_000).await,
            Err(ResolverError::InsufficientFunds { .. })
        ));
    }

    #[tokio::test]
    async fn test_user_redeem_enforces_lock_time_and_preimage() {
        let clock = Arc::new(ManualTimeSource::new(1_000));
        let secret = SecureSecret::new([7u8; 32]);
        let script = build_claimable_script(&HtlcParams {
            order_hash: H256::repeat_byte(1),
            hash_lock: secret.hash_lock().sha256,
            claim_lock_time: 1_010,
            refund_lock_time: 1_100,
            claimer: key(2),
            refunder: key(1),
        })
        .unwrap();
        let ledger =
            SimulatedLedger::utxo(2, key(1), clock.clone()).with_resolver_balance(100_000u64);
        let funding = ledger.fund_htlc(script.as_bytes(), 10_000).await.unwrap();

        assert!(ledger.redeem_as_user(&funding.tx_ref, &secret).is_err());
        clock.advance(10);
        assert!(ledger
            .redeem_as_user(&funding.tx_ref, &SecureSecret::new([8u8; 32]))
            .is_err());
        ledger.redeem_as_user(&funding.tx_ref, &secret).unwrap();
        assert!(ledger.htlc(&funding.tx_ref).unwrap().spent_by.is_some());
        assert_eq!(ledger.user_balance(&key(2)), 10_000 - SIMULATED_UTXO_FEE);
        assert_eq!(ledger.user_balance(&key(1)), 0);
    }

    #[tokio::test]
    async fn test_htlc_output_requires_matching_script() {
        let clock = Arc::new(ManualTimeSource::new(1_000));
        let params = HtlcParams {
            order_hash: H256::repeat_byte(1),
            hash_lock: H256::repeat_byte(2),
            claim_lock_time: 1_010,
            refund_lock_time: 1_100,
            claimer: key(1),
            refunder: key(2),
        };
        let script = build_claimable_script(&params).unwrap();
        let other = build_claimable_script(&HtlcParams {
            order_hash: H256::repeat_byte(9),
            ..params
        })
        .unwrap();
        let ledger = SimulatedLedger::utxo(2, key(1), clock);
        let funding_tx = ledger.fund_htlc_as_user(script.as_bytes(), 4_000).unwrap();

        let output = ledger.htlc_output(&funding_tx, script.as_bytes()).await.unwrap();
        assert_eq!(output.amount, 4_000);
        assert_eq!(output.address, ledger.htlc_address(script.as_bytes()).unwrap());
        assert!(matches!(
            ledger.htlc_output(&funding_tx, other.as_bytes()).await,
            Err(ResolverError::InvalidScriptParameters(_))
        ));
    }

    #[tokio::test]
    async fn test_src_deployment_is_read_back_by_reference() {
        let clock = Arc::new(ManualTimeSource::new(1_000));
        let maker = H160::repeat_byte(0xaa);
        let ledger = SimulatedLedger::evm(
            1,
            key(1),
            H160::repeat_byte(0x11),
            H160::repeat_byte(0x22),
            clock,
        )
        .with_resolver_balance(10u64)
        .with_account(maker, 100u64);
        let immutables = Immutables {
            maker,
            amount: U256::from(60u64),
            safety_deposit: U256::from(5u64),
            ..Default::default()
        };
        let fill = simulated_fill(&DstImmutablesComplement::default());

        let tx_ref = ledger.deploy_src_escrow(&immutables, &fill).await.unwrap();
        let deployment = ledger.src_deployment(&tx_ref).await.unwrap();
        assert_eq!(deployment.receipt.tx_ref, tx_ref);
        assert_eq!(deployment.immutables.taker, H160::repeat_byte(0x11));
        assert_eq!(ledger.account_balance(maker), U256::from(40u64));
        assert!(matches!(
            ledger.src_deployment("0x00").await,
            Err(ResolverError::ConfirmationTimeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_escrow_operations_unsupported_on_utxo() {
        let clock = Arc::new(ManualTimeSource::new(1_000));
        let ledger = SimulatedLedger::utxo(2, key(1), clock);
        let err = ledger
            .deploy_dst_escrow(&Immutables::default(), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolverError::UnsupportedOperation { .. }));
    }
}
