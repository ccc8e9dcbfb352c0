//! EVM chain adapter: resolver-contract calls over JSON-RPC.

use std::sync::Arc;

use async_trait::async_trait;
use primitive_types::{H160, H256, U256};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::rpc::{JsonRpcClient, RpcReceipt};
use super::tx::{transaction_hash, LegacyTransaction};
use crate::adapters::retry::RetryPolicy;
use crate::algorithms::{abi, addressing, compute_escrow_address};
use crate::domain::{
    ChainKind, EvmChainConfig, FillAuthorization, Immutables, Leg, ResolverError, SecureSecret,
    TxReceipt,
};
use crate::ports::outbound::{ChainAdapter, SigningContext, SrcDeployment, TransactionSigner};

/// Account-chain adapter.
///
/// Sends are serialized per wallet: the nonce is read and the transaction
/// broadcast while holding `send_lock`.
pub struct EvmAdapter {
    config: EvmChainConfig,
    rpc: JsonRpcClient,
    signer: Arc<dyn TransactionSigner>,
    public_key: [u8; 33],
    sender: H160,
    send_lock: Mutex<()>,
    retry: RetryPolicy,
}

impl EvmAdapter {
    /// Connect to the node and check it serves the configured chain.
    pub async fn connect(
        config: EvmChainConfig,
        signer: Arc<dyn TransactionSigner>,
    ) -> Result<Self, ResolverError> {
        let rpc = JsonRpcClient::new(
            config.rpc_url.clone(),
            std::time::Duration::from_secs(config.request_timeout_secs),
        )?;
        let retry = RetryPolicy::new(&config.retry);
        let remote_id = retry.run("eth_chainId", || rpc.chain_id()).await?;
        if remote_id != config.chain_id {
            return Err(ResolverError::Validation(format!(
                "node at {} serves chain {}, configured {}",
                config.rpc_url, remote_id, config.chain_id
            )));
        }
        let public_key = signer.public_key(ChainKind::Evm).await?;
        let sender = addressing::evm_address_from_public_key(&public_key)?;
        info!(
            "[resolver] evm chain {} ready, sender {}",
            config.chain_id,
            addressing::format_evm_address(sender)
        );
        Ok(Self {
            config,
            rpc,
            signer,
            public_key,
            sender,
            send_lock: Mutex::new(()),
            retry,
        })
    }

    /// Externally owned account paying gas.
    pub fn sender(&self) -> H160 {
        self.sender
    }

    /// Sign and broadcast a resolver-contract call. Returns once the node
    /// holds the transaction; confirmation is a separate step so callers can
    /// record the hash first.
    async fn send_call(
        &self,
        purpose: &str,
        data: Vec<u8>,
        value: U256,
    ) -> Result<H256, ResolverError> {
        let _guard = self.send_lock.lock().await;

        let nonce = self
            .retry
            .run("eth_getTransactionCount", || self.rpc.pending_nonce(self.sender))
            .await?;
        let gas_price = self
            .retry
            .run("eth_gasPrice", || self.rpc.gas_price())
            .await?;
        let gas = U256::from(self.config.gas_limit);

        let required = gas.saturating_mul(gas_price).saturating_add(value);
        let available = self
            .retry
            .run("eth_getBalance", || self.rpc.balance(self.sender))
            .await?;
        if available < required {
            return Err(ResolverError::InsufficientFunds {
                required: required.to_string(),
                available: available.to_string(),
            });
        }

        let tx = LegacyTransaction {
            nonce,
            gas_price,
            gas,
            to: self.config.resolver_contract,
            value,
            data,
        };
        let context = SigningContext::new(self.config.chain_id, purpose);
        let signature = self
            .signer
            .sign(ChainKind::Evm, &context, tx.signing_hash(self.config.chain_id))
            .await?;
        let raw = tx.encode_signed(self.config.chain_id, &signature)?;
        let tx_hash = self.broadcast(&raw).await?;
        info!(
            "[resolver] {} broadcast on chain {}: {:?} (nonce {})",
            purpose, self.config.chain_id, tx_hash, nonce
        );
        Ok(tx_hash)
    }

    /// Submit signed bytes. After a transport failure the same bytes are sent
    /// once more; they carry the same nonce and hash, so the node either
    /// takes them or reports it already has them.
    async fn broadcast(&self, raw: &[u8]) -> Result<H256, ResolverError> {
        match self.rpc.send_raw_transaction(raw).await {
            Err(e) if e.is_transient() => {
                warn!("[resolver] broadcast outcome unknown ({}), resending", e);
                match self.rpc.send_raw_transaction(raw).await {
                    Err(ResolverError::BroadcastRejected(msg)) if already_known(&msg) => {
                        Ok(transaction_hash(raw))
                    }
                    other => other,
                }
            }
            other => other,
        }
    }

    /// Wait for a mined receipt; a failed status is `RevertedExecution`.
    async fn confirmed(&self, tx_hash: H256) -> Result<(TxReceipt, RpcReceipt), ResolverError> {
        let receipt = self.await_receipt(tx_hash).await?;
        if !receipt.succeeded() {
            return Err(ResolverError::RevertedExecution(format!(
                "transaction {:?} reverted",
                tx_hash
            )));
        }
        let block_number = receipt.block_number.map(|n| n.low_u64());
        let block_timestamp = match block_number {
            Some(n) => self.block_timestamp(n).await?,
            None => None,
        };
        Ok((
            TxReceipt {
                tx_ref: format!("{:?}", tx_hash),
                block_number,
                block_timestamp,
            },
            receipt,
        ))
    }

    async fn block_timestamp(&self, number: u64) -> Result<Option<u64>, ResolverError> {
        let block = self
            .retry
            .run("eth_getBlockByNumber", || self.rpc.block(number))
            .await?;
        Ok(block.map(|b| b.timestamp.low_u64()))
    }

    /// Poll for a mined receipt.
    async fn await_receipt(&self, tx_hash: H256) -> Result<RpcReceipt, ResolverError> {
        let started = Instant::now();
        let timeout = self.config.confirmation.timeout();
        loop {
            match self.rpc.receipt(tx_hash).await {
                Ok(Some(receipt)) if receipt.block_number.is_some() => return Ok(receipt),
                Ok(_) => debug!("[resolver] {:?} not mined yet", tx_hash),
                Err(e) if e.is_transient() => warn!("[resolver] receipt poll failed: {}", e),
                Err(e) => return Err(e),
            }
            if started.elapsed() >= timeout {
                return Err(ResolverError::ConfirmationTimeout {
                    tx_ref: format!("{:?}", tx_hash),
                    waited_secs: started.elapsed().as_secs(),
                });
            }
            tokio::time::sleep(self.config.confirmation.poll_interval()).await;
        }
    }

    fn find_src_escrow_created(
        &self,
        receipt: &RpcReceipt,
    ) -> Result<SrcDeployment, ResolverError> {
        let topic = abi::event_topic(&abi::src_escrow_created_signature());
        let log = receipt
            .logs
            .iter()
            .find(|log| {
                log.address == self.config.escrow_factory && log.topics.first() == Some(&topic)
            })
            .ok_or_else(|| {
                ResolverError::RevertedExecution(format!(
                    "no SrcEscrowCreated event in {:?}",
                    receipt.transaction_hash
                ))
            })?;
        let (immutables, complement) = abi::decode_src_escrow_created(log.data.as_slice())?;
        Ok(SrcDeployment {
            receipt: TxReceipt::pending(format!("{:?}", receipt.transaction_hash)),
            immutables,
            complement,
        })
    }
}

fn parse_tx_ref(tx_ref: &str) -> Result<H256, ResolverError> {
    let bytes = hex::decode(tx_ref.strip_prefix("0x").unwrap_or(tx_ref))
        .map_err(|e| ResolverError::Validation(format!("tx ref {}: {}", tx_ref, e)))?;
    if bytes.len() != 32 {
        return Err(ResolverError::Validation(format!("tx ref {} is not 32 bytes", tx_ref)));
    }
    Ok(H256::from_slice(&bytes))
}

/// Node answers meaning the transaction is already in its pool.
fn already_known(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("already known") || lower.contains("known transaction")
}

/// Native value attached to an escrow deployment.
fn deployment_value(immutables: &Immutables) -> U256 {
    if immutables.token.is_zero() {
        immutables.safety_deposit.saturating_add(immutables.amount)
    } else {
        immutables.safety_deposit
    }
}

#[async_trait]
impl ChainAdapter for EvmAdapter {
    fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    fn kind(&self) -> ChainKind {
        ChainKind::Evm
    }

    /// The resolver contract is the taker recorded in immutables.
    fn resolver_identity(&self) -> H160 {
        self.config.resolver_contract
    }

    async fn resolver_public_key(&self) -> Result<[u8; 33], ResolverError> {
        Ok(self.public_key)
    }

    async fn deploy_src_escrow(
        &self,
        immutables: &Immutables,
        fill: &FillAuthorization,
    ) -> Result<String, ResolverError> {
        let data = abi::encode_deploy_src(immutables, fill);
        let hash = self
            .send_call("deploy_src", data, immutables.safety_deposit)
            .await?;
        Ok(format!("{:?}", hash))
    }

    async fn src_deployment(&self, tx_ref: &str) -> Result<SrcDeployment, ResolverError> {
        let (tx, receipt) = self.confirmed(parse_tx_ref(tx_ref)?).await?;
        let mut deployment = self.find_src_escrow_created(&receipt)?;
        deployment.receipt = tx;
        Ok(deployment)
    }

    async fn deploy_dst_escrow(
        &self,
        immutables: &Immutables,
        src_cancellation_timestamp: u64,
    ) -> Result<String, ResolverError> {
        let data = abi::encode_deploy_dst(immutables, src_cancellation_timestamp);
        let hash = self
            .send_call("deploy_dst", data, deployment_value(immutables))
            .await?;
        Ok(format!("{:?}", hash))
    }

    async fn withdraw(
        &self,
        leg: Leg,
        escrow: H160,
        secret: &SecureSecret,
        immutables: &Immutables,
    ) -> Result<String, ResolverError> {
        let data = abi::encode_withdraw(escrow, secret.as_bytes(), immutables);
        let purpose = match leg {
            Leg::Src => "withdraw_src",
            Leg::Dst => "withdraw_dst",
        };
        let hash = self.send_call(purpose, data, U256::zero()).await?;
        Ok(format!("{:?}", hash))
    }

    async fn wait_for_confirmation(&self, tx_ref: &str) -> Result<TxReceipt, ResolverError> {
        let (tx, _) = self.confirmed(parse_tx_ref(tx_ref)?).await?;
        Ok(tx)
    }

    async fn balance(&self) -> Result<U256, ResolverError> {
        self.retry
            .run("eth_getBalance", || self.rpc.balance(self.sender))
            .await
    }

    async fn broadcast_raw(&self, raw: &[u8]) -> Result<String, ResolverError> {
        let hash = self.rpc.send_raw_transaction(raw).await?;
        Ok(format!("{:?}", hash))
    }

    fn predict_escrow_address(
        &self,
        immutables: &Immutables,
        leg: Leg,
    ) -> Result<H160, ResolverError> {
        let code_hash = match leg {
            Leg::Src => self.config.src_escrow_code_hash,
            Leg::Dst => self.config.dst_escrow_code_hash,
        };
        Ok(compute_escrow_address(
            self.config.escrow_factory,
            immutables,
            code_hash,
        ))
    }
}
