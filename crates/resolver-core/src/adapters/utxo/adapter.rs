//! UTXO chain adapter: HTLC funding and redemption over an Esplora API.

use std::sync::Arc;

use async_trait::async_trait;
use bitcoin::hashes::Hash as _;
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{Address, Amount, CompressedPublicKey, OutPoint, Script, ScriptBuf, Transaction};
use primitive_types::{H160, U256};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::esplora::EsploraClient;
use super::wallet::{build_funding_tx, build_redeem_tx, Reservations};
use crate::adapters::retry::RetryPolicy;
use crate::algorithms::addressing::utxo_identity;
use crate::algorithms::{
    build_unlocking_script, p2sh_address, p2sh_script_pubkey, parse_claimable_script, UnlockPath,
};
use crate::domain::{ChainKind, ResolverError, SecureSecret, TxReceipt, UtxoChainConfig};
use crate::ports::outbound::{
    ChainAdapter, HtlcFunding, SigningContext, TransactionSigner, UtxoOutput,
};

/// UTXO-chain adapter backed by a P2WPKH wallet.
pub struct UtxoAdapter {
    config: UtxoChainConfig,
    esplora: EsploraClient,
    signer: Arc<dyn TransactionSigner>,
    public_key: [u8; 33],
    wallet_address: Address,
    wallet_script: ScriptBuf,
    identity: H160,
    reservations: Reservations,
    retry: RetryPolicy,
}

impl UtxoAdapter {
    pub async fn connect(
        config: UtxoChainConfig,
        signer: Arc<dyn TransactionSigner>,
    ) -> Result<Self, ResolverError> {
        let esplora = EsploraClient::new(
            config.esplora_url.clone(),
            std::time::Duration::from_secs(config.request_timeout_secs),
        )?;
        let public_key = signer.public_key(ChainKind::Utxo).await?;
        let cpk = CompressedPublicKey::from_slice(&public_key)
            .map_err(|e| ResolverError::Signing(format!("utxo key: {}", e)))?;
        let wallet_address = Address::p2wpkh(&cpk, config.network);
        let wallet_script = wallet_address.script_pubkey();
        let identity = utxo_identity(&wallet_address.to_string(), config.network)?;
        info!(
            "[resolver] utxo chain {} ready, wallet {}",
            config.chain_id, wallet_address
        );
        Ok(Self {
            retry: RetryPolicy::new(&config.retry),
            config,
            esplora,
            signer,
            public_key,
            wallet_address,
            wallet_script,
            identity,
            reservations: Reservations::new(),
        })
    }

    pub fn wallet_address(&self) -> &Address {
        &self.wallet_address
    }

    async fn sign_input(&self, purpose: String, sighash: [u8; 32]) -> Result<Vec<u8>, ResolverError> {
        let context = SigningContext::new(self.config.chain_id, purpose);
        let mut sig = self.signer.sign(ChainKind::Utxo, &context, sighash).await?;
        sig.push(EcdsaSighashType::All as u8);
        Ok(sig)
    }

    /// Sign every wallet input of a funding transaction.
    async fn sign_funding(
        &self,
        tx: &mut Transaction,
        values: &[u64],
    ) -> Result<(), ResolverError> {
        let mut sighashes = Vec::with_capacity(values.len());
        {
            let mut cache = SighashCache::new(&*tx);
            for (i, value) in values.iter().enumerate() {
                let sighash = cache
                    .p2wpkh_signature_hash(
                        i,
                        &self.wallet_script,
                        Amount::from_sat(*value),
                        EcdsaSighashType::All,
                    )
                    .map_err(|e| ResolverError::Signing(e.to_string()))?;
                sighashes.push(sighash.to_byte_array());
            }
        }
        for (i, sighash) in sighashes.into_iter().enumerate() {
            let sig = self.sign_input(format!("fund_htlc/input/{}", i), sighash).await?;
            let witness = &mut tx.input[i].witness;
            witness.push(sig);
            witness.push(self.public_key);
        }
        Ok(())
    }

    /// Fetch `funding_tx` and locate the output paying the P2SH of `script`.
    async fn find_htlc_output(
        &self,
        funding_tx: &str,
        script: &Script,
    ) -> Result<(Transaction, u32, u64), ResolverError> {
        let hex_tx = self
            .retry
            .run("tx hex", || self.esplora.tx_hex(funding_tx))
            .await?;
        let funding = Self::decode_tx(&hex_tx)?;
        let htlc_spk = p2sh_script_pubkey(script);
        let (vout, value) = funding
            .output
            .iter()
            .enumerate()
            .find(|(_, o)| o.script_pubkey == htlc_spk)
            .map(|(i, o)| (i as u32, o.value.to_sat()))
            .ok_or_else(|| {
                ResolverError::InvalidScriptParameters(format!(
                    "{} does not pay the HTLC",
                    funding_tx
                ))
            })?;
        Ok((funding, vout, value))
    }

    /// Broadcast a signed transaction. The txid is fixed before sending: if
    /// the node's answer is lost, the node is asked whether it holds that
    /// txid. When even that cannot be answered the txid comes back inside
    /// `ConfirmationTimeout`, for the caller to record rather than rebuild.
    async fn submit(&self, tx: &Transaction) -> Result<String, ResolverError> {
        let txid = tx.compute_txid().to_string();
        let raw = bitcoin::consensus::serialize(tx);
        match self.esplora.broadcast(&raw).await {
            Ok(id) => Ok(id),
            Err(e) if e.is_transient() => {
                warn!("[resolver] broadcast of {} unconfirmed: {}", txid, e);
                match self
                    .retry
                    .run("tx status", || self.esplora.tx_status(&txid))
                    .await
                {
                    Ok(Some(_)) => Ok(txid),
                    Ok(None) => Err(e),
                    Err(_) => Err(ResolverError::ConfirmationTimeout {
                        tx_ref: txid,
                        waited_secs: 0,
                    }),
                }
            }
            Err(e) => Err(e),
        }
    }

    fn decode_tx(hex_str: &str) -> Result<Transaction, ResolverError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| ResolverError::Rpc(format!("transaction hex: {}", e)))?;
        bitcoin::consensus::deserialize(&bytes)
            .map_err(|e| ResolverError::Rpc(format!("transaction decode: {}", e)))
    }
}

#[async_trait]
impl ChainAdapter for UtxoAdapter {
    fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    fn kind(&self) -> ChainKind {
        ChainKind::Utxo
    }

    /// Witness v0 program of the wallet.
    fn resolver_identity(&self) -> H160 {
        self.identity
    }

    async fn resolver_public_key(&self) -> Result<[u8; 33], ResolverError> {
        Ok(self.public_key)
    }

    async fn fund_htlc(&self, script: &[u8], amount: u64) -> Result<HtlcFunding, ResolverError> {
        let script = Script::from_bytes(script);
        let address = p2sh_address(script, self.config.network)?;
        let wallet = self.wallet_address.to_string();
        let utxos = self
            .retry
            .run("address utxos", || self.esplora.address_utxos(&wallet))
            .await?;

        let selection = self
            .reservations
            .select(&utxos, amount, self.config.fee_rate_sat_vb)?;
        let mut tx = build_funding_tx(
            &selection,
            p2sh_script_pubkey(script),
            amount,
            self.wallet_script.clone(),
        );
        let values: Vec<u64> = selection.inputs.iter().map(|i| i.value).collect();
        // Reservations are released if signing or broadcast fails.
        self.sign_funding(&mut tx, &values).await?;

        let txid = match self.submit(&tx).await {
            Ok(txid) => txid,
            Err(e @ ResolverError::ConfirmationTimeout { .. }) => {
                // The inputs may already be spent.
                selection.commit();
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        selection.commit();
        info!(
            "[resolver] funded htlc {} with {} sat in {}",
            address, amount, txid
        );

        Ok(HtlcFunding {
            tx_ref: txid,
            vout: 0,
            address: address.to_string(),
            amount,
        })
    }

    async fn redeem_htlc(
        &self,
        funding_tx: &str,
        script: &[u8],
        secret: &SecureSecret,
    ) -> Result<TxReceipt, ResolverError> {
        let redeem_script = Script::from_bytes(script);
        let params = parse_claimable_script(redeem_script)?;
        if params.claimer != self.public_key {
            return Err(ResolverError::InvalidScriptParameters(
                "HTLC claim key is not the resolver's".into(),
            ));
        }

        let (funding, vout, value) = self.find_htlc_output(funding_tx, redeem_script).await?;

        // signature (<=73) + secret (33) + selector (1) + script push
        let script_sig_len = 73 + 33 + 1 + 3 + script.len() as u64;
        let mut tx = build_redeem_tx(
            OutPoint::new(funding.compute_txid(), vout),
            value,
            params.claim_lock_time,
            self.wallet_script.clone(),
            script_sig_len,
            self.config.fee_rate_sat_vb,
        )?;

        let sighash = SighashCache::new(&tx)
            .legacy_signature_hash(0, redeem_script, EcdsaSighashType::All.to_u32())
            .map_err(|e| ResolverError::Signing(e.to_string()))?
            .to_byte_array();
        let sig = self.sign_input("redeem_htlc".to_string(), sighash).await?;
        tx.input[0].script_sig =
            build_unlocking_script(&sig, UnlockPath::Claim(secret), Some(redeem_script))?;

        let txid = self.submit(&tx).await?;
        info!("[resolver] redeemed htlc output {}:{} in {}", funding_tx, vout, txid);
        Ok(TxReceipt::pending(txid))
    }

    async fn htlc_output(
        &self,
        funding_tx: &str,
        script: &[u8],
    ) -> Result<HtlcFunding, ResolverError> {
        let script = Script::from_bytes(script);
        let (funding, vout, amount) = self.find_htlc_output(funding_tx, script).await?;
        Ok(HtlcFunding {
            tx_ref: funding.compute_txid().to_string(),
            vout,
            address: p2sh_address(script, self.config.network)?.to_string(),
            amount,
        })
    }

    fn htlc_address(&self, script: &[u8]) -> Result<String, ResolverError> {
        Ok(p2sh_address(Script::from_bytes(script), self.config.network)?.to_string())
    }

    async fn wait_for_confirmation(&self, tx_ref: &str) -> Result<TxReceipt, ResolverError> {
        let started = Instant::now();
        let timeout = self.config.confirmation.timeout();
        loop {
            match self.esplora.tx_status(tx_ref).await {
                Ok(Some(status)) if status.confirmed => {
                    return Ok(TxReceipt {
                        tx_ref: tx_ref.to_string(),
                        block_number: status.block_height,
                        block_timestamp: status.block_time,
                    })
                }
                Ok(_) => debug!("[resolver] {} not confirmed yet", tx_ref),
                Err(e) if e.is_transient() => warn!("[resolver] status poll failed: {}", e),
                Err(e) => return Err(e),
            }
            if started.elapsed() >= timeout {
                return Err(ResolverError::ConfirmationTimeout {
                    tx_ref: tx_ref.to_string(),
                    waited_secs: started.elapsed().as_secs(),
                });
            }
            tokio::time::sleep(self.config.confirmation.poll_interval()).await;
        }
    }

    async fn utxos(&self, address: &str) -> Result<Vec<UtxoOutput>, ResolverError> {
        self.retry
            .run("address utxos", || self.esplora.address_utxos(address))
            .await
    }

    async fn balance(&self) -> Result<U256, ResolverError> {
        let wallet = self.wallet_address.to_string();
        let utxos = self.utxos(&wallet).await?;
        Ok(U256::from(utxos.iter().map(|u| u.value).sum::<u64>()))
    }

    async fn broadcast_raw(&self, raw: &[u8]) -> Result<String, ResolverError> {
        self.esplora.broadcast(raw).await
    }
}
