//! Ledger adapter decorator recording Prometheus metrics per call.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use primitive_types::{H160, U256};
use resolver_core::domain::{
    ChainKind, FillAuthorization, Immutables, Leg, ResolverError, SecureSecret, TxReceipt,
};
use resolver_core::ports::{ChainAdapter, HtlcFunding, SrcDeployment, UtxoOutput};
use resolver_telemetry::{HistogramTimer, CONFIRMATION_WAIT, LEDGER_CALLS, LEDGER_CALL_DURATION};

/// Wraps a [`ChainAdapter`], counting calls by chain, operation and outcome.
pub struct MeteredAdapter {
    inner: Arc<dyn ChainAdapter>,
    chain: String,
}

impl MeteredAdapter {
    pub fn wrap(inner: Arc<dyn ChainAdapter>) -> Arc<dyn ChainAdapter> {
        let chain = inner.chain_id().to_string();
        Arc::new(Self { inner, chain })
    }

    async fn observe<T, F>(&self, operation: &str, call: F) -> Result<T, ResolverError>
    where
        F: Future<Output = Result<T, ResolverError>>,
    {
        let timer = LEDGER_CALL_DURATION
            .with_label_values(&[self.chain.as_str(), operation])
            .start_timer();
        let result = call.await;
        timer.observe_duration();
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        LEDGER_CALLS
            .with_label_values(&[self.chain.as_str(), operation, outcome])
            .inc();
        result
    }
}

#[async_trait]
impl ChainAdapter for MeteredAdapter {
    fn chain_id(&self) -> u64 {
        self.inner.chain_id()
    }

    fn kind(&self) -> ChainKind {
        self.inner.kind()
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }

    fn resolver_identity(&self) -> H160 {
        self.inner.resolver_identity()
    }

    async fn resolver_public_key(&self) -> Result<[u8; 33], ResolverError> {
        self.observe("resolver_public_key", self.inner.resolver_public_key())
            .await
    }

    async fn deploy_src_escrow(
        &self,
        immutables: &Immutables,
        fill: &FillAuthorization,
    ) -> Result<String, ResolverError> {
        self.observe(
            "deploy_src_escrow",
            self.inner.deploy_src_escrow(immutables, fill),
        )
        .await
    }

    async fn src_deployment(&self, tx_ref: &str) -> Result<SrcDeployment, ResolverError> {
        let _wait = HistogramTimer::new(&CONFIRMATION_WAIT);
        self.observe("src_deployment", self.inner.src_deployment(tx_ref))
            .await
    }

    async fn deploy_dst_escrow(
        &self,
        immutables: &Immutables,
        src_cancellation_timestamp: u64,
    ) -> Result<String, ResolverError> {
        self.observe(
            "deploy_dst_escrow",
            self.inner
                .deploy_dst_escrow(immutables, src_cancellation_timestamp),
        )
        .await
    }

    async fn withdraw(
        &self,
        leg: Leg,
        escrow: H160,
        secret: &SecureSecret,
        immutables: &Immutables,
    ) -> Result<String, ResolverError> {
        self.observe(
            "withdraw",
            self.inner.withdraw(leg, escrow, secret, immutables),
        )
        .await
    }

    async fn fund_htlc(&self, script: &[u8], amount: u64) -> Result<HtlcFunding, ResolverError> {
        self.observe("fund_htlc", self.inner.fund_htlc(script, amount))
            .await
    }

    async fn redeem_htlc(
        &self,
        funding_tx: &str,
        script: &[u8],
        secret: &SecureSecret,
    ) -> Result<TxReceipt, ResolverError> {
        self.observe(
            "redeem_htlc",
            self.inner.redeem_htlc(funding_tx, script, secret),
        )
        .await
    }

    async fn htlc_output(
        &self,
        funding_tx: &str,
        script: &[u8],
    ) -> Result<HtlcFunding, ResolverError> {
        self.observe("htlc_output", self.inner.htlc_output(funding_tx, script))
            .await
    }

    fn htlc_address(&self, script: &[u8]) -> Result<String, ResolverError> {
        self.inner.htlc_address(script)
    }

    async fn wait_for_confirmation(&self, tx_ref: &str) -> Result<TxReceipt, ResolverError> {
        let _wait = HistogramTimer::new(&CONFIRMATION_WAIT);
        self.observe(
            "wait_for_confirmation",
            self.inner.wait_for_confirmation(tx_ref),
        )
        .await
    }

    async fn utxos(&self, address: &str) -> Result<Vec<UtxoOutput>, ResolverError> {
        self.observe("utxos", self.inner.utxos(address)).await
    }

    async fn balance(&self) -> Result<U256, ResolverError> {
        self.observe("balance", self.inner.balance()).await
    }

    async fn broadcast_raw(&self, raw: &[u8]) -> Result<String, ResolverError> {
        self.observe("broadcast_raw", self.inner.broadcast_raw(raw))
            .await
    }

    fn predict_escrow_address(
        &self,
        immutables: &Immutables,
        leg: Leg,
    ) -> Result<H160, ResolverError> {
        self.inner.predict_escrow_address(immutables, leg)
    }
}
