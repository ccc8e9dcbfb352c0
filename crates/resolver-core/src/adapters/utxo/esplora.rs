//! Esplora-style REST client.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::domain::ResolverError;
use crate::ports::outbound::UtxoOutput;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TxStatus {
    pub confirmed: bool,
    #[serde(default)]
    pub block_height: Option<u64>,
    #[serde(default)]
    pub block_time: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct EsploraUtxo {
    txid: String,
    vout: u32,
    value: u64,
    #[serde(default)]
    status: TxStatus,
}

#[derive(Debug, Deserialize)]
struct EsploraTx {
    #[serde(default)]
    status: TxStatus,
}

/// REST client for `/address/{a}/utxo`, `/tx`, `/tx/{id}` and `/tx/{id}/hex`.
pub struct EsploraClient {
    client: reqwest::Client,
    base_url: String,
}

fn transport(what: &str, e: reqwest::Error) -> ResolverError {
    ResolverError::Rpc(format!("{}: {}", what, e))
}

impl EsploraClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ResolverError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ResolverError::Rpc(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str) -> Result<Option<reqwest::Response>, ResolverError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("[resolver] esplora GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport(path, e))?;
        match response.status() {
            s if s == reqwest::StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(response)),
            s => Err(ResolverError::Rpc(format!("GET {}: HTTP {}", path, s))),
        }
    }

    /// Unspent outputs of an address, mempool included.
    pub async fn address_utxos(&self, address: &str) -> Result<Vec<UtxoOutput>, ResolverError> {
        let path = format!("/address/{}/utxo", address);
        let Some(response) = self.get(&path).await? else {
            return Ok(Vec::new());
        };
        let utxos: Vec<EsploraUtxo> = response.json().await.map_err(|e| transport(&path, e))?;
        Ok(utxos
            .into_iter()
            .map(|u| UtxoOutput {
                txid: u.txid,
                vout: u.vout,
                value: u.value,
                confirmed: u.status.confirmed,
            })
            .collect())
    }

    /// Confirmation status; `None` if the node does not know the transaction.
    pub async fn tx_status(&self, txid: &str) -> Result<Option<TxStatus>, ResolverError> {
        let path = format!("/tx/{}", txid);
        let Some(response) = self.get(&path).await? else {
            return Ok(None);
        };
        let tx: EsploraTx = response.json().await.map_err(|e| transport(&path, e))?;
        Ok(Some(tx.status))
    }

    /// Raw transaction hex.
    pub async fn tx_hex(&self, txid: &str) -> Result<String, ResolverError> {
        let path = format!("/tx/{}/hex", txid);
        let response = self
            .get(&path)
            .await?
            .ok_or_else(|| ResolverError::Validation(format!("transaction {} not found", txid)))?;
        let body = response.text().await.map_err(|e| transport(&path, e))?;
        Ok(body.trim().to_string())
    }

    /// Submit a raw transaction; returns the txid.
    pub async fn broadcast(&self, raw: &[u8]) -> Result<String, ResolverError> {
        let url = format!("{}/tx", self.base_url);
        let response = self
            .client
            .post(&url)
            .body(hex::encode(raw))
            .send()
            .await
            .map_err(|e| transport("/tx", e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| transport("/tx", e))?;
        if status.is_server_error() {
            return Err(ResolverError::Rpc(format!("POST /tx: HTTP {}: {}", status, body)));
        }
        if !status.is_success() {
            return Err(ResolverError::BroadcastRejected(body.trim().to_string()));
        }
        Ok(body.trim().to_string())
    }
}
