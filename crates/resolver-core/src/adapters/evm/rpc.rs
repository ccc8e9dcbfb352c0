//! Minimal Ethereum JSON-RPC client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use primitive_types::{H160, H256, U256};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::domain::{HexBytes, ResolverError};

#[derive(Serialize)]
struct JsonRpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorBody {
    code: i64,
    message: String,
}

/// Transaction receipt, as much of it as the resolver reads.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    pub transaction_hash: H256,
    #[serde(default)]
    pub block_number: Option<U256>,
    #[serde(default)]
    pub status: Option<U256>,
    #[serde(default)]
    pub logs: Vec<RpcLog>,
}

impl RpcReceipt {
    /// Post-Byzantium status; absent status is treated as success.
    pub fn succeeded(&self) -> bool {
        self.status.map(|s| !s.is_zero()).unwrap_or(true)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RpcLog {
    pub address: H160,
    pub topics: Vec<H256>,
    pub data: HexBytes,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RpcBlock {
    pub number: U256,
    pub timestamp: U256,
}

/// JSON-RPC over HTTP.
pub struct JsonRpcClient {
    client: reqwest::Client,
    url: String,
    request_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ResolverError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ResolverError::Rpc(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            request_id: AtomicU64::new(1),
        })
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Call a method. A `null` result deserializes into `Option::None`.
    pub async fn call<P, R>(&self, method: &str, params: P) -> Result<R, ResolverError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id(),
            method,
            params,
        };
        debug!("[resolver] rpc -> {} {}", self.url, method);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ResolverError::Rpc(format!("{}: {}", method, e)))?;
        if response.status().is_server_error() {
            return Err(ResolverError::Rpc(format!(
                "{}: HTTP {}",
                method,
                response.status()
            )));
        }
        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| ResolverError::Rpc(format!("{}: bad response: {}", method, e)))?;

        if let Some(error) = body.error {
            return Err(classify_error(method, error.code, &error.message));
        }
        serde_json::from_value(body.result.unwrap_or(Value::Null))
            .map_err(|e| ResolverError::Rpc(format!("{}: bad result: {}", method, e)))
    }

    pub async fn chain_id(&self) -> Result<u64, ResolverError> {
        let id: U256 = self.call("eth_chainId", Vec::<Value>::new()).await?;
        Ok(id.low_u64())
    }

    pub async fn pending_nonce(&self, address: H160) -> Result<U256, ResolverError> {
        self.call("eth_getTransactionCount", (address, "pending")).await
    }

    pub async fn gas_price(&self) -> Result<U256, ResolverError> {
        self.call("eth_gasPrice", Vec::<Value>::new()).await
    }

    pub async fn balance(&self, address: H160) -> Result<U256, ResolverError> {
        self.call("eth_getBalance", (address, "latest")).await
    }

    pub async fn send_raw_transaction(&self, raw: &[u8]) -> Result<H256, ResolverError> {
        self.call(
            "eth_sendRawTransaction",
            [format!("0x{}", hex::encode(raw))],
        )
        .await
    }

    pub async fn receipt(&self, tx: H256) -> Result<Option<RpcReceipt>, ResolverError> {
        self.call("eth_getTransactionReceipt", [tx]).await
    }

    pub async fn block(&self, number: u64) -> Result<Option<RpcBlock>, ResolverError> {
        self.call("eth_getBlockByNumber", (format!("{:#x}", number), false))
            .await
    }
}

/// Map a node error body onto the resolver taxonomy.
fn classify_error(method: &str, code: i64, message: &str) -> ResolverError {
    let lower = message.to_lowercase();
    if lower.contains("insufficient funds") {
        ResolverError::InsufficientFunds {
            required: "gas * price + value".into(),
            available: message.to_string(),
        }
    } else if lower.contains("revert") {
        ResolverError::RevertedExecution(message.to_string())
    } else if method == "eth_sendRawTransaction" {
        ResolverError::BroadcastRejected(format!("{} ({})", message, code))
    } else {
        ResolverError::Rpc(format!("{}: {} ({})", method, message, code))
    }
}
