//! Signing capability adapters.
//!
//! `LocalSigner` keeps one secp256k1 key per ledger family in process;
//! `RemoteSigner` delegates to an HTTP signing service.

use std::time::Duration;

use async_trait::async_trait;
use k256::ecdsa::{signature::hazmat::PrehashSigner, Signature, SigningKey};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroize;

use crate::domain::{ChainKind, ResolverError};
use crate::ports::outbound::{SigningContext, TransactionSigner};

/// In-process signer.
///
/// `SigningKey` zeroizes its scalar on drop.
pub struct LocalSigner {
    evm: Option<SigningKey>,
    utxo: Option<SigningKey>,
}

impl LocalSigner {
    /// Build from raw 32-byte secret keys.
    pub fn new(evm: Option<[u8; 32]>, utxo: Option<[u8; 32]>) -> Result<Self, ResolverError> {
        Ok(Self {
            evm: evm.map(|k| parse_key(&k)).transpose()?,
            utxo: utxo.map(|k| parse_key(&k)).transpose()?,
        })
    }

    /// Build from hex strings (with or without `0x`).
    pub fn from_hex(evm: Option<&str>, utxo: Option<&str>) -> Result<Self, ResolverError> {
        Ok(Self {
            evm: evm.map(parse_hex_key).transpose()?,
            utxo: utxo.map(parse_hex_key).transpose()?,
        })
    }

    fn key(&self, kind: ChainKind) -> Result<&SigningKey, ResolverError> {
        match kind {
            ChainKind::Evm => self.evm.as_ref(),
            ChainKind::Utxo => self.utxo.as_ref(),
        }
        .ok_or_else(|| ResolverError::Signing(format!("no {} key configured", kind)))
    }
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("evm", &self.evm.is_some())
            .field("utxo", &self.utxo.is_some())
            .finish()
    }
}

fn parse_key(bytes: &[u8]) -> Result<SigningKey, ResolverError> {
    SigningKey::from_slice(bytes).map_err(|_| ResolverError::Signing("invalid secret key".into()))
}

fn parse_hex_key(s: &str) -> Result<SigningKey, ResolverError> {
    let mut bytes = hex::decode(s.trim().strip_prefix("0x").unwrap_or(s.trim()))
        .map_err(|_| ResolverError::Signing("secret key is not hex".into()))?;
    let key = parse_key(&bytes);
    bytes.zeroize();
    key
}

fn compressed(key: &SigningKey) -> [u8; 33] {
    let point = key.verifying_key().to_encoded_point(true);
    let mut out = [0u8; 33];
    out.copy_from_slice(point.as_bytes());
    out
}

#[async_trait]
impl TransactionSigner for LocalSigner {
    async fn sign(
        &self,
        kind: ChainKind,
        context: &SigningContext,
        payload_hash: [u8; 32],
    ) -> Result<Vec<u8>, ResolverError> {
        let key = self.key(kind)?;
        debug!("[resolver] local sign {} for {}", kind, context.purpose);
        match kind {
            ChainKind::Evm => {
                let (sig, recid) = key
                    .sign_prehash_recoverable(&payload_hash)
                    .map_err(|e| ResolverError::Signing(e.to_string()))?;
                let mut out = sig.to_bytes().to_vec();
                out.push(recid.to_byte());
                Ok(out)
            }
            ChainKind::Utxo => {
                let sig: Signature = key
                    .sign_prehash(&payload_hash)
                    .map_err(|e| ResolverError::Signing(e.to_string()))?;
                // Script validation requires low-s.
                let sig = sig.normalize_s().unwrap_or(sig);
                Ok(sig.to_der().as_bytes().to_vec())
            }
        }
    }

    async fn public_key(&self, kind: ChainKind) -> Result<[u8; 33], ResolverError> {
        Ok(compressed(self.key(kind)?))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest<'a> {
    kind: ChainKind,
    context: &'a SigningContext,
    payload_hash: String,
}

#[derive(Deserialize)]
struct SignResponse {
    signature: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeyResponse {
    public_key: String,
}

/// HTTP signing service client.
///
/// `POST {base}/sign` with `{kind, context, payloadHash}` and
/// `GET {base}/public-key/{kind}`.
pub struct RemoteSigner {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteSigner {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ResolverError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResolverError::Signing(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, ResolverError> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s))
        .map_err(|e| ResolverError::Signing(format!("signer returned bad hex: {}", e)))
}

#[async_trait]
impl TransactionSigner for RemoteSigner {
    async fn sign(
        &self,
        kind: ChainKind,
        context: &SigningContext,
        payload_hash: [u8; 32],
    ) -> Result<Vec<u8>, ResolverError> {
        let request = SignRequest {
            kind,
            context,
            payload_hash: format!("0x{}", hex::encode(payload_hash)),
        };
        let response = self
            .client
            .post(format!("{}/sign", self.base_url))
            .json(&request)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ResolverError::Signing(e.to_string()))?;
        let body: SignResponse = response
            .json()
            .await
            .map_err(|e| ResolverError::Signing(e.to_string()))?;
        decode_hex(&body.signature)
    }

    async fn public_key(&self, kind: ChainKind) -> Result<[u8; 33], ResolverError> {
        let response = self
            .client
            .get(format!("{}/public-key/{}", self.base_url, kind))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ResolverError::Signing(e.to_string()))?;
        let body: PublicKeyResponse = response
            .json()
            .await
            .map_err(|e| ResolverError::Signing(e.to_string()))?;
        decode_hex(&body.public_key)?
            .try_into()
            .map_err(|_| ResolverError::Signing("public key must be 33 bytes".into()))
    }
}
