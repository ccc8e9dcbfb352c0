//! Legacy (EIP-155) transaction encoding.

use primitive_types::{H160, H256, U256};
use rlp::RlpStream;
use sha3::{Digest, Keccak256};

use crate::domain::ResolverError;

/// An unsigned legacy transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: U256,
    pub gas_price: U256,
    pub gas: U256,
    pub to: H160,
    pub value: U256,
    pub data: Vec<u8>,
}

impl LegacyTransaction {
    fn append_body(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&self.gas_price);
        stream.append(&self.gas);
        stream.append(&self.to);
        stream.append(&self.value);
        stream.append(&self.data);
    }

    /// RLP payload that is hashed for signing.
    pub fn signing_payload(&self, chain_id: u64) -> Vec<u8> {
        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream);
        stream.append(&chain_id);
        stream.append(&0u8);
        stream.append(&0u8);
        stream.out().to_vec()
    }

    /// keccak-256 of [`Self::signing_payload`].
    pub fn signing_hash(&self, chain_id: u64) -> [u8; 32] {
        Keccak256::digest(self.signing_payload(chain_id)).into()
    }

    /// Raw signed transaction from a 65-byte `r || s || recovery_id`.
    pub fn encode_signed(&self, chain_id: u64, signature: &[u8]) -> Result<Vec<u8>, ResolverError> {
        if signature.len() != 65 || signature[64] > 1 {
            return Err(ResolverError::Signing(format!(
                "expected 65-byte recoverable signature, got {} bytes",
                signature.len()
            )));
        }
        let r = U256::from_big_endian(&signature[..32]);
        let s = U256::from_big_endian(&signature[32..64]);
        let v = u64::from(signature[64]) + 35 + 2 * chain_id;

        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream);
        stream.append(&v);
        stream.append(&r);
        stream.append(&s);
        Ok(stream.out().to_vec())
    }
}

/// Transaction hash of a raw signed transaction.
pub fn transaction_hash(raw: &[u8]) -> H256 {
    H256::from_slice(&Keccak256::digest(raw))
}
