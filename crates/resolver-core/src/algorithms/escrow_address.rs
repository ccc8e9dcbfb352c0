//! # Escrow Address Calculator
//!
//! Escrows are CREATE2 clones whose salt is the hash of their immutables,
//! so both parties can compute the address before the escrow exists.

use primitive_types::{H160, H256};
use sha3::{Digest, Keccak256};

use super::abi::encode_immutables;
use crate::domain::Immutables;

/// `keccak256(abi.encode(immutables))`.
pub fn immutables_hash(immutables: &Immutables) -> H256 {
    H256::from_slice(&Keccak256::digest(encode_immutables(immutables)))
}

/// `keccak256(0xff ++ factory ++ salt ++ codeHash)[12..]`.
pub fn create2_address(factory: H160, salt: H256, code_hash: H256) -> H160 {
    let mut data = Vec::with_capacity(85);
    data.push(0xff);
    data.extend_from_slice(factory.as_bytes());
    data.extend_from_slice(salt.as_bytes());
    data.extend_from_slice(code_hash.as_bytes());

    let hash = Keccak256::digest(&data);
    H160::from_slice(&hash[12..32])
}

/// Address of the escrow holding `immutables`, deployed by `factory` from
/// an implementation proxy whose init-code hash is `code_hash`.
pub fn compute_escrow_address(factory: H160, immutables: &Immutables, code_hash: H256) -> H160 {
    create2_address(factory, immutables_hash(immutables), code_hash)
}
