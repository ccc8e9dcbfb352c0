//! # Chain Identities
//!
//! Conversions between chain-native address strings and the 20-byte words
//! carried in immutables.

use std::str::FromStr;

use bitcoin::{Address, Network};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use primitive_types::H160;
use sha3::{Digest, Keccak256};

use crate::domain::ResolverError;

/// Parse a `0x`-prefixed 20-byte hex address.
pub fn parse_evm_address(s: &str) -> Result<H160, ResolverError> {
    let hex_part = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(hex_part)
        .map_err(|e| ResolverError::Validation(format!("address {}: {}", s, e)))?;
    if bytes.len() != 20 {
        return Err(ResolverError::Validation(format!(
            "address {} is {} bytes, expected 20",
            s,
            bytes.len()
        )));
    }
    Ok(H160::from_slice(&bytes))
}

/// Lowercase `0x` form.
pub fn format_evm_address(address: H160) -> String {
    format!("{:#x}", address)
}

/// Account address of a compressed secp256k1 key.
pub fn evm_address_from_public_key(compressed: &[u8]) -> Result<H160, ResolverError> {
    let key = k256::PublicKey::from_sec1_bytes(compressed)
        .map_err(|_| ResolverError::Signing("invalid public key".into()))?;
    let uncompressed = key.to_encoded_point(false);
    let hash = Keccak256::digest(&uncompressed.as_bytes()[1..]);
    Ok(H160::from_slice(&hash[12..]))
}

/// Parse a UTXO address and check it belongs to `network`.
pub fn parse_utxo_address(s: &str, network: Network) -> Result<Address, ResolverError> {
    Address::from_str(s)
        .map_err(|e| ResolverError::Validation(format!("address {}: {}", s, e)))?
        .require_network(network)
        .map_err(|e| ResolverError::Validation(format!("address {}: {}", s, e)))
}

/// 20-byte identity word of a UTXO address.
///
/// Only witness v0 key-hash addresses carry a 20-byte program; every other
/// address type is rejected.
pub fn utxo_identity(s: &str, network: Network) -> Result<H160, ResolverError> {
    let address = parse_utxo_address(s, network)?;
    let script = address.script_pubkey();
    if !script.is_p2wpkh() {
        return Err(ResolverError::Validation(format!(
            "address {} is not a witness v0 key-hash address",
            s
        )));
    }
    // OP_0 <20-byte push>
    Ok(H160::from_slice(&script.as_bytes()[2..22]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash as _;

    #[test]
    fn test_evm_address_roundtrip() {
        let s = "0x00000000000000000000000000000000deadbeef";
        let addr = parse_evm_address(s).unwrap();
        assert_eq!(format_evm_address(addr), s);
        assert!(parse_evm_address("0x1234").is_err());
    }

    #[test]
    fn test_evm_address_from_generator_key() {
        // Private key 1.
        let sk = k256::ecdsa::SigningKey::from_slice(&{
            let mut k = [0u8; 32];
            k[31] = 1;
            k
        })
        .unwrap();
        let compressed = sk.verifying_key().to_encoded_point(true);
        let addr = evm_address_from_public_key(compressed.as_bytes()).unwrap();
        assert_eq!(
            format_evm_address(addr),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn test_utxo_identity_accepts_p2wpkh_only() {
        let sk = k256::ecdsa::SigningKey::from_slice(&[5u8; 32]).unwrap();
        let point = sk.verifying_key().to_encoded_point(true);
        let cpk = bitcoin::CompressedPublicKey::from_slice(point.as_bytes()).unwrap();

        let p2wpkh = Address::p2wpkh(&cpk, Network::Regtest).to_string();
        let id = utxo_identity(&p2wpkh, Network::Regtest).unwrap();
        assert_eq!(id.as_bytes(), cpk.wpubkey_hash().as_byte_array());

        let script = bitcoin::ScriptBuf::from_bytes(vec![0x51]);
        let p2wsh = Address::p2wsh(&script, Network::Regtest).to_string();
        assert!(matches!(
            utxo_identity(&p2wsh, Network::Regtest),
            Err(ResolverError::Validation(_))
        ));
    }

    #[test]
    fn test_utxo_address_wrong_network() {
        let mainnet = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
        assert!(parse_utxo_address(mainnet, Network::Regtest).is_err());
    }
}
