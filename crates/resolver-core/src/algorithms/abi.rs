//! # ABI Word Codec
//!
//! The handful of static ABI encodings the resolver needs: the immutables
//! tuple, resolver-contract calldata and the factory's `SrcEscrowCreated`
//! event. Every value is one 32-byte word; `bytes` is the only dynamic type.

use primitive_types::{H160, H256, U256};
use sha3::{Digest, Keccak256};

use crate::domain::{
    DstImmutablesComplement, FillAuthorization, Immutables, LimitOrder, ResolverError,
};

/// One ABI word.
pub type Word = [u8; 32];

const IMMUTABLES_TUPLE: &str =
    "(bytes32,bytes32,uint256,uint256,uint256,uint256,uint256,uint256)";
const ORDER_TUPLE: &str = "(uint256,uint256,uint256,uint256,uint256,uint256,uint256,uint256)";
const COMPLEMENT_TUPLE: &str = "(uint256,uint256,uint256,uint256,uint256)";

/// First four bytes of keccak-256 of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// keccak-256 of an event signature (topic 0).
pub fn event_topic(signature: &str) -> H256 {
    H256::from_slice(&Keccak256::digest(signature.as_bytes()))
}

/// `deploySrc(immutables, order, r, vs, amount, takerTraits, args)`.
pub fn deploy_src_signature() -> String {
    format!(
        "deploySrc({},{},bytes32,bytes32,uint256,uint256,bytes)",
        IMMUTABLES_TUPLE, ORDER_TUPLE
    )
}

/// `deployDst(dstImmutables, srcCancellationTimestamp)`.
pub fn deploy_dst_signature() -> String {
    format!("deployDst({},uint256)", IMMUTABLES_TUPLE)
}

/// `withdraw(escrow, secret, immutables)`.
pub fn withdraw_signature() -> String {
    format!("withdraw(address,bytes32,{})", IMMUTABLES_TUPLE)
}

/// `SrcEscrowCreated(srcImmutables, dstImmutablesComplement)`.
pub fn src_escrow_created_signature() -> String {
    format!("SrcEscrowCreated({},{})", IMMUTABLES_TUPLE, COMPLEMENT_TUPLE)
}

pub fn word_u256(value: U256) -> Word {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

pub fn word_address(address: H160) -> Word {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

pub fn word_u64(value: u64) -> Word {
    word_u256(U256::from(value))
}

fn read_u256(word: &[u8]) -> U256 {
    U256::from_big_endian(word)
}

fn read_address(word: &[u8]) -> H160 {
    H160::from_slice(&word[12..32])
}

/// The eight immutables words, in declaration order.
pub fn immutables_words(im: &Immutables) -> [Word; 8] {
    [
        im.order_hash.to_fixed_bytes(),
        im.hash_lock.to_fixed_bytes(),
        word_address(im.maker),
        word_address(im.taker),
        word_address(im.token),
        word_u256(im.amount),
        word_u256(im.safety_deposit),
        word_u256(im.timelocks),
    ]
}

/// `abi.encode(immutables)`: 256 bytes.
pub fn encode_immutables(im: &Immutables) -> Vec<u8> {
    immutables_words(im).concat()
}

fn order_words(order: &LimitOrder) -> [Word; 8] {
    [
        word_u256(order.salt),
        word_address(order.maker),
        word_address(order.receiver),
        word_address(order.maker_asset),
        word_address(order.taker_asset),
        word_u256(order.making_amount),
        word_u256(order.taking_amount),
        word_u256(order.maker_traits),
    ]
}

/// Calldata for `deploySrc`.
pub fn encode_deploy_src(im: &Immutables, fill: &FillAuthorization) -> Vec<u8> {
    let mut head: Vec<Word> = Vec::with_capacity(21);
    head.extend(immutables_words(im));
    head.extend(order_words(&fill.order));
    head.push(fill.r.to_fixed_bytes());
    head.push(fill.vs.to_fixed_bytes());
    head.push(word_u256(fill.fill_amount));
    head.push(word_u256(fill.taker_traits));
    // Offset of `args`, measured from the start of the arguments.
    head.push(word_u64(21 * 32));

    let mut out = selector(&deploy_src_signature()).to_vec();
    for word in &head {
        out.extend_from_slice(word);
    }
    out.extend(encode_bytes_tail(fill.args.as_slice()));
    out
}

/// Calldata for `deployDst`.
pub fn encode_deploy_dst(im: &Immutables, src_cancellation_timestamp: u64) -> Vec<u8> {
    let mut out = selector(&deploy_dst_signature()).to_vec();
    out.extend(encode_immutables(im));
    out.extend_from_slice(&word_u64(src_cancellation_timestamp));
    out
}

/// Calldata for `withdraw`.
pub fn encode_withdraw(escrow: H160, secret: &[u8; 32], im: &Immutables) -> Vec<u8> {
    let mut out = selector(&withdraw_signature()).to_vec();
    out.extend_from_slice(&word_address(escrow));
    out.extend_from_slice(secret);
    out.extend(encode_immutables(im));
    out
}

fn encode_bytes_tail(data: &[u8]) -> Vec<u8> {
    let mut out = word_u64(data.len() as u64).to_vec();
    out.extend_from_slice(data);
    let pad = (32 - data.len() % 32) % 32;
    out.extend(std::iter::repeat(0u8).take(pad));
    out
}

/// Decode the eight immutables words.
pub fn decode_immutables(data: &[u8]) -> Result<Immutables, ResolverError> {
    if data.len() < 8 * 32 {
        return Err(ResolverError::Validation(format!(
            "immutables need 256 bytes, got {}",
            data.len()
        )));
    }
    let w = |i: usize| &data[i * 32..(i + 1) * 32];
    Ok(Immutables {
        order_hash: H256::from_slice(w(0)),
        hash_lock: H256::from_slice(w(1)),
        maker: read_address(w(2)),
        taker: read_address(w(3)),
        token: read_address(w(4)),
        amount: read_u256(w(5)),
        safety_deposit: read_u256(w(6)),
        timelocks: read_u256(w(7)),
    })
}

/// Decode the data of a `SrcEscrowCreated` log: 8 immutables words followed
/// by 5 complement words.
pub fn decode_src_escrow_created(
    data: &[u8],
) -> Result<(Immutables, DstImmutablesComplement), ResolverError> {
    if data.len() != 13 * 32 {
        return Err(ResolverError::Validation(format!(
            "SrcEscrowCreated data must be 416 bytes, got {}",
            data.len()
        )));
    }
    let immutables = decode_immutables(&data[..256])?;
    let complement = decode_complement(&data[256..])?;
    Ok((immutables, complement))
}

/// The five complement words.
pub fn encode_complement(c: &DstImmutablesComplement) -> Vec<u8> {
    [
        word_address(c.maker),
        word_u256(c.amount),
        word_address(c.token),
        word_u256(c.safety_deposit),
        word_u256(c.chain_id),
    ]
    .concat()
}

/// Decode the five complement words.
pub fn decode_complement(data: &[u8]) -> Result<DstImmutablesComplement, ResolverError> {
    if data.len() < 5 * 32 {
        return Err(ResolverError::Validation(format!(
            "complement needs 160 bytes, got {}",
            data.len()
        )));
    }
    let w = |i: usize| &data[i * 32..(i + 1) * 32];
    Ok(DstImmutablesComplement {
        maker: read_address(w(0)),
        amount: read_u256(w(1)),
        token: read_address(w(2)),
        safety_deposit: read_u256(w(3)),
        chain_id: read_u256(w(4)),
    })
}

/// Encode a `SrcEscrowCreated` payload. Inverse of
/// [`decode_src_escrow_created`]; used by ledgers that emit the event.
pub fn encode_src_escrow_created(im: &Immutables, c: &DstImmutablesComplement) -> Vec<u8> {
    let mut out = encode_immutables(im);
    out.extend(encode_complement(c));
    out
}
