//! # HTLC Script Builder
//!
//! Two-branch locking script for the UTXO leg:
//!
//! ```text
//! <orderHash> OP_DROP
//! <claimLockTime> OP_CHECKLOCKTIMEVERIFY OP_DROP
//! OP_IF
//!     OP_SHA256 <hashLock> OP_EQUALVERIFY <claimer> OP_CHECKSIG
//! OP_ELSE
//!     <refundLockTime> OP_CHECKLOCKTIMEVERIFY OP_DROP <refunder> OP_CHECKSIG
//! OP_ENDIF
//! ```
//!
//! The order hash prefix binds the script (and therefore its P2SH address)
//! to exactly one order.

use bitcoin::opcodes::all::{
    OP_CHECKSIG, OP_CLTV, OP_DROP, OP_ELSE, OP_ENDIF, OP_EQUALVERIFY, OP_IF, OP_PUSHNUM_1,
    OP_PUSHNUM_16, OP_SHA256,
};
use bitcoin::opcodes::{Opcode, OP_FALSE, OP_TRUE};
use bitcoin::script::{Builder, Instruction, PushBytesBuf};
use bitcoin::{Address, Network, Script, ScriptBuf};

use crate::domain::{Hash, ResolverError, SecureSecret};

/// Inputs of a claimable script. Recoverable from the script bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HtlcParams {
    pub order_hash: Hash,
    /// sha-256 of the secret.
    pub hash_lock: Hash,
    pub claim_lock_time: u32,
    pub refund_lock_time: u32,
    /// Compressed key allowed to spend with the secret.
    pub claimer: [u8; 33],
    /// Compressed key allowed to spend after the refund lock time.
    pub refunder: [u8; 33],
}

/// Which branch a spend takes.
#[derive(Clone, Copy, Debug)]
pub enum UnlockPath<'a> {
    /// Spend with the preimage.
    Claim(&'a SecureSecret),
    /// Spend after the refund lock time.
    Refund,
}

/// Build the locking script.
pub fn build_claimable_script(params: &HtlcParams) -> Result<ScriptBuf, ResolverError> {
    validate_params(params)?;

    Ok(Builder::new()
        .push_slice(params.order_hash.to_fixed_bytes())
        .push_opcode(OP_DROP)
        .push_int(i64::from(params.claim_lock_time))
        .push_opcode(OP_CLTV)
        .push_opcode(OP_DROP)
        .push_opcode(OP_IF)
        .push_opcode(OP_SHA256)
        .push_slice(params.hash_lock.to_fixed_bytes())
        .push_opcode(OP_EQUALVERIFY)
        .push_slice(params.claimer)
        .push_opcode(OP_CHECKSIG)
        .push_opcode(OP_ELSE)
        .push_int(i64::from(params.refund_lock_time))
        .push_opcode(OP_CLTV)
        .push_opcode(OP_DROP)
        .push_slice(params.refunder)
        .push_opcode(OP_CHECKSIG)
        .push_opcode(OP_ENDIF)
        .into_script())
}

/// Build the script-sig for a spend.
///
/// `signature` is DER with the sighash byte appended. For P2SH spends pass
/// the locking script as `redeem_script`; it is pushed last.
pub fn build_unlocking_script(
    signature: &[u8],
    path: UnlockPath<'_>,
    redeem_script: Option<&Script>,
) -> Result<ScriptBuf, ResolverError> {
    let mut builder = Builder::new().push_slice(push_bytes(signature.to_vec())?);
    builder = match path {
        UnlockPath::Claim(secret) => builder
            .push_slice(*secret.as_bytes())
            .push_opcode(OP_TRUE),
        UnlockPath::Refund => builder.push_opcode(OP_FALSE),
    };
    if let Some(redeem) = redeem_script {
        builder = builder.push_slice(push_bytes(redeem.to_bytes())?);
    }
    Ok(builder.into_script())
}

/// Recover the inputs of a script produced by [`build_claimable_script`].
///
/// Anything that deviates from the template is rejected.
pub fn parse_claimable_script(script: &Script) -> Result<HtlcParams, ResolverError> {
    let mut items = Vec::new();
    for instruction in script.instructions() {
        let instruction = instruction
            .map_err(|e| ResolverError::InvalidScriptParameters(format!("malformed script: {}", e)))?;
        items.push(instruction);
    }
    if items.len() != 18 {
        return Err(not_template(format!("expected 18 items, found {}", items.len())));
    }

    let order_hash = Hash::from(fixed::<32>(&items[0], "order hash")?);
    expect_op(&items[1], OP_DROP)?;
    let claim_lock_time = script_num(&items[2], "claim lock time")?;
    expect_op(&items[3], OP_CLTV)?;
    expect_op(&items[4], OP_DROP)?;
    expect_op(&items[5], OP_IF)?;
    expect_op(&items[6], OP_SHA256)?;
    let hash_lock = Hash::from(fixed::<32>(&items[7], "hash lock")?);
    expect_op(&items[8], OP_EQUALVERIFY)?;
    let claimer = fixed::<33>(&items[9], "claimer key")?;
    expect_op(&items[10], OP_CHECKSIG)?;
    expect_op(&items[11], OP_ELSE)?;
    let refund_lock_time = script_num(&items[12], "refund lock time")?;
    expect_op(&items[13], OP_CLTV)?;
    expect_op(&items[14], OP_DROP)?;
    let refunder = fixed::<33>(&items[15], "refunder key")?;
    expect_op(&items[16], OP_CHECKSIG)?;
    expect_op(&items[17], OP_ENDIF)?;

    let params = HtlcParams {
        order_hash,
        hash_lock,
        claim_lock_time,
        refund_lock_time,
        claimer,
        refunder,
    };
    validate_params(&params)?;
    Ok(params)
}

/// `OP_HASH160 <hash160(script)> OP_EQUAL`.
pub fn p2sh_script_pubkey(script: &Script) -> ScriptBuf {
    script.to_p2sh()
}

/// Standard P2SH address of a locking script.
pub fn p2sh_address(script: &Script, network: Network) -> Result<Address, ResolverError> {
    Address::p2sh(script, network)
        .map_err(|e| ResolverError::InvalidScriptParameters(format!("p2sh: {}", e)))
}

fn validate_params(params: &HtlcParams) -> Result<(), ResolverError> {
    if params.claimer == params.refunder {
        return Err(ResolverError::InvalidScriptParameters(
            "claimer and refunder keys are identical".into(),
        ));
    }
    if params.refund_lock_time <= params.claim_lock_time {
        return Err(ResolverError::InvalidScriptParameters(format!(
            "refund lock time {} must be after claim lock time {}",
            params.refund_lock_time, params.claim_lock_time
        )));
    }
    for (name, key) in [("claimer", &params.claimer), ("refunder", &params.refunder)] {
        bitcoin::secp256k1::PublicKey::from_slice(key).map_err(|_| {
            ResolverError::InvalidScriptParameters(format!(
                "{} key is not a compressed secp256k1 point",
                name
            ))
        })?;
    }
    Ok(())
}

fn push_bytes(bytes: Vec<u8>) -> Result<PushBytesBuf, ResolverError> {
    PushBytesBuf::try_from(bytes)
        .map_err(|e| ResolverError::InvalidScriptParameters(format!("push too large: {}", e)))
}

fn not_template(detail: String) -> ResolverError {
    ResolverError::InvalidScriptParameters(format!("not a claimable HTLC: {}", detail))
}

fn expect_op(item: &Instruction<'_>, expected: Opcode) -> Result<(), ResolverError> {
    match item {
        Instruction::Op(op) if *op == expected => Ok(()),
        other => Err(not_template(format!("expected {:?}, found {:?}", expected, other))),
    }
}

fn fixed<const N: usize>(item: &Instruction<'_>, what: &str) -> Result<[u8; N], ResolverError> {
    match item {
        Instruction::PushBytes(bytes) => bytes
            .as_bytes()
            .try_into()
            .map_err(|_| not_template(format!("{} must be {} bytes", what, N))),
        other => Err(not_template(format!("{}: expected push, found {:?}", what, other))),
    }
}

/// Decode a minimally-encoded script number that must fit a lock time.
fn script_num(item: &Instruction<'_>, what: &str) -> Result<u32, ResolverError> {
    let bytes = match item {
        Instruction::Op(op)
            if (OP_PUSHNUM_1.to_u8()..=OP_PUSHNUM_16.to_u8()).contains(&op.to_u8()) =>
        {
            return Ok(u32::from(op.to_u8() - OP_PUSHNUM_1.to_u8() + 1));
        }
        Instruction::PushBytes(bytes) => bytes.as_bytes(),
        other => return Err(not_template(format!("{}: expected number, found {:?}", what, other))),
    };
    if bytes.is_empty() {
        return Ok(0);
    }
    if bytes.len() > 5 {
        return Err(not_template(format!("{} exceeds 5 bytes", what)));
    }
    let mut value: i64 = 0;
    for (i, b) in bytes.iter().enumerate() {
        value |= i64::from(*b) << (8 * i);
    }
    let last = bytes[bytes.len() - 1];
    if last & 0x80 != 0 {
        value &= !(0x80i64 << (8 * (bytes.len() - 1)));
        value = -value;
    }
    u32::try_from(value).map_err(|_| not_template(format!("{} {} out of range", what, value)))
}
