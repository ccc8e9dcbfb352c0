//! # Domain Invariants
//!
//! Business rules checked before an order touches any chain.

use primitive_types::U256;

use super::entities::{Order, TimeLockSchedule};
use super::errors::ResolverError;
use super::value_objects::ChainKind;

/// Length of a compressed secp256k1 public key.
pub const COMPRESSED_KEY_LEN: usize = 33;

/// Invariant: the two legs live on different chains.
pub fn invariant_distinct_chains(src: u64, dst: u64) -> Result<(), ResolverError> {
    if src == dst {
        return Err(ResolverError::Validation(format!(
            "source and destination chain are both {}",
            src
        )));
    }
    Ok(())
}

/// Invariant: both legs move a non-zero amount.
pub fn invariant_positive_amounts(making: U256, taking: U256) -> Result<(), ResolverError> {
    if making.is_zero() || taking.is_zero() {
        return Err(ResolverError::Validation(
            "making and taking amounts must be positive".into(),
        ));
    }
    Ok(())
}

/// Invariant: time-lock schedule ordering.
///
/// Each leg opens withdrawal before cancellation, public windows sit inside
/// their private ones when set, and the destination is cancellable before
/// the source so the resolver can always recover its funds first.
pub fn invariant_schedule_ordering(s: &TimeLockSchedule) -> Result<(), ResolverError> {
    let fail = |msg: &str| Err(ResolverError::Validation(format!("time-lock schedule: {}", msg)));

    if s.src_withdrawal >= s.src_cancellation {
        return fail("srcWithdrawal must precede srcCancellation");
    }
    if s.dst_withdrawal >= s.dst_cancellation {
        return fail("dstWithdrawal must precede dstCancellation");
    }
    if s.dst_cancellation >= s.src_cancellation {
        return fail("dstCancellation must precede srcCancellation");
    }
    if s.src_public_withdrawal != 0
        && !(s.src_withdrawal..=s.src_cancellation).contains(&s.src_public_withdrawal)
    {
        return fail("srcPublicWithdrawal outside withdrawal window");
    }
    if s.src_public_cancellation != 0 && s.src_public_cancellation < s.src_cancellation {
        return fail("srcPublicCancellation precedes srcCancellation");
    }
    if s.dst_public_withdrawal != 0
        && !(s.dst_withdrawal..=s.dst_cancellation).contains(&s.dst_public_withdrawal)
    {
        return fail("dstPublicWithdrawal outside withdrawal window");
    }
    Ok(())
}

/// Invariant: a UTXO-leg key is a 33-byte compressed point.
pub fn invariant_compressed_key(key: &[u8], field: &str) -> Result<(), ResolverError> {
    if key.len() != COMPRESSED_KEY_LEN || !matches!(key[0], 0x02 | 0x03) {
        return Err(ResolverError::Validation(format!(
            "{} must be a 33-byte compressed public key",
            field
        )));
    }
    Ok(())
}

/// Validate an order for the given leg kinds.
///
/// Checks the fields each leg needs so a malformed order fails with
/// `Validation` before any adapter call.
pub fn validate_order(
    order: &Order,
    src_kind: ChainKind,
    dst_kind: ChainKind,
) -> Result<(), ResolverError> {
    invariant_distinct_chains(order.src_chain_id, order.dst_chain_id)?;
    invariant_positive_amounts(order.making_amount, order.taking_amount)?;
    invariant_schedule_ordering(&order.time_lock_schedule)?;

    if src_kind == dst_kind {
        return Err(ResolverError::Validation(format!(
            "both legs are {}; one account leg and one UTXO leg are required",
            src_kind
        )));
    }

    match src_kind {
        ChainKind::Evm => {
            if order.src_fill.is_none() {
                return Err(ResolverError::Validation("srcFill is required".into()));
            }
        }
        ChainKind::Utxo => {
            if order.htlc_script.is_none() {
                return Err(ResolverError::Validation("htlcScript is required".into()));
            }
            if order.src_deploy_tx_ref.is_none() {
                return Err(ResolverError::Validation(
                    "srcDeployTxRef (maker funding tx) is required".into(),
                ));
            }
        }
    }

    match dst_kind {
        ChainKind::Evm => {
            if order.maker_dst_address.is_none() && order.src_fill.is_none() {
                return Err(ResolverError::Validation(
                    "makerDstAddress is required".into(),
                ));
            }
        }
        ChainKind::Utxo => {
            let key = order.btc_user_recipient_key.as_ref().ok_or_else(|| {
                ResolverError::Validation("btcUserRecipientKey is required".into())
            })?;
            invariant_compressed_key(key.as_slice(), "btcUserRecipientKey")?;
        }
    }

    Ok(())
}
