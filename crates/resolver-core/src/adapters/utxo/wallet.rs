//! Coin selection, outpoint reservations and transaction assembly for the
//! resolver's P2WPKH wallet.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use bitcoin::absolute::LockTime;
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use parking_lot::Mutex;
use tracing::debug;

use crate::domain::ResolverError;
use crate::ports::outbound::UtxoOutput;

/// Outputs below this are not worth creating.
pub const DUST_LIMIT: u64 = 546;

// Virtual sizes used for fee estimation.
const TX_OVERHEAD_VB: u64 = 11;
const P2WPKH_INPUT_VB: u64 = 68;
const P2WPKH_OUTPUT_VB: u64 = 31;
const P2SH_OUTPUT_VB: u64 = 32;
const LEGACY_INPUT_BASE_VB: u64 = 41;

/// A funded input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedInput {
    pub outpoint: OutPoint,
    pub value: u64,
}

/// Result of coin selection.
#[derive(Debug)]
pub struct Selection {
    pub inputs: Vec<SelectedInput>,
    pub fee: u64,
    /// Zero when the remainder is dust and goes to fees.
    pub change: u64,
    guard: ReservationGuard,
}

impl Selection {
    /// Keep the outpoints reserved: they are spent by a broadcast transaction.
    pub fn commit(self) {
        self.guard.commit();
    }
}

/// Outpoints currently claimed by in-flight fundings.
#[derive(Debug, Default)]
pub struct Reservations {
    reserved: Arc<Mutex<HashSet<OutPoint>>>,
}

impl Reservations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.reserved.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Largest-first selection over unreserved outputs paying `amount` to a
    /// P2SH output plus a P2WPKH change output.
    ///
    /// Selection and reservation happen under one lock, so concurrent
    /// callers never pick the same outpoint.
    pub fn select(
        &self,
        utxos: &[UtxoOutput],
        amount: u64,
        fee_rate: u64,
    ) -> Result<Selection, ResolverError> {
        let mut listed = Vec::with_capacity(utxos.len());
        for utxo in utxos {
            let txid = Txid::from_str(&utxo.txid)
                .map_err(|e| ResolverError::Rpc(format!("bad txid {}: {}", utxo.txid, e)))?;
            listed.push(SelectedInput {
                outpoint: OutPoint::new(txid, utxo.vout),
                value: utxo.value,
            });
        }

        let mut reserved = self.reserved.lock();
        // Outpoints the node no longer lists are spent; stop tracking them.
        let live: HashSet<OutPoint> = listed.iter().map(|i| i.outpoint).collect();
        reserved.retain(|outpoint| live.contains(outpoint));

        let mut candidates: Vec<SelectedInput> = listed
            .into_iter()
            .filter(|input| !reserved.contains(&input.outpoint))
            .collect();
        if candidates.is_empty() {
            return Err(ResolverError::NoUtxos("resolver wallet".into()));
        }
        candidates.sort_by(|a, b| b.value.cmp(&a.value));

        let available: u64 = candidates.iter().map(|c| c.value).sum();
        let mut inputs = Vec::new();
        let mut total = 0u64;
        for candidate in candidates {
            total += candidate.value;
            inputs.push(candidate);

            let fee_with_change = fee_rate * funding_vsize(inputs.len() as u64, true);
            if total >= amount + fee_with_change {
                let change = total - amount - fee_with_change;
                let (fee, change) = if change > DUST_LIMIT {
                    (fee_with_change, change)
                } else {
                    (total - amount, 0)
                };
                for input in &inputs {
                    reserved.insert(input.outpoint);
                }
                debug!(
                    "[resolver] selected {} inputs ({} sat) for {} sat, fee {}",
                    inputs.len(),
                    total,
                    amount,
                    fee
                );
                let guard = ReservationGuard {
                    reserved: Arc::clone(&self.reserved),
                    outpoints: inputs.iter().map(|i| i.outpoint).collect(),
                    committed: false,
                };
                return Ok(Selection {
                    inputs,
                    fee,
                    change,
                    guard,
                });
            }
        }

        let required = amount + fee_rate * funding_vsize(inputs.len() as u64, false);
        Err(ResolverError::InsufficientFunds {
            required: format!("{} sat", required),
            available: format!("{} sat", available),
        })
    }
}

/// Releases reserved outpoints on drop unless committed.
#[derive(Debug)]
struct ReservationGuard {
    reserved: Arc<Mutex<HashSet<OutPoint>>>,
    outpoints: Vec<OutPoint>,
    committed: bool,
}

impl ReservationGuard {
    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for ReservationGuard {
    fn drop(&mut self) {
        if !self.committed {
            let mut reserved = self.reserved.lock();
            for outpoint in &self.outpoints {
                reserved.remove(outpoint);
            }
        }
    }
}

fn funding_vsize(inputs: u64, with_change: bool) -> u64 {
    TX_OVERHEAD_VB
        + inputs * P2WPKH_INPUT_VB
        + P2SH_OUTPUT_VB
        + if with_change { P2WPKH_OUTPUT_VB } else { 0 }
}

/// Unsigned funding transaction: output 0 pays the HTLC, output 1 is change.
pub fn build_funding_tx(
    selection: &Selection,
    htlc_script_pubkey: ScriptBuf,
    amount: u64,
    change_script_pubkey: ScriptBuf,
) -> Transaction {
    let input = selection
        .inputs
        .iter()
        .map(|i| TxIn {
            previous_output: i.outpoint,
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        })
        .collect();
    let mut output = vec![TxOut {
        value: Amount::from_sat(amount),
        script_pubkey: htlc_script_pubkey,
    }];
    if selection.change > 0 {
        output.push(TxOut {
            value: Amount::from_sat(selection.change),
            script_pubkey: change_script_pubkey,
        });
    }
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input,
        output,
    }
}

/// Unsigned spend of an HTLC output through the claim branch.
///
/// `script_sig_len` is the expected unlocking script size, used for the fee.
pub fn build_redeem_tx(
    outpoint: OutPoint,
    value: u64,
    claim_lock_time: u32,
    destination: ScriptBuf,
    script_sig_len: u64,
    fee_rate: u64,
) -> Result<Transaction, ResolverError> {
    let vsize = TX_OVERHEAD_VB + LEGACY_INPUT_BASE_VB + script_sig_len + P2WPKH_OUTPUT_VB;
    let fee = fee_rate * vsize;
    if value <= fee + DUST_LIMIT {
        return Err(ResolverError::InsufficientFunds {
            required: format!("{} sat", fee + DUST_LIMIT + 1),
            available: format!("{} sat", value),
        });
    }
    Ok(Transaction {
        version: Version::TWO,
        lock_time: LockTime::from_consensus(claim_lock_time),
        input: vec![TxIn {
            previous_output: outpoint,
            script_sig: ScriptBuf::new(),
            // Non-final so the lock time is enforced.
            sequence: Sequence::ENABLE_LOCKTIME_NO_RBF,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(value - fee),
            script_pubkey: destination,
        }],
    })
}
