//! # Domain Entities
//!
//! The swap order, the escrow immutables and the relay payload.

use primitive_types::{H160, H256, U256};
use serde::{Deserialize, Serialize};

use super::errors::{Hash, ResolverError};
use super::secure_secret::SecureSecret;
use super::value_objects::{HashLock, HexBytes, Leg, OrderStatus};

/// Relative deadlines of a swap, in seconds after the owning escrow's
/// deployment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeLockSchedule {
    /// Taker-only withdrawal opens on the source escrow.
    pub src_withdrawal: u32,
    /// Anyone may withdraw the source escrow for the taker.
    pub src_public_withdrawal: u32,
    /// Maker may cancel the source escrow.
    pub src_cancellation: u32,
    /// Anyone may cancel the source escrow for the maker.
    pub src_public_cancellation: u32,
    /// Withdrawal opens on the destination escrow.
    pub dst_withdrawal: u32,
    /// Anyone may withdraw the destination escrow for the maker.
    pub dst_public_withdrawal: u32,
    /// Taker may cancel the destination escrow.
    pub dst_cancellation: u32,
}

/// Canonical parameter set of one escrow. Each field is one ABI word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Immutables {
    /// Order this escrow belongs to.
    pub order_hash: H256,
    /// keccak-256 commitment to the secret.
    pub hash_lock: H256,
    /// Maker identity on this leg's chain.
    pub maker: H160,
    /// Taker identity on this leg's chain.
    pub taker: H160,
    /// Asset locked (zero for native).
    pub token: H160,
    /// Amount locked.
    pub amount: U256,
    /// Native deposit paid to whoever executes withdrawal or cancellation.
    pub safety_deposit: U256,
    /// Packed time-lock word (see `algorithms::timelocks`).
    pub timelocks: U256,
}

impl Immutables {
    /// Destination immutables: source immutables with the complement applied
    /// and the resolver's destination identity as taker.
    pub fn for_destination(&self, complement: &DstImmutablesComplement, taker: H160) -> Self {
        Self {
            order_hash: self.order_hash,
            hash_lock: self.hash_lock,
            maker: complement.maker,
            taker,
            token: complement.token,
            amount: complement.amount,
            safety_deposit: complement.safety_deposit,
            timelocks: self.timelocks,
        }
    }
}

/// Fields of the destination escrow that differ from the source escrow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DstImmutablesComplement {
    /// Receiver of the destination funds.
    pub maker: H160,
    /// Destination amount.
    pub amount: U256,
    /// Destination asset.
    pub token: H160,
    /// Destination safety deposit.
    pub safety_deposit: U256,
    /// Destination chain id.
    pub chain_id: U256,
}

/// Maker-signed limit order, as filled by the resolver contract.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitOrder {
    pub salt: U256,
    pub maker: H160,
    pub receiver: H160,
    pub maker_asset: H160,
    pub taker_asset: H160,
    pub making_amount: U256,
    pub taking_amount: U256,
    pub maker_traits: U256,
}

/// Everything `deploySrc` needs besides the immutables. Produced by intake.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillAuthorization {
    pub order: LimitOrder,
    /// Compact signature, first half.
    pub r: H256,
    /// Compact signature, `s` with the recovery bit folded in.
    pub vs: H256,
    /// Amount to fill.
    pub fill_amount: U256,
    pub taker_traits: U256,
    /// Extension / interaction bytes forwarded to the limit order protocol.
    pub args: HexBytes,
}

/// A swap intent and its accumulated execution state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub hash: Hash,
    pub src_chain_id: u64,
    pub dst_chain_id: u64,
    /// Maker address on the source chain, chain-native encoding.
    pub maker_address: String,
    /// Taker address on the source chain, chain-native encoding.
    pub taker_address: String,
    /// Maker's receiving address on the destination chain.
    #[serde(default)]
    pub maker_dst_address: Option<String>,
    pub making_amount: U256,
    pub taking_amount: U256,
    #[serde(default)]
    pub src_token: H160,
    #[serde(default)]
    pub dst_token: H160,
    #[serde(default)]
    pub src_safety_deposit: U256,
    #[serde(default)]
    pub dst_safety_deposit: U256,
    pub hash_lock: HashLock,
    pub time_lock_schedule: TimeLockSchedule,
    pub status: OrderStatus,
    #[serde(default)]
    pub src_escrow_address: Option<String>,
    #[serde(default)]
    pub dst_escrow_address: Option<String>,
    #[serde(default)]
    pub src_immutables: Option<Immutables>,
    #[serde(default)]
    pub dst_immutables: Option<Immutables>,
    #[serde(default)]
    pub dst_complement: Option<DstImmutablesComplement>,
    #[serde(default)]
    pub src_deploy_tx_ref: Option<String>,
    #[serde(default)]
    pub dst_deploy_tx_ref: Option<String>,
    #[serde(default)]
    pub src_withdraw_tx_ref: Option<String>,
    #[serde(default)]
    pub dst_withdraw_tx_ref: Option<String>,
    /// HTLC locking script of the UTXO leg.
    #[serde(default)]
    pub htlc_script: Option<HexBytes>,
    /// Compressed public key of the user on the UTXO leg.
    #[serde(default)]
    pub btc_user_recipient_key: Option<HexBytes>,
    /// Maker-signed fill, required when the source leg is account-based.
    #[serde(default)]
    pub src_fill: Option<FillAuthorization>,
    pub created_at: u64,
}

impl Order {
    /// Chain id of a leg.
    pub fn chain_id(&self, leg: Leg) -> u64 {
        match leg {
            Leg::Src => self.src_chain_id,
            Leg::Dst => self.dst_chain_id,
        }
    }

    /// Recorded immutables of a leg.
    pub fn immutables(&self, leg: Leg) -> Option<&Immutables> {
        match leg {
            Leg::Src => self.src_immutables.as_ref(),
            Leg::Dst => self.dst_immutables.as_ref(),
        }
    }

    /// Recorded escrow address of a leg.
    pub fn escrow_address(&self, leg: Leg) -> Option<&str> {
        match leg {
            Leg::Src => self.src_escrow_address.as_deref(),
            Leg::Dst => self.dst_escrow_address.as_deref(),
        }
    }

    /// Recorded deployment (or funding) transaction of a leg.
    pub fn deploy_tx(&self, leg: Leg) -> Option<&str> {
        match leg {
            Leg::Src => self.src_deploy_tx_ref.as_deref(),
            Leg::Dst => self.dst_deploy_tx_ref.as_deref(),
        }
    }

    /// Recorded withdrawal transaction of a leg.
    pub fn withdraw_tx(&self, leg: Leg) -> Option<&str> {
        match leg {
            Leg::Src => self.src_withdraw_tx_ref.as_deref(),
            Leg::Dst => self.dst_withdraw_tx_ref.as_deref(),
        }
    }

    /// Record the escrow address of a leg. Write-once.
    pub fn record_escrow_address(
        &mut self,
        leg: Leg,
        address: String,
    ) -> Result<(), ResolverError> {
        let slot = match leg {
            Leg::Src => &mut self.src_escrow_address,
            Leg::Dst => &mut self.dst_escrow_address,
        };
        write_once(slot, address, "escrow address", leg)
    }

    /// Record the immutables of a leg. Write-once.
    pub fn record_immutables(
        &mut self,
        leg: Leg,
        immutables: Immutables,
    ) -> Result<(), ResolverError> {
        let slot = match leg {
            Leg::Src => &mut self.src_immutables,
            Leg::Dst => &mut self.dst_immutables,
        };
        write_once(slot, immutables, "immutables", leg)
    }

    /// Record the deployment transaction of a leg. Write-once.
    pub fn record_deploy_tx(&mut self, leg: Leg, tx_ref: String) -> Result<(), ResolverError> {
        let slot = match leg {
            Leg::Src => &mut self.src_deploy_tx_ref,
            Leg::Dst => &mut self.dst_deploy_tx_ref,
        };
        write_once(slot, tx_ref, "deploy tx", leg)
    }

    /// Record the withdrawal transaction of a leg. Write-once.
    pub fn record_withdraw_tx(&mut self, leg: Leg, tx_ref: String) -> Result<(), ResolverError> {
        let slot = match leg {
            Leg::Src => &mut self.src_withdraw_tx_ref,
            Leg::Dst => &mut self.dst_withdraw_tx_ref,
        };
        write_once(slot, tx_ref, "withdraw tx", leg)
    }

    /// Drop a deployment reference whose transaction reverted, so the step
    /// can be submitted again.
    pub fn forget_deploy_tx(&mut self, leg: Leg) -> Option<String> {
        match leg {
            Leg::Src => self.src_deploy_tx_ref.take(),
            Leg::Dst => self.dst_deploy_tx_ref.take(),
        }
    }

    /// Drop a withdrawal reference whose transaction reverted.
    pub fn forget_withdraw_tx(&mut self, leg: Leg) -> Option<String> {
        match leg {
            Leg::Src => self.src_withdraw_tx_ref.take(),
            Leg::Dst => self.dst_withdraw_tx_ref.take(),
        }
    }

    /// Move to the next lifecycle status.
    pub fn advance_to(&mut self, next: OrderStatus) -> Result<(), ResolverError> {
        if !self.status.can_transition_to(next) {
            return Err(ResolverError::InvalidTransition {
                from: format!("{:?}", self.status),
                to: format!("{:?}", next),
            });
        }
        self.status = next;
        Ok(())
    }
}

fn write_once<T: PartialEq + std::fmt::Debug>(
    slot: &mut Option<T>,
    value: T,
    what: &str,
    leg: Leg,
) -> Result<(), ResolverError> {
    match slot {
        Some(existing) if *existing == value => Ok(()),
        Some(existing) => Err(ResolverError::Validation(format!(
            "{} {} already recorded as {:?}",
            leg, what, existing
        ))),
        None => {
            *slot = Some(value);
            Ok(())
        }
    }
}

/// Builder for orders as produced by intake.
/// Avoids too many arguments in constructor.
#[derive(Clone, Debug)]
pub struct OrderBuilder {
    order: Order,
}

impl OrderBuilder {
    /// Create a new builder with required fields.
    pub fn new(hash: Hash, hash_lock: HashLock, src_chain_id: u64, dst_chain_id: u64) -> Self {
        Self {
            order: Order {
                hash,
                src_chain_id,
                dst_chain_id,
                maker_address: String::new(),
                taker_address: String::new(),
                maker_dst_address: None,
                making_amount: U256::zero(),
                taking_amount: U256::zero(),
                src_token: H160::zero(),
                dst_token: H160::zero(),
                src_safety_deposit: U256::zero(),
                dst_safety_deposit: U256::zero(),
                hash_lock,
                time_lock_schedule: TimeLockSchedule::default(),
                status: OrderStatus::Created,
                src_escrow_address: None,
                dst_escrow_address: None,
                src_immutables: None,
                dst_immutables: None,
                dst_complement: None,
                src_deploy_tx_ref: None,
                dst_deploy_tx_ref: None,
                src_withdraw_tx_ref: None,
                dst_withdraw_tx_ref: None,
                htlc_script: None,
                btc_user_recipient_key: None,
                src_fill: None,
                created_at: 0,
            },
        }
    }

    /// Set maker addresses (source chain, destination chain).
    pub fn maker(mut self, src: impl Into<String>, dst: impl Into<String>) -> Self {
        self.order.maker_address = src.into();
        self.order.maker_dst_address = Some(dst.into());
        self
    }

    /// Set taker address on the source chain.
    pub fn taker(mut self, taker: impl Into<String>) -> Self {
        self.order.taker_address = taker.into();
        self
    }

    /// Set amounts.
    pub fn amounts(mut self, making: U256, taking: U256) -> Self {
        self.order.making_amount = making;
        self.order.taking_amount = taking;
        self
    }

    /// Set safety deposits.
    pub fn safety_deposits(mut self, src: U256, dst: U256) -> Self {
        self.order.src_safety_deposit = src;
        self.order.dst_safety_deposit = dst;
        self
    }

    /// Set time-lock schedule.
    pub fn schedule(mut self, schedule: TimeLockSchedule) -> Self {
        self.order.time_lock_schedule = schedule;
        self
    }

    /// Set the UTXO-leg user key.
    pub fn btc_user_key(mut self, key: Vec<u8>) -> Self {
        self.order.btc_user_recipient_key = Some(HexBytes(key));
        self
    }

    /// Set the maker-built source HTLC and its funding transaction.
    pub fn src_htlc(mut self, script: Vec<u8>, funding_tx: impl Into<String>) -> Self {
        self.order.htlc_script = Some(HexBytes(script));
        self.order.src_deploy_tx_ref = Some(funding_tx.into());
        self
    }

    /// Set the maker-signed fill for an account-chain source.
    pub fn src_fill(mut self, fill: FillAuthorization) -> Self {
        self.order.src_fill = Some(fill);
        self
    }

    /// Set creation time.
    pub fn created_at(mut self, ts: u64) -> Self {
        self.order.created_at = ts;
        self
    }

    /// Build the order.
    pub fn build(self) -> Order {
        self.order
    }
}

/// Payload delivered by the secret relay once the maker has seen the
/// destination escrow. Drives the withdraw transition.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretRevealed {
    pub order_hash: Hash,
    pub hash_lock: HashLock,
    pub src_chain_id: u64,
    pub dst_chain_id: u64,
    pub src_escrow_address: String,
    pub dst_escrow_address: String,
    pub src_immutables: Immutables,
    pub dst_immutables: Immutables,
    pub secret: SecureSecret,
    #[serde(default)]
    pub htlc_script: Option<HexBytes>,
}
