//! # Time-Lock Codec
//!
//! Packs the seven relative deadlines of a swap and the escrow deployment
//! timestamp into one 256-bit word.
//!
//! ```text
//! bits   0..32   srcWithdrawal
//! bits  32..64   srcPublicWithdrawal
//! bits  64..96   srcCancellation
//! bits  96..128  srcPublicCancellation
//! bits 128..160  dstWithdrawal
//! bits 160..192  dstPublicWithdrawal
//! bits 192..224  dstCancellation
//! bits 224..256  deployedAt
//! ```

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::domain::{Leg, ResolverError, TimeLockSchedule};

const DEPLOYED_AT_OFFSET: usize = 224;

/// A stage of the escrow lifecycle. The discriminant is the field index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Stage {
    SrcWithdrawal = 0,
    SrcPublicWithdrawal = 1,
    SrcCancellation = 2,
    SrcPublicCancellation = 3,
    DstWithdrawal = 4,
    DstPublicWithdrawal = 5,
    DstCancellation = 6,
}

impl Stage {
    fn shift(self) -> usize {
        self as usize * 32
    }
}

/// Time-locks of one leg, as read back from a packed word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegTimelocks {
    pub deployed_at: u32,
    pub withdrawal: u32,
    pub public_withdrawal: u32,
    pub cancellation: u32,
    /// Destination escrows have no public cancellation stage.
    pub public_cancellation: Option<u32>,
}

/// Pack a schedule. `deployedAt` is left zero.
pub fn pack(schedule: &TimeLockSchedule) -> U256 {
    [
        (Stage::SrcWithdrawal, schedule.src_withdrawal),
        (Stage::SrcPublicWithdrawal, schedule.src_public_withdrawal),
        (Stage::SrcCancellation, schedule.src_cancellation),
        (Stage::SrcPublicCancellation, schedule.src_public_cancellation),
        (Stage::DstWithdrawal, schedule.dst_withdrawal),
        (Stage::DstPublicWithdrawal, schedule.dst_public_withdrawal),
        (Stage::DstCancellation, schedule.dst_cancellation),
    ]
    .into_iter()
    .fold(U256::zero(), |acc, (stage, value)| {
        acc | (U256::from(value) << stage.shift())
    })
}

/// Inverse of [`pack`]. `deployedAt` is ignored.
pub fn unpack(packed: U256) -> TimeLockSchedule {
    TimeLockSchedule {
        src_withdrawal: offset(packed, Stage::SrcWithdrawal),
        src_public_withdrawal: offset(packed, Stage::SrcPublicWithdrawal),
        src_cancellation: offset(packed, Stage::SrcCancellation),
        src_public_cancellation: offset(packed, Stage::SrcPublicCancellation),
        dst_withdrawal: offset(packed, Stage::DstWithdrawal),
        dst_public_withdrawal: offset(packed, Stage::DstPublicWithdrawal),
        dst_cancellation: offset(packed, Stage::DstCancellation),
    }
}

/// Replace the deployment timestamp. Only bits 224..256 change.
pub fn set_deployed_at(packed: U256, timestamp: u64) -> Result<U256, ResolverError> {
    let ts = u32::try_from(timestamp).map_err(|_| ResolverError::OutOfRange {
        field: "deployedAt",
        value: timestamp.to_string(),
    })?;
    let mask = U256::from(u32::MAX) << DEPLOYED_AT_OFFSET;
    Ok((packed & !mask) | (U256::from(ts) << DEPLOYED_AT_OFFSET))
}

/// Deployment timestamp stored in the word.
pub fn deployed_at(packed: U256) -> u32 {
    (packed >> DEPLOYED_AT_OFFSET).low_u32()
}

/// Relative offset of a stage.
pub fn offset(packed: U256, stage: Stage) -> u32 {
    (packed >> stage.shift()).low_u32()
}

/// Absolute unix time at which a stage begins.
pub fn deadline(packed: U256, stage: Stage) -> u64 {
    u64::from(deployed_at(packed)) + u64::from(offset(packed, stage))
}

/// Read the stages relevant to one leg.
pub fn unpack_for_leg(packed: U256, leg: Leg) -> LegTimelocks {
    let deployed_at = deployed_at(packed);
    match leg {
        Leg::Src => LegTimelocks {
            deployed_at,
            withdrawal: offset(packed, Stage::SrcWithdrawal),
            public_withdrawal: offset(packed, Stage::SrcPublicWithdrawal),
            cancellation: offset(packed, Stage::SrcCancellation),
            public_cancellation: Some(offset(packed, Stage::SrcPublicCancellation)),
        },
        Leg::Dst => LegTimelocks {
            deployed_at,
            withdrawal: offset(packed, Stage::DstWithdrawal),
            public_withdrawal: offset(packed, Stage::DstPublicWithdrawal),
            cancellation: offset(packed, Stage::DstCancellation),
            public_cancellation: None,
        },
    }
}
