//! # Algorithms Module
//!
//! Pure codecs shared by the adapters and the orchestrator.

pub mod abi;
pub mod addressing;
pub mod escrow_address;
pub mod htlc_script;
pub mod secret;
pub mod timelocks;

pub use escrow_address::{compute_escrow_address, create2_address, immutables_hash};
pub use htlc_script::{
    build_claimable_script, build_unlocking_script, p2sh_address, p2sh_script_pubkey,
    parse_claimable_script, HtlcParams, UnlockPath,
};
pub use secret::verify_secret;
pub use timelocks::{deadline, pack, set_deployed_at, unpack, unpack_for_leg, LegTimelocks, Stage};
