//! Fork gate
//!
//! Behavior that changed across hard forks is selected here, keeping the
//! version comparisons out of the command bodies.

use crate::types::{AccountId, BlockNo, ForkVersion};
use tracing::warn;

/// Block whose VPR deltas were applied three times for one account
pub const VPR_QUIRK_BLOCK: BlockNo = 138_015_125;

/// Base58 account ID affected at [`VPR_QUIRK_BLOCK`]
pub const VPR_QUIRK_ACCOUNT: &str = "36t2u7Q31HmEbkkYZng7DHNm3xepxHKUfgGrAXNA8pMW";

/// Governance behavior variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Fork {
    /// Versions below 2: object events, legacy payloads, clamped unstake
    Legacy,
    /// Version 2 and later: array events, VPR, DAO voting
    V2,
}

impl Fork {
    pub fn of(version: ForkVersion) -> Self {
        if version >= 2 {
            Fork::V2
        } else {
            Fork::Legacy
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Fork::Legacy)
    }

    /// Whether voting moves the voter's power in the VPR
    pub fn tracks_voting_power(&self) -> bool {
        matches!(self, Fork::V2)
    }

    /// Whether DAO votes and proposal creation are accepted
    pub fn supports_dao(&self) -> bool {
        matches!(self, Fork::V2)
    }

    /// Whether single-byte payloads are accepted
    pub fn accepts_short_payload(&self) -> bool {
        matches!(self, Fork::Legacy)
    }

    /// Whether an unstake above the stake is clamped instead of rejected
    pub fn clamps_unstake(&self) -> bool {
        matches!(self, Fork::Legacy)
    }
}

/// How many times a VPR delta is applied for `id` at `block_no`
pub fn vpr_repeat(block_no: BlockNo, id: &AccountId) -> usize {
    if block_no == VPR_QUIRK_BLOCK && id.to_base58() == VPR_QUIRK_ACCOUNT {
        warn!(block_no, account = %id, "applying historical triple voting power delta");
        3
    } else {
        1
    }
}
