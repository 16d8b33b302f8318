//! Staking ledger
//!
//! One record per account that has ever staked. `when` is the block at
//! which the account last staked, unstaked or voted; both protocol delays
//! are measured from it.

use crate::error::{GovernanceError, Result};
use crate::keys;
use crate::store::{get_nonempty, DataGetter, DataSetter};
use crate::types::{amount_from_bytes, amount_to_bytes, Amount, BlockNo};
use num_traits::Zero;
use serde::{Deserialize, Serialize};

/// Minimum blocks between two stake or unstake actions of one account
pub const STAKING_DELAY: BlockNo = 60 * 60 * 24;

/// Locked stake of one account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staking {
    /// Currently locked amount
    pub amount: Amount,

    /// Block of the last governance action by this account
    pub when: BlockNo,
}

impl Staking {
    pub fn new(amount: Amount, when: BlockNo) -> Self {
        Self { amount, when }
    }

    pub fn is_empty(&self) -> bool {
        self.amount.is_zero()
    }

    /// Whether `delay` blocks have passed since the last action
    pub fn elapsed(&self, delay: BlockNo, block_no: BlockNo) -> bool {
        self.when.saturating_add(delay) <= block_no
    }

    /// `when` as 8-byte little endian, then the amount big-endian
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = self.when.to_le_bytes().to_vec();
        out.extend_from_slice(&amount_to_bytes(&self.amount));
        out
    }

    pub fn deserialize(data: &[u8]) -> Result<Self> {
        if data.len() < 8 {
            return Err(GovernanceError::Corrupted(format!(
                "staking record of {} bytes",
                data.len()
            )));
        }
        let mut when = [0u8; 8];
        when.copy_from_slice(&data[..8]);
        Ok(Self {
            amount: amount_from_bytes(&data[8..]),
            when: u64::from_le_bytes(when),
        })
    }
}

/// Staking record of `account`, `{0, 0}` when absent
pub fn get_staking<G: DataGetter + ?Sized>(g: &G, account: &[u8]) -> Result<Staking> {
    match get_nonempty(g, &keys::staking_key(account))? {
        Some(data) => Staking::deserialize(&data),
        None => Ok(Staking::default()),
    }
}

pub fn set_staking<S: DataSetter + ?Sized>(s: &mut S, account: &[u8], staking: &Staking) -> Result<()> {
    s.set_data(&keys::staking_key(account), &staking.serialize())
}

/// Sum of every account's stake
pub fn get_staking_total<G: DataGetter + ?Sized>(g: &G) -> Result<Amount> {
    Ok(g
        .get_data(keys::STAKING_TOTAL_KEY)?
        .map(|data| amount_from_bytes(&data))
        .unwrap_or_default())
}

pub fn add_staking_total<S>(s: &mut S, amount: &Amount) -> Result<()>
where
    S: DataGetter + DataSetter + ?Sized,
{
    let total = get_staking_total(&*s)? + amount;
    s.set_data(keys::STAKING_TOTAL_KEY, &amount_to_bytes(&total))
}

pub fn sub_staking_total<S>(s: &mut S, amount: &Amount) -> Result<()>
where
    S: DataGetter + DataSetter + ?Sized,
{
    let total = get_staking_total(&*s)?;
    if total < *amount {
        return Err(GovernanceError::Corrupted(format!(
            "staking total {} below unstaked amount {}",
            total, amount
        )));
    }
    s.set_data(keys::STAKING_TOTAL_KEY, &amount_to_bytes(&(total - amount)))
}
