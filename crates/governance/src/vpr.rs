//! Voters' Power Ranking (VPR)
//!
//! Tracks, per account, the stake currently backing its votes across all
//! issues, and ranks voters by that power. The reward layer draws a voting
//! reward winner with probability proportional to power.
//!
//! ## Lifecycle
//!
//! Commands stage signed deltas with [`Vpr::add`] and [`Vpr::sub`];
//! [`Vpr::apply`] folds them into the committed powers once per command and
//! rewrites the touched storage buckets.
//!
//! Between [`Vpr::begin_tx`] and [`Vpr::commit_tx`] every voter entry
//! changed is journaled with its prior value, so [`Vpr::rollback_tx`]
//! restores a failed transaction in time proportional to what it touched.
//!
//! ## Storage
//!
//! Voters are spread over 71 buckets by `id[0] % 71`, persisted at
//! `VotingPowerBucket/<n>` as a concatenation of
//! `id(32) ‖ u16le addrLen ‖ addr ‖ u16le powLen ‖ powerBE`, ordered by
//! account ID descending.

use crate::error::{GovernanceError, Result};
use crate::keys;
use crate::store::{DataGetter, DataSetter};
use crate::types::{amount_from_bytes, amount_to_bytes, gaer, AccountId, Address, Amount};
use num_bigint::{BigInt, RandBigInt, Sign};
use num_traits::{Signed, Zero};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Maximum number of ranked voters
pub const VPR_MAX: usize = 50_000;

/// Number of storage buckets
pub const VPR_BUCKETS: u8 = 71;

const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

/// Voting reward paid per second: 5,045,760 coins a year
pub fn voting_reward_amount() -> Amount {
    let annual = gaer(5_045_760_000) * Amount::from(1_000_000u32);
    annual / Amount::from(SECONDS_PER_YEAR)
}

pub fn bucket_index(id: &AccountId) -> u8 {
    id.0[0] % VPR_BUCKETS
}

/// One ranked voter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotingPower {
    pub id: AccountId,
    pub addr: Address,
    pub power: Amount,
}

impl VotingPower {
    pub fn new(id: AccountId, addr: Address, power: Amount) -> Self {
        Self { id, addr, power }
    }

    fn rank_key(&self) -> RankKey {
        (Reverse(self.power.clone()), Reverse(self.id))
    }

    pub fn marshal(&self) -> Result<Vec<u8>> {
        let addr = self.addr.as_bytes();
        let power = amount_to_bytes(&self.power);
        let addr_len = u16::try_from(addr.len())
            .map_err(|_| GovernanceError::Corrupted("vpr address too long".into()))?;
        let power_len = u16::try_from(power.len())
            .map_err(|_| GovernanceError::Corrupted("vpr power too long".into()))?;

        let mut out = Vec::with_capacity(36 + addr.len() + power.len());
        out.extend_from_slice(self.id.as_bytes());
        out.extend_from_slice(&addr_len.to_le_bytes());
        out.extend_from_slice(addr);
        out.extend_from_slice(&power_len.to_le_bytes());
        out.extend_from_slice(&power);
        Ok(out)
    }

    /// Decode one entry, returning it with the number of bytes consumed
    pub fn unmarshal(data: &[u8]) -> Result<(Self, usize)> {
        let corrupted = || GovernanceError::Corrupted("vpr bucket entry".into());
        let id = data.get(..32).and_then(AccountId::from_slice).ok_or_else(corrupted)?;
        let addr_len = data.get(32..34).ok_or_else(corrupted)?;
        let addr_len = u16::from_le_bytes([addr_len[0], addr_len[1]]) as usize;
        let addr_end = 34 + addr_len;
        let addr = data.get(34..addr_end).ok_or_else(corrupted)?;
        let power_len = data.get(addr_end..addr_end + 2).ok_or_else(corrupted)?;
        let power_len = u16::from_le_bytes([power_len[0], power_len[1]]) as usize;
        let power_start = addr_end + 2;
        let power = data
            .get(power_start..power_start + power_len)
            .ok_or_else(corrupted)?;
        Ok((
            Self::new(id, Address::new(addr), amount_from_bytes(power)),
            power_start + power_len,
        ))
    }
}

/// Ascending order is power descending, then ID descending
type RankKey = (Reverse<Amount>, Reverse<AccountId>);

#[derive(Debug, Clone, PartialEq, Eq)]
struct Delta {
    addr: Address,
    amount: BigInt,
}

#[derive(Serialize)]
struct RankerEntry {
    #[serde(rename = "Address")]
    address: String,
    #[serde(rename = "Power")]
    power: String,
}

/// Voters' power ranking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vpr {
    max: usize,
    voters: BTreeMap<AccountId, VotingPower>,
    ranking: BTreeSet<RankKey>,
    buckets: BTreeMap<u8, BTreeSet<Reverse<AccountId>>>,
    total_power: Amount,
    changes: BTreeMap<AccountId, Delta>,

    /// Prior entries of voters changed in the open transaction
    journal: Option<BTreeMap<AccountId, Option<VotingPower>>>,
}

impl Default for Vpr {
    fn default() -> Self {
        Self::new(VPR_MAX)
    }
}

impl Vpr {
    pub fn new(max: usize) -> Self {
        Self {
            max,
            voters: BTreeMap::new(),
            ranking: BTreeSet::new(),
            buckets: BTreeMap::new(),
            total_power: Amount::zero(),
            changes: BTreeMap::new(),
            journal: None,
        }
    }

    /// Read every bucket from state
    pub fn load<G: DataGetter + ?Sized>(g: &G, max: usize) -> Result<Self> {
        let mut vpr = Self::new(max);
        for index in 0..VPR_BUCKETS {
            let Some(data) = g.get_data(&keys::vpr_bucket_key(index))? else {
                continue;
            };
            let mut offset = 0;
            while offset < data.len() {
                let (vp, used) = VotingPower::unmarshal(&data[offset..])?;
                offset += used;
                if !vp.power.is_zero() {
                    vpr.insert(vp);
                }
            }
        }
        debug!(voters = vpr.len(), total = %vpr.total_power, "loaded voting power rank");
        Ok(vpr)
    }

    pub fn len(&self) -> usize {
        self.voters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voters.is_empty()
    }

    pub fn total_power(&self) -> &Amount {
        &self.total_power
    }

    pub fn voting_power_of(&self, id: &AccountId) -> Option<&Amount> {
        self.voters.get(id).map(|vp| &vp.power)
    }

    /// Voter with the least power
    pub fn lowest(&self) -> Option<&VotingPower> {
        self.ranking
            .iter()
            .next_back()
            .and_then(|(_, Reverse(id))| self.voters.get(id))
    }

    /// Top `n` voters in rank order, all of them when `n` is 0
    pub fn rankers(&self, n: usize) -> Vec<&VotingPower> {
        let take = if n == 0 { usize::MAX } else { n };
        self.ranking
            .iter()
            .take(take)
            .filter_map(|(_, Reverse(id))| self.voters.get(id))
            .collect()
    }

    /// Whether deltas are staged
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Stage an increase, ignoring zero amounts
    pub fn add(&mut self, id: AccountId, addr: &Address, amount: &Amount) {
        if amount.is_zero() {
            return;
        }
        debug!(op = "add", %id, delta = %amount, "prepare voting power change");
        let delta = self.prepare(id, addr);
        delta.amount += BigInt::from_biguint(Sign::Plus, amount.clone());
    }

    /// Stage a decrease, ignoring accounts not yet ranked
    pub fn sub(&mut self, id: AccountId, addr: &Address, amount: &Amount) {
        if !self.voters.contains_key(&id) {
            return;
        }
        debug!(op = "sub", %id, delta = %amount, "prepare voting power change");
        let delta = self.prepare(id, addr);
        delta.amount -= BigInt::from_biguint(Sign::Plus, amount.clone());
    }

    fn prepare(&mut self, id: AccountId, addr: &Address) -> &mut Delta {
        self.changes.entry(id).or_insert_with(|| Delta {
            addr: addr.clone(),
            amount: BigInt::zero(),
        })
    }

    /// Drop staged deltas
    pub fn discard_changes(&mut self) {
        self.changes.clear();
    }

    /// Start journaling voter changes
    pub fn begin_tx(&mut self) {
        self.journal = Some(BTreeMap::new());
    }

    /// Keep the transaction's changes
    pub fn commit_tx(&mut self) {
        self.journal = None;
    }

    /// Undo every change since [`begin_tx`](Self::begin_tx)
    pub fn rollback_tx(&mut self) {
        self.changes.clear();
        let Some(journal) = self.journal.take() else {
            return;
        };
        debug!(voters = journal.len(), "rolling back voting power changes");
        for (id, prior) in journal {
            self.remove(&id);
            if let Some(vp) = prior {
                self.insert(vp);
            }
        }
    }

    fn record(&mut self, id: &AccountId) {
        if let Some(journal) = self.journal.as_mut() {
            journal
                .entry(*id)
                .or_insert_with(|| self.voters.get(id).cloned());
        }
    }

    /// Fold staged deltas into the ranking and rewrite touched buckets
    ///
    /// Returns the number of voters changed.
    pub fn apply<S: DataSetter + ?Sized>(&mut self, s: &mut S) -> Result<usize> {
        let changes = std::mem::take(&mut self.changes);
        let mut touched = BTreeSet::new();
        let mut applied = 0;

        for (id, delta) in changes {
            if delta.amount.is_zero() {
                continue;
            }
            let current = self
                .voters
                .get(&id)
                .map(|vp| BigInt::from_biguint(Sign::Plus, vp.power.clone()))
                .unwrap_or_default();
            let updated = current + &delta.amount;
            if updated.is_negative() {
                return Err(GovernanceError::Corrupted(format!(
                    "negative voting power for {}",
                    id
                )));
            }
            let power = updated.magnitude().clone();
            touched.extend(self.update(id, delta.addr, power));
            applied += 1;
        }

        for index in touched {
            self.write_bucket(s, index)?;
        }
        Ok(applied)
    }

    /// Set the power of `id`, returning the buckets that changed
    fn update(&mut self, id: AccountId, addr: Address, power: Amount) -> Vec<u8> {
        let index = bucket_index(&id);
        if let Some(existing) = self.remove(&id) {
            if !power.is_zero() {
                self.insert(VotingPower::new(id, existing.addr, power));
            }
            return vec![index];
        }
        if power.is_zero() {
            return Vec::new();
        }

        let mut touched = vec![index];
        if self.voters.len() >= self.max {
            match self.lowest().cloned() {
                Some(lowest) if power > lowest.power => {
                    debug!(evicted = %lowest.id, power = %lowest.power, "evict lowest voter");
                    self.remove(&lowest.id);
                    touched.push(bucket_index(&lowest.id));
                }
                _ => {
                    warn!(%id, %power, "voting power rank full, voter rejected");
                    return Vec::new();
                }
            }
        }
        self.insert(VotingPower::new(id, addr, power));
        touched
    }

    fn insert(&mut self, vp: VotingPower) {
        self.record(&vp.id);
        self.total_power += &vp.power;
        self.ranking.insert(vp.rank_key());
        self.buckets
            .entry(bucket_index(&vp.id))
            .or_default()
            .insert(Reverse(vp.id));
        self.voters.insert(vp.id, vp);
    }

    fn remove(&mut self, id: &AccountId) -> Option<VotingPower> {
        self.record(id);
        let vp = self.voters.remove(id)?;
        self.total_power -= &vp.power;
        self.ranking.remove(&vp.rank_key());
        let index = bucket_index(id);
        if let Some(bucket) = self.buckets.get_mut(&index) {
            bucket.remove(&Reverse(*id));
            if bucket.is_empty() {
                self.buckets.remove(&index);
            }
        }
        Some(vp)
    }

    fn bucket(&self, index: u8) -> impl Iterator<Item = &VotingPower> {
        self.buckets
            .get(&index)
            .into_iter()
            .flat_map(|bucket| bucket.iter())
            .filter_map(|Reverse(id)| self.voters.get(id))
    }

    fn write_bucket<S: DataSetter + ?Sized>(&self, s: &mut S, index: u8) -> Result<()> {
        let mut data = Vec::new();
        for vp in self.bucket(index) {
            data.extend_from_slice(&vp.marshal()?);
        }
        s.set_data(&keys::vpr_bucket_key(index), &data)
    }

    /// Draw a reward winner with probability proportional to power
    pub fn pick_voting_reward_winner(&self, seed: i64) -> Result<Address> {
        if self.total_power.is_zero() {
            return Err(GovernanceError::NoVotingRewardWinner);
        }
        let mut rng = ChaCha20Rng::seed_from_u64(seed as u64);
        let mut r = rng.gen_biguint_below(&self.total_power);
        for index in 0..VPR_BUCKETS {
            for vp in self.bucket(index) {
                if r < vp.power {
                    debug!(total = %self.total_power, winner = %vp.addr, "pick voting reward winner");
                    return Ok(vp.addr.clone());
                }
                r -= &vp.power;
            }
        }
        Err(GovernanceError::NoVotingRewardWinner)
    }

    /// JSON list of the top `n` voters, all of them when `n` is 0
    pub fn dump_rankers(&self, n: usize) -> Result<String> {
        let entries: Vec<RankerEntry> = self
            .rankers(n)
            .into_iter()
            .map(|vp| RankerEntry {
                address: vp.addr.encode(),
                power: vp.power.to_string(),
            })
            .collect();
        Ok(serde_json::to_string(&entries)?)
    }
}
