//! Per-issue vote tally
//!
//! The tally maps each candidate to the sum of the amounts of all current
//! votes naming it. The sorted list persisted under `sort` ‖ issue is the
//! canonical read surface (consensus picks block producers from it); it is
//! regenerated from the tally on every sync. DAO issues additionally keep
//! the sum of all vote amounts under `total` ‖ issue.

use crate::error::{GovernanceError, Result};
use crate::keys;
use crate::params::{parse_decimal, SystemParams};
use crate::proposal::Issue;
use crate::staking::get_staking_total;
use crate::store::{get_nonempty, DataGetter, DataSetter};
use crate::types::{amount_from_bytes, amount_to_bytes, Amount};
use crate::vote::{
    deserialize_vote_list, serialize_vote_list, vote_order, Vote, VoteCodec, VoteEncoding,
    PEER_ID_LENGTH,
};
use num_bigint::BigUint;
use num_traits::Zero;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// A winner needs `staking_total / (power / 100)` at or below this
const THRESHOLD_RATIO: u32 = 150;

/// Tally of one issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteResult {
    issue: Issue,
    tally: BTreeMap<Vec<u8>, Amount>,
    total: Amount,
}

impl VoteResult {
    pub fn new(issue: Issue) -> Self {
        Self {
            issue,
            tally: BTreeMap::new(),
            total: Amount::zero(),
        }
    }

    /// Rebuild the tally from the persisted sorted list
    pub fn load<G: DataGetter + ?Sized>(g: &G, issue: Issue) -> Result<Self> {
        let key = issue.key();
        let encoding = VoteEncoding::of(&key);
        let mut result = Self::new(issue);
        if let Some(data) = get_nonempty(g, &keys::sort_key(&key))? {
            for vote in deserialize_vote_list(&data, encoding)? {
                result.tally.insert(vote.candidate, vote.amount);
            }
        }
        if encoding.is_dao() {
            if let Some(total) = g.get_data(&keys::total_key(&key))? {
                result.total = amount_from_bytes(&total);
            }
        }
        Ok(result)
    }

    pub fn issue(&self) -> Issue {
        self.issue
    }

    fn encoding(&self) -> VoteEncoding {
        match self.issue {
            Issue::Bp => VoteEncoding::Bp,
            Issue::Dao(_) => VoteEncoding::Dao,
        }
    }

    /// Sum of all vote amounts, DAO issues only
    pub fn total(&self) -> &Amount {
        &self.total
    }

    pub fn amount_of(&self, candidate: &[u8]) -> Amount {
        self.tally.get(candidate).cloned().unwrap_or_default()
    }

    pub fn tally(&self) -> &BTreeMap<Vec<u8>, Amount> {
        &self.tally
    }

    pub fn add_vote(&mut self, vote: &Vote) -> Result<()> {
        for candidate in self.encoding().candidates(vote)? {
            *self.tally.entry(candidate).or_default() += &vote.amount;
        }
        if self.issue.is_dao() {
            self.total += &vote.amount;
        }
        Ok(())
    }

    pub fn sub_vote(&mut self, vote: &Vote) -> Result<()> {
        for candidate in self.encoding().candidates(vote)? {
            let current = self.tally.entry(candidate).or_default();
            if *current < vote.amount {
                return Err(GovernanceError::Corrupted(format!(
                    "tally of {} below vote amount",
                    self.issue.id()
                )));
            }
            *current -= &vote.amount;
        }
        if self.issue.is_dao() {
            if self.total < vote.amount {
                return Err(GovernanceError::Corrupted(format!(
                    "total of {} below vote amount",
                    self.issue.id()
                )));
            }
            self.total -= &vote.amount;
        }
        Ok(())
    }

    /// Sorted projection of the tally
    pub fn build_vote_list(&self) -> Vec<Vote> {
        let mut votes: Vec<Vote> = self
            .tally
            .iter()
            .map(|(candidate, amount)| Vote::new(candidate.clone(), amount.clone()))
            .collect();
        votes.sort_by(vote_order);
        votes
    }

    /// Persist the sorted list, and for DAO issues the total and any winner
    ///
    /// Returns the parameter value staged for the next block when the top
    /// candidate crossed the threshold.
    pub fn sync<S>(&self, s: &mut S, params: &SystemParams) -> Result<Option<Amount>>
    where
        S: DataGetter + DataSetter + ?Sized,
    {
        let key = self.issue.key();
        let list = self.build_vote_list();
        let mut winner = None;

        if let Issue::Dao(param) = self.issue {
            if let Some(top) = list.first() {
                let runner_up = list.get(1).map(|v| &v.amount);
                let staking_total = get_staking_total(&*s)?;
                if beats(&top.amount, runner_up) && threshold(&staking_total, &top.amount) {
                    let text = String::from_utf8_lossy(&top.candidate);
                    let value = parse_decimal(&text).ok_or_else(|| {
                        GovernanceError::Corrupted(format!("abnormal winner is in vote {}", param))
                    })?;
                    info!(%param, value = %value, power = %top.amount, "proposal passed");
                    params.update(s, param, value.clone())?;
                    winner = Some(value);
                }
            }
            s.set_data(&keys::total_key(&key), &amount_to_bytes(&self.total))?;
        }

        debug!(issue = %self.issue.id(), entries = list.len(), "sync vote result");
        s.set_data(&keys::sort_key(&key), &serialize_vote_list(&list, self.encoding()))?;
        Ok(winner)
    }
}

fn beats(top: &Amount, runner_up: Option<&Amount>) -> bool {
    runner_up.map_or(true, |second| top > second)
}

/// Whether `power` holds roughly two thirds of all stake
pub fn threshold(staking_total: &Amount, power: &Amount) -> bool {
    if power.is_zero() {
        return false;
    }
    let unit = power / BigUint::from(100u32);
    if unit.is_zero() {
        return false;
    }
    staking_total / unit <= BigUint::from(THRESHOLD_RATIO)
}

/// Write the genesis BP tally, keyed by base58 peer ID
pub fn init_vote_result<S>(s: &mut S, tally: &BTreeMap<String, Amount>, params: &SystemParams) -> Result<()>
where
    S: DataGetter + DataSetter + ?Sized,
{
    let mut result = VoteResult::new(Issue::Bp);
    for (peer, amount) in tally {
        let candidate = bs58::decode(peer)
            .into_vec()
            .map_err(|_| GovernanceError::TxInvalidPayload)?;
        if candidate.len() != PEER_ID_LENGTH {
            return Err(GovernanceError::TxInvalidPayload);
        }
        result.tally.insert(candidate, amount.clone());
    }
    result.sync(s, params)?;
    Ok(())
}

/// Top `n` entries of the persisted sorted list of `issue`
pub fn get_vote_result<G: DataGetter + ?Sized>(g: &G, issue: Issue, n: usize) -> Result<Vec<Vote>> {
    let key = issue.key();
    let mut votes = match get_nonempty(g, &keys::sort_key(&key))? {
        Some(data) => deserialize_vote_list(&data, VoteEncoding::of(&key))?,
        None => Vec::new(),
    };
    votes.truncate(n);
    Ok(votes)
}

/// Base58 peer IDs of the top `n` block producer candidates
pub fn get_rankers<G: DataGetter + ?Sized>(g: &G, n: usize) -> Result<Vec<String>> {
    Ok(get_vote_result(g, Issue::Bp, n)?
        .into_iter()
        .map(|vote| bs58::encode(vote.candidate).into_string())
        .collect())
}

/// Candidates ordered by votes, from a base58-keyed tally
pub fn build_ordered_candidates(tally: &BTreeMap<String, Amount>) -> Vec<String> {
    let mut votes: Vec<Vote> = tally
        .iter()
        .filter_map(|(peer, amount)| match bs58::decode(peer).into_vec() {
            Ok(candidate) => Some(Vote::new(candidate, amount.clone())),
            Err(err) => {
                warn!(%peer, error = %err, "skipping undecodable candidate");
                None
            }
        })
        .collect();
    votes.sort_by(vote_order);
    votes
        .into_iter()
        .map(|vote| bs58::encode(vote.candidate).into_string())
        .collect()
}
