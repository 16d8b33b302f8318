//! Read-only queries served to RPC

use crate::error::{GovernanceError, Result};
use crate::proposal::Issue;
use crate::staking::{get_staking, Staking};
use crate::store::DataGetter;
use crate::types::AccountId;
use crate::vote::{get_vote, PEER_ID_LENGTH};
use serde::{Deserialize, Serialize};

/// One account's vote on one issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteInfo {
    /// Issue ID, `voteBP` or the upper-case parameter ID
    #[serde(rename = "Id")]
    pub id: String,

    /// Base58 peer IDs for BP votes, chosen values for DAO votes
    #[serde(rename = "Candidates")]
    pub candidates: Vec<String>,

    /// Decimal amount backing the vote
    #[serde(rename = "Amount")]
    pub amount: String,
}

/// Votes cast by `account` across the voting catalog
///
/// Keyed by the same account ID execution writes under; callers holding an
/// address derive it with [`Address::account_id`](crate::types::Address::account_id).
pub fn get_votes<G: DataGetter + ?Sized>(g: &G, account: &AccountId) -> Result<Vec<VoteInfo>> {
    let mut votes = Vec::new();

    for issue in Issue::catalog() {
        let Some(vote) = get_vote(g, &issue.key(), account.as_bytes())? else {
            continue;
        };
        let candidates = match issue {
            Issue::Bp => vote
                .candidate
                .chunks(PEER_ID_LENGTH)
                .map(|peer| bs58::encode(peer).into_string())
                .collect(),
            Issue::Dao(_) => serde_json::from_slice(&vote.candidate).map_err(|e| {
                GovernanceError::Corrupted(format!(
                    "{}: {}",
                    e,
                    String::from_utf8_lossy(&vote.candidate)
                ))
            })?,
        };
        votes.push(VoteInfo {
            id: issue.id(),
            candidates,
            amount: vote.amount.to_string(),
        });
    }
    Ok(votes)
}

/// Staking record of `account`
pub fn get_account_staking<G: DataGetter + ?Sized>(g: &G, account: &AccountId) -> Result<Staking> {
    get_staking(g, account.as_bytes())
}
