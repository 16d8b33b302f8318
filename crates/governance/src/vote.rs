//! Vote records and their encodings
//!
//! A vote is stored once per `(issue, voter)`. BP election votes and DAO
//! votes share the record shape but not the byte layout:
//!
//! - **BP**: concatenated 39-byte peer IDs, then the amount. The split point
//!   is the largest multiple of 39 in the record length.
//! - **DAO**: 8-byte little-endian candidate length, the JSON candidate
//!   list, then the amount.

use crate::error::{GovernanceError, Result};
use crate::keys;
use crate::store::{get_nonempty, DataGetter, DataSetter};
use crate::types::{amount_from_bytes, amount_to_bytes, Amount, BlockNo};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Length of a block producer peer ID
pub const PEER_ID_LENGTH: usize = 39;

/// Minimum blocks between two votes of one account
pub const VOTING_DELAY: BlockNo = 60 * 60 * 24;

/// Maximum peer IDs in one BP vote
pub const MAX_CANDIDATES: usize = 30;

/// Last vote cast by one voter on one issue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Encoded candidate set
    pub candidate: Vec<u8>,

    /// Stake backing the vote
    pub amount: Amount,
}

impl Vote {
    pub fn new(candidate: Vec<u8>, amount: Amount) -> Self {
        Self { candidate, amount }
    }
}

/// Byte layout of votes on one issue
pub trait VoteCodec {
    fn serialize(&self, vote: &Vote) -> Vec<u8>;

    fn deserialize(&self, data: &[u8]) -> Result<Vote>;

    /// Tally keys named by a vote
    fn candidates(&self, vote: &Vote) -> Result<Vec<Vec<u8>>>;
}

/// Vote encoding of an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteEncoding {
    Bp,
    Dao,
}

impl VoteEncoding {
    pub fn of(issue_key: &[u8]) -> Self {
        if issue_key == keys::BP_ISSUE_KEY {
            VoteEncoding::Bp
        } else {
            VoteEncoding::Dao
        }
    }

    pub fn is_dao(&self) -> bool {
        matches!(self, VoteEncoding::Dao)
    }
}

impl VoteCodec for VoteEncoding {
    fn serialize(&self, vote: &Vote) -> Vec<u8> {
        let mut out = Vec::with_capacity(vote.candidate.len() + 16);
        if let VoteEncoding::Dao = self {
            out.extend_from_slice(&(vote.candidate.len() as u64).to_le_bytes());
        }
        out.extend_from_slice(&vote.candidate);
        out.extend_from_slice(&amount_to_bytes(&vote.amount));
        out
    }

    fn deserialize(&self, data: &[u8]) -> Result<Vote> {
        match self {
            VoteEncoding::Bp => {
                let split = data.len() - data.len() % PEER_ID_LENGTH;
                Ok(Vote {
                    candidate: data[..split].to_vec(),
                    amount: amount_from_bytes(&data[split..]),
                })
            }
            VoteEncoding::Dao => {
                if data.len() < 8 {
                    return Err(GovernanceError::Corrupted("short dao vote".into()));
                }
                let mut size = [0u8; 8];
                size.copy_from_slice(&data[..8]);
                let end = usize::try_from(u64::from_le_bytes(size))
                    .ok()
                    .and_then(|size| size.checked_add(8))
                    .filter(|end| *end <= data.len())
                    .ok_or_else(|| GovernanceError::Corrupted("dao vote length".into()))?;
                Ok(Vote {
                    candidate: data[8..end].to_vec(),
                    amount: amount_from_bytes(&data[end..]),
                })
            }
        }
    }

    fn candidates(&self, vote: &Vote) -> Result<Vec<Vec<u8>>> {
        match self {
            VoteEncoding::Bp => {
                if vote.candidate.len() % PEER_ID_LENGTH != 0 {
                    return Err(GovernanceError::Corrupted("voting data corruption".into()));
                }
                Ok(vote
                    .candidate
                    .chunks(PEER_ID_LENGTH)
                    .map(|peer| peer.to_vec())
                    .collect())
            }
            VoteEncoding::Dao => {
                if vote.candidate.is_empty() {
                    return Ok(Vec::new());
                }
                let list: Vec<String> = serde_json::from_slice(&vote.candidate)
                    .map_err(|e| GovernanceError::Corrupted(format!("dao vote candidate: {}", e)))?;
                Ok(list.into_iter().map(String::into_bytes).collect())
            }
        }
    }
}

/// Vote of `voter` on `issue`, `None` if never cast
pub fn get_vote<G: DataGetter + ?Sized>(g: &G, issue: &[u8], voter: &[u8]) -> Result<Option<Vote>> {
    match get_nonempty(g, &keys::vote_key(issue, voter))? {
        Some(data) => VoteEncoding::of(issue).deserialize(&data).map(Some),
        None => Ok(None),
    }
}

pub fn set_vote<S: DataSetter + ?Sized>(s: &mut S, issue: &[u8], voter: &[u8], vote: &Vote) -> Result<()> {
    let data = VoteEncoding::of(issue).serialize(vote);
    s.set_data(&keys::vote_key(issue, voter), &data)
}

/// Descending by amount, ties by candidate ascending
pub fn vote_order(a: &Vote, b: &Vote) -> Ordering {
    b.amount
        .cmp(&a.amount)
        .then_with(|| a.candidate.cmp(&b.candidate))
}

/// Each vote prefixed by its 8-byte little-endian length
pub fn serialize_vote_list(votes: &[Vote], encoding: VoteEncoding) -> Vec<u8> {
    let mut out = Vec::new();
    for vote in votes {
        let data = encoding.serialize(vote);
        out.extend_from_slice(&(data.len() as u64).to_le_bytes());
        out.extend_from_slice(&data);
    }
    out
}

pub fn deserialize_vote_list(data: &[u8], encoding: VoteEncoding) -> Result<Vec<Vote>> {
    let mut votes = Vec::new();
    let mut offset = 0usize;
    while offset < data.len() {
        let header_end = offset + 8;
        if header_end > data.len() {
            return Err(GovernanceError::Corrupted("vote list header".into()));
        }
        let mut size = [0u8; 8];
        size.copy_from_slice(&data[offset..header_end]);
        let end = usize::try_from(u64::from_le_bytes(size))
            .ok()
            .and_then(|size| header_end.checked_add(size))
            .filter(|end| *end <= data.len())
            .ok_or_else(|| GovernanceError::Corrupted("vote list entry".into()))?;
        votes.push(encoding.deserialize(&data[header_end..end])?);
        offset = end;
    }
    Ok(votes)
}

/// Split a BP vote argument list into raw peer IDs
///
/// Arguments must be unique base58 strings decoding to exactly
/// [`PEER_ID_LENGTH`] bytes, at most [`MAX_CANDIDATES`] of them.
pub fn decode_peer_ids(args: &[String]) -> Result<Vec<u8>> {
    if args.len() > MAX_CANDIDATES {
        return Err(GovernanceError::TxInvalidPayload);
    }
    let mut seen = std::collections::BTreeSet::new();
    let mut candidate = Vec::with_capacity(args.len() * PEER_ID_LENGTH);
    for arg in args {
        if !seen.insert(arg.as_str()) {
            return Err(GovernanceError::TxInvalidPayload);
        }
        let peer = bs58::decode(arg)
            .into_vec()
            .map_err(|_| GovernanceError::TxInvalidPayload)?;
        if peer.len() != PEER_ID_LENGTH {
            return Err(GovernanceError::TxInvalidPayload);
        }
        candidate.extend_from_slice(&peer);
    }
    Ok(candidate)
}
