//! Persisted key layout of the system account namespace

/// `staking` ‖ account
pub const STAKING_PREFIX: &[u8] = b"staking";
/// Aggregate of all staked amounts
pub const STAKING_TOTAL_KEY: &[u8] = b"stakingtotal";
/// `vote` ‖ issue ‖ voter
pub const VOTE_PREFIX: &[u8] = b"vote";
/// `sort` ‖ issue
pub const SORT_PREFIX: &[u8] = b"sort";
/// `total` ‖ issue
pub const TOTAL_PREFIX: &[u8] = b"total";
pub const PARAM_PREFIX: &str = "param";
pub const PROPOSAL_PREFIX: &str = "proposal";
pub const VPR_PREFIX: &[u8] = b"VotingPowerBucket/";

/// Issue key of the block producer election
pub const BP_ISSUE_KEY: &[u8] = b"voteBP";

fn concat(parts: &[&[u8]]) -> Vec<u8> {
    parts.concat()
}

pub fn staking_key(account: &[u8]) -> Vec<u8> {
    concat(&[STAKING_PREFIX, account])
}

pub fn vote_key(issue: &[u8], voter: &[u8]) -> Vec<u8> {
    concat(&[VOTE_PREFIX, issue, voter])
}

pub fn sort_key(issue: &[u8]) -> Vec<u8> {
    concat(&[SORT_PREFIX, issue])
}

pub fn total_key(issue: &[u8]) -> Vec<u8> {
    concat(&[TOTAL_PREFIX, issue])
}

/// `param\<UPPER-ID>`
pub fn param_key(id: &str) -> Vec<u8> {
    format!("{}\\{}", PARAM_PREFIX, id.to_uppercase()).into_bytes()
}

/// `proposal\<UPPER-ID>`, also the issue key of a DAO vote
pub fn proposal_key(id: &str) -> Vec<u8> {
    format!("{}\\{}", PROPOSAL_PREFIX, id.to_uppercase()).into_bytes()
}

pub fn vpr_bucket_key(index: u8) -> Vec<u8> {
    concat(&[VPR_PREFIX, index.to_string().as_bytes()])
}
