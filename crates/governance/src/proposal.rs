//! Proposal catalog and voting issues
//!
//! A proposal binds a parameter ID to a voting window, a cap on the number
//! of candidates one vote may name, and an optional candidate whitelist.
//! The catalog is fixed at startup from configuration; proposals created by
//! transaction are persisted under `proposal\<ID>` and looked up from state.

use crate::error::{GovernanceError, Result};
use crate::keys;
use crate::params::ParamId;
use crate::store::{get_nonempty, DataGetter, DataSetter};
use crate::types::BlockNo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// DAO proposal descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Upper-case parameter ID
    #[serde(rename = "ID")]
    pub id: String,

    #[serde(rename = "Description", default)]
    pub description: String,

    /// First block accepting votes
    #[serde(rename = "Blockfrom", default)]
    pub blockfrom: BlockNo,

    /// Last block accepting votes, 0 for no end
    #[serde(rename = "Blockto", default)]
    pub blockto: BlockNo,

    /// Maximum number of candidates in one vote
    #[serde(rename = "MultipleChoice")]
    pub multiple_choice: u32,

    /// Whitelist of acceptable candidates, empty for any
    #[serde(rename = "Candidates", default)]
    pub candidates: Vec<String>,

    /// Value in force before any vote passes
    #[serde(rename = "Default", default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Proposal {
    /// Always-open, single-choice proposal for `param`
    pub fn for_param(param: ParamId) -> Self {
        Self {
            id: param.id().to_string(),
            description: String::new(),
            blockfrom: 0,
            blockto: 0,
            multiple_choice: 1,
            candidates: Vec::new(),
            default: None,
        }
    }

    /// `proposal\<ID>`, the persisted key and the vote issue key
    pub fn key(&self) -> Vec<u8> {
        keys::proposal_key(&self.id)
    }

    pub fn param(&self) -> Option<ParamId> {
        ParamId::parse(&self.id)
    }

    pub fn is_open(&self, block_no: BlockNo) -> Result<()> {
        if block_no < self.blockfrom {
            return Err(GovernanceError::VotingNotStarted(self.blockfrom));
        }
        if self.blockto != 0 && block_no > self.blockto {
            return Err(GovernanceError::VotingClosed(self.blockto));
        }
        Ok(())
    }

    /// Whether the window closed before `block_no`
    pub fn is_closed(&self, block_no: BlockNo) -> bool {
        self.blockto != 0 && self.blockto < block_no
    }

    /// Check every candidate against the whitelist
    pub fn check_whitelist(&self, candidates: &[String]) -> Result<()> {
        if self.candidates.is_empty() {
            return Ok(());
        }
        let mut sorted = self.candidates.clone();
        sorted.sort();
        for candidate in candidates {
            if sorted.binary_search(candidate).is_err() {
                return Err(GovernanceError::CandidateNotInWhitelist(sorted));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Something that can be voted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Issue {
    /// Block producer election
    Bp,
    /// Parameter proposal
    Dao(ParamId),
}

impl Issue {
    /// Every issue in voting catalog order
    pub fn catalog() -> Vec<Issue> {
        std::iter::once(Issue::Bp)
            .chain(ParamId::ALL.into_iter().map(Issue::Dao))
            .collect()
    }

    pub fn key(&self) -> Vec<u8> {
        match self {
            Issue::Bp => keys::BP_ISSUE_KEY.to_vec(),
            Issue::Dao(param) => keys::proposal_key(param.id()),
        }
    }

    pub fn id(&self) -> String {
        match self {
            Issue::Bp => String::from_utf8_lossy(keys::BP_ISSUE_KEY).into_owned(),
            Issue::Dao(param) => param.id().to_string(),
        }
    }

    pub fn is_dao(&self) -> bool {
        matches!(self, Issue::Dao(_))
    }
}

/// Proposals known at startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalCatalog {
    proposals: BTreeMap<String, Proposal>,
}

impl ProposalCatalog {
    pub fn new(proposals: impl IntoIterator<Item = Proposal>) -> Self {
        Self {
            proposals: proposals
                .into_iter()
                .map(|mut p| {
                    p.id = p.id.to_uppercase();
                    (p.id.clone(), p)
                })
                .collect(),
        }
    }

    /// One open proposal per parameter
    pub fn with_defaults() -> Self {
        Self::new(ParamId::ALL.into_iter().map(Proposal::for_param))
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    /// Catalog entry, else the persisted one
    pub fn get<G: DataGetter + ?Sized>(&self, g: &G, id: &str) -> Result<Option<Proposal>> {
        let id = id.to_uppercase();
        if let Some(proposal) = self.proposals.get(&id) {
            return Ok(Some(proposal.clone()));
        }
        get_proposal(g, &id)
    }

    pub fn contains<G: DataGetter + ?Sized>(&self, g: &G, id: &str) -> Result<bool> {
        Ok(self.get(g, id)?.is_some())
    }
}

pub fn get_proposal<G: DataGetter + ?Sized>(g: &G, id: &str) -> Result<Option<Proposal>> {
    match get_nonempty(g, &keys::proposal_key(id))? {
        Some(data) => serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| GovernanceError::Corrupted(format!("proposal {}: {}", id, e))),
        None => Ok(None),
    }
}

pub fn set_proposal<S: DataSetter + ?Sized>(s: &mut S, proposal: &Proposal) -> Result<()> {
    s.set_data(&proposal.key(), proposal.to_json()?.as_bytes())
}
