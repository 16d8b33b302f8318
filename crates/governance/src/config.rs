//! Governance configuration (from YAML file)
//!
//! ```yaml
//! bp_count: 23
//! vpr_max: 50000
//! proposals:
//!   - ID: BPCOUNT
//!     MultipleChoice: 1
//!   - ID: GASPRICE
//!     Blockfrom: 100
//!     Blockto: 0
//!     MultipleChoice: 1
//!     Candidates: ["50000000000", "100000000000"]
//! ```

use crate::error::{GovernanceError, Result};
use crate::params::{ParamDefaults, ParamId, MAX_BP_COUNT};
use crate::proposal::{Proposal, ProposalCatalog};
use crate::vpr::VPR_MAX;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// BPCOUNT default, supplied by the consensus configuration
    #[serde(default = "default_bp_count")]
    pub bp_count: u64,

    /// Fixed proposal catalog
    #[serde(default = "default_proposals")]
    pub proposals: Vec<Proposal>,

    /// Maximum number of ranked voters
    #[serde(default = "default_vpr_max")]
    pub vpr_max: usize,
}

fn default_bp_count() -> u64 {
    3
}

fn default_proposals() -> Vec<Proposal> {
    ParamId::ALL.into_iter().map(Proposal::for_param).collect()
}

fn default_vpr_max() -> usize {
    VPR_MAX
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            bp_count: default_bp_count(),
            proposals: default_proposals(),
            vpr_max: default_vpr_max(),
        }
    }
}

impl GovernanceConfig {
    pub fn with_bp_count(bp_count: u64) -> Self {
        Self {
            bp_count,
            ..Self::default()
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = Self::from_yaml_str(&std::fs::read_to_string(path)?)?;
        info!(
            path = %path.display(),
            bp_count = config.bp_count,
            proposals = config.proposals.len(),
            "loaded governance config"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bp_count == 0 || self.bp_count > MAX_BP_COUNT {
            return Err(GovernanceError::InvalidConfig(format!(
                "bp_count {} outside 1..={}",
                self.bp_count, MAX_BP_COUNT
            )));
        }
        if self.vpr_max == 0 {
            return Err(GovernanceError::InvalidConfig("vpr_max must be positive".into()));
        }

        let mut seen = BTreeSet::new();
        for proposal in &self.proposals {
            let param = proposal.param().ok_or_else(|| {
                GovernanceError::InvalidConfig(format!("unknown proposal {}", proposal.id))
            })?;
            if !seen.insert(param) {
                return Err(GovernanceError::InvalidConfig(format!(
                    "duplicate proposal {}",
                    param
                )));
            }
            if proposal.multiple_choice == 0 {
                return Err(GovernanceError::InvalidConfig(format!(
                    "proposal {} accepts no choice",
                    param
                )));
            }
        }
        self.param_defaults()?;
        Ok(())
    }

    /// Parameter defaults, with each proposal's `Default` taking precedence
    pub fn param_defaults(&self) -> Result<ParamDefaults> {
        let mut defaults = ParamDefaults::new(self.bp_count);
        for proposal in &self.proposals {
            let (Some(param), Some(value)) = (proposal.param(), proposal.default.as_deref()) else {
                continue;
            };
            let value = param.parse_value(value).map_err(|err| {
                GovernanceError::InvalidConfig(format!("proposal {} default {}: {}", param, value, err))
            })?;
            defaults.set(param, value);
        }
        Ok(defaults)
    }

    pub fn catalog(&self) -> ProposalCatalog {
        ProposalCatalog::new(self.proposals.iter().cloned())
    }
}
