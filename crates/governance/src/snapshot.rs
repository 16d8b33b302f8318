//! Block-level governance controller
//!
//! [`Governance`] binds the in-memory projections (parameter registry and
//! voting power rank) to the durable contract state and keeps them
//! consistent across the block lifecycle.
//!
//! ## Lifecycle
//!
//! - [`execute`](Governance::execute) runs one transaction atomically: on
//!   error its state writes, VPR changes, staged parameters and balance
//!   moves are all undone.
//! - [`commit_block`](Governance::commit_block) flushes the block's writes
//!   and publishes pending parameter values.
//! - [`revert_block`](Governance::revert_block) drops the block.
//! - [`reorg`](Governance::reorg) rebuilds every projection from durable
//!   state.

use crate::command::execute_system_tx;
use crate::config::GovernanceConfig;
use crate::context::Env;
use crate::error::Result;
use crate::event::Event;
use crate::params::SystemParams;
use crate::proposal::{Issue, ProposalCatalog};
use crate::query::{get_account_staking, get_votes, VoteInfo};
use crate::staking::{get_staking_total, Staking};
use crate::store::{Backend, ContractState, MemoryBackend};
use crate::types::{AccountId, AccountState, Amount, BlockInfo, TxBody};
use crate::vote::Vote;
use crate::vote_result::{get_rankers, get_vote_result, init_vote_result};
use crate::vpr::Vpr;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Governance state of one chain
pub struct Governance<B: Backend = MemoryBackend> {
    config: GovernanceConfig,

    /// Shared with RPC readers
    params: Arc<SystemParams>,

    proposals: ProposalCatalog,

    state: ContractState<B>,

    /// VPR as of the last committed block
    vpr_before: Vpr,

    /// VPR including this block's transactions
    vpr_after: Vpr,
}

impl Governance<MemoryBackend> {
    /// Governance over a fresh in-memory store
    pub fn in_memory(config: GovernanceConfig) -> Result<Self> {
        Self::new(config, MemoryBackend::new())
    }
}

impl<B: Backend> Governance<B> {
    pub fn new(config: GovernanceConfig, backend: B) -> Result<Self> {
        config.validate()?;
        let state = ContractState::new(backend);
        let params = Arc::new(SystemParams::load(&state, config.param_defaults()?)?);
        let vpr = Vpr::load(&state, config.vpr_max)?;
        let proposals = config.catalog();

        info!(
            bp_count = params.bp_count(),
            proposals = proposals.len(),
            voters = vpr.len(),
            "governance initialized"
        );
        Ok(Self {
            config,
            params,
            proposals,
            state,
            vpr_before: vpr.clone(),
            vpr_after: vpr,
        })
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    /// Handle on the parameter registry for readers outside block execution
    pub fn params(&self) -> Arc<SystemParams> {
        Arc::clone(&self.params)
    }

    pub fn proposals(&self) -> &ProposalCatalog {
        &self.proposals
    }

    pub fn state(&self) -> &ContractState<B> {
        &self.state
    }

    /// Voting power rank including uncommitted transactions
    pub fn vpr(&self) -> &Vpr {
        &self.vpr_after
    }

    /// Write the genesis BP tally
    pub fn init_vote_result(&mut self, tally: &BTreeMap<String, Amount>) -> Result<()> {
        init_vote_result(&mut self.state, tally, &self.params)
    }

    /// Execute one governance transaction atomically
    pub fn execute(
        &mut self,
        tx: &TxBody,
        sender: &mut AccountState,
        receiver: &mut AccountState,
        block: BlockInfo,
    ) -> Result<Vec<Event>> {
        let sender_balance = sender.balance().clone();
        let receiver_balance = receiver.balance().clone();
        let params_before = self.params.snapshot();

        self.state.begin_tx();
        self.vpr_after.begin_tx();
        let env = Env {
            scs: &mut self.state,
            params: &self.params,
            proposals: &self.proposals,
            vpr: &mut self.vpr_after,
        };
        match execute_system_tx(env, tx, sender, receiver, block) {
            Ok(events) => {
                self.state.commit_tx();
                self.vpr_after.commit_tx();
                Ok(events)
            }
            Err(err) => {
                self.state.rollback_tx();
                self.vpr_after.rollback_tx();
                self.params.restore(params_before);
                sender.set_balance(sender_balance);
                receiver.set_balance(receiver_balance);
                debug!(error = %err, block_no = block.no, "governance tx rejected");
                Err(err)
            }
        }
    }

    /// Flush the block and publish pending parameters
    pub fn commit_block(&mut self) -> Result<()> {
        self.state.apply()?;
        self.params.commit(true);
        self.vpr_before = self.vpr_after.clone();
        info!(
            voters = self.vpr_after.len(),
            total_power = %self.vpr_after.total_power(),
            "governance block committed"
        );
        Ok(())
    }

    /// Drop the block's writes and pending parameters
    pub fn revert_block(&mut self) {
        self.state.discard();
        self.params.commit(false);
        self.vpr_after = self.vpr_before.clone();
        info!("governance block reverted");
    }

    /// Rebuild every projection from durable state
    pub fn reorg(&mut self) -> Result<()> {
        self.state.discard();
        self.params.reload(&self.state)?;
        let vpr = Vpr::load(&self.state, self.config.vpr_max)?;
        self.vpr_before = vpr.clone();
        self.vpr_after = vpr;
        info!(voters = self.vpr_after.len(), "governance reloaded after reorg");
        Ok(())
    }

    pub fn staking_of(&self, account: &AccountId) -> Result<Staking> {
        get_account_staking(&self.state, account)
    }

    pub fn staking_total(&self) -> Result<Amount> {
        get_staking_total(&self.state)
    }

    pub fn votes_of(&self, account: &AccountId) -> Result<Vec<VoteInfo>> {
        get_votes(&self.state, account)
    }

    /// Top `n` entries of an issue's sorted list
    pub fn vote_result(&self, issue: Issue, n: usize) -> Result<Vec<Vote>> {
        get_vote_result(&self.state, issue, n)
    }

    /// Base58 IDs of the top `n` block producer candidates
    pub fn bp_rankers(&self, n: usize) -> Result<Vec<String>> {
        get_rankers(&self.state, n)
    }

    /// Current BPCOUNT
    pub fn bp_count(&self) -> u64 {
        self.params.bp_count()
    }
}
