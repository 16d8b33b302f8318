//! Governance commands
//!
//! Each operation has a command built from a validated
//! [`SystemContext`]. Construction resolves everything the command needs
//! from state; [`SysCmd::run`] performs the writes and yields one event.
//!
//! ## Dispatch
//!
//! [`execute_system_tx`] validates the transaction, looks the constructor up
//! in the operation table, builds the command and runs it. Errors propagate
//! unchanged; the caller rolls back the transaction's writes.

mod proposal;
mod stake;
mod unstake;
mod vote;

pub use proposal::ProposalCmd;
pub use stake::StakeCmd;
pub use unstake::{refresh_all_votes, UnstakeCmd};
pub use vote::VoteCmd;

use crate::context::{Env, SystemContext};
use crate::error::{GovernanceError, Result};
use crate::event::Event;
use crate::fork::vpr_repeat;
use crate::payload::OpSysTx;
use crate::store::Backend;
use crate::types::{AccountState, Amount, BlockInfo, TxBody};
use crate::vote::Vote;
use crate::vote_result::VoteResult;
use tracing::debug;

/// A runnable governance command
pub trait SysCmd {
    fn run(&mut self) -> Result<Event>;
}

type SysCmdCtor<'a, B> = fn(SystemContext<'a, B>) -> Result<Box<dyn SysCmd + 'a>>;

/// Constructor of each operation
fn ctor<'a, B: Backend + 'a>(op: OpSysTx) -> SysCmdCtor<'a, B> {
    match op {
        OpSysTx::Stake => StakeCmd::boxed,
        OpSysTx::Unstake => UnstakeCmd::boxed,
        OpSysTx::VoteBp | OpSysTx::VoteDao => VoteCmd::boxed,
        OpSysTx::CreateProposal => ProposalCmd::boxed,
    }
}

/// Validate `tx` and build its command
pub fn new_sys_cmd<'a, B: Backend + 'a>(
    env: Env<'a, B>,
    tx: &'a TxBody,
    sender: &'a mut AccountState,
    receiver: &'a mut AccountState,
    block: BlockInfo,
) -> Result<Box<dyn SysCmd + 'a>> {
    let ctx = SystemContext::new(env, tx, sender, receiver, block)?;
    ctor(ctx.op())(ctx)
}

/// Execute one governance transaction
pub fn execute_system_tx<B: Backend>(
    env: Env<'_, B>,
    tx: &TxBody,
    sender: &mut AccountState,
    receiver: &mut AccountState,
    block: BlockInfo,
) -> Result<Vec<Event>> {
    let mut cmd = new_sys_cmd(env, tx, sender, receiver, block)?;
    let event = cmd.run()?;
    debug!(event = %event.event_name, block_no = block.no, "executed governance tx");
    Ok(vec![event])
}

/// Moves one vote in and out of an issue's tally and, from fork 2, the
/// sender's voting power
pub(crate) struct VprCmd {
    result: VoteResult,
}

impl VprCmd {
    pub(crate) fn new(result: VoteResult) -> Self {
        Self { result }
    }

    pub(crate) fn sub<B: Backend>(&mut self, ctx: &mut SystemContext<'_, B>, vote: &Vote) -> Result<()> {
        if ctx.fork.tracks_voting_power() {
            let id = ctx.sender.id();
            for _ in 0..vpr_repeat(ctx.block.no, &id) {
                ctx.env.vpr.sub(id, ctx.sender.address(), &vote.amount);
            }
        }
        self.result.sub_vote(vote)
    }

    pub(crate) fn add<B: Backend>(&mut self, ctx: &mut SystemContext<'_, B>, vote: &Vote) -> Result<()> {
        if ctx.fork.tracks_voting_power() {
            let id = ctx.sender.id();
            for _ in 0..vpr_repeat(ctx.block.no, &id) {
                ctx.env.vpr.add(id, ctx.sender.address(), &vote.amount);
            }
        }
        self.result.add_vote(vote)
    }

    /// Fold the voting power deltas and persist the tally
    pub(crate) fn apply<B: Backend>(&self, ctx: &mut SystemContext<'_, B>) -> Result<()> {
        let changed = ctx.env.vpr.apply(&mut *ctx.env.scs)?;
        if changed > 0 {
            debug!(changed, total = %ctx.env.vpr.total_power(), "applied voting power");
        }
        self.result.sync(&mut *ctx.env.scs, ctx.env.params)?;
        Ok(())
    }
}

/// Move `amount` from `from` to `to`
pub(crate) fn transfer(from: &mut AccountState, to: &mut AccountState, amount: &Amount) -> Result<()> {
    from.sub_balance(amount)?;
    to.add_balance(amount);
    Ok(())
}

/// Return `amount` from the system account, whose shortfall means corruption
pub(crate) fn refund(system: &mut AccountState, to: &mut AccountState, amount: &Amount) -> Result<()> {
    system.sub_balance(amount).map_err(|_| {
        GovernanceError::Corrupted(format!("system account balance below {}", amount))
    })?;
    to.add_balance(amount);
    Ok(())
}
