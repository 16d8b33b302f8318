use super::{SysCmd, VprCmd};
use crate::context::SystemContext;
use crate::error::{GovernanceError, Result};
use crate::event::{dao_vote_args, vote_event, Event};
use crate::payload::SysCall;
use crate::proposal::Issue;
use crate::store::Backend;
use crate::vote::{set_vote, Vote};
use crate::vote_result::VoteResult;
use tracing::debug;

/// Cast or replace the sender's vote on one issue
///
/// The vote carries the sender's whole stake. Voting also restarts the
/// sender's delay clock, so the staking record is rewritten even though its
/// amount is unchanged.
pub struct VoteCmd<'a, B: Backend> {
    ctx: SystemContext<'a, B>,
    issue: Issue,
    /// JSON event arguments
    args: String,
    new_vote: Vote,
    vpr: VprCmd,
}

impl<'a, B: Backend + 'a> VoteCmd<'a, B> {
    pub fn new(mut ctx: SystemContext<'a, B>) -> Result<Self> {
        let issue = ctx.issue.ok_or(GovernanceError::TxInvalidPayload)?;
        let (candidate, args) = match &ctx.payload.call {
            SysCall::VoteDao { args } => {
                let candidate = serde_json::to_vec(&args[1..])?;
                let id = args[0].as_str().ok_or(GovernanceError::InvalidProposalId(0))?;
                let value = args[1].as_str().ok_or(GovernanceError::InvalidCharacter)?;
                (candidate, dao_vote_args(id, value))
            }
            SysCall::VoteBp { candidate, .. } => (candidate.clone(), ctx.payload.call_info.args_json()?),
            _ => return Err(GovernanceError::TxInvalidPayload),
        };

        ctx.staked.when = ctx.block.no;
        if ctx.staked.is_empty() {
            return Err(GovernanceError::MustStakeBeforeVote);
        }
        let new_vote = Vote::new(candidate, ctx.staked.amount.clone());
        let result = VoteResult::load(&*ctx.env.scs, issue)?;

        Ok(Self {
            ctx,
            issue,
            args,
            new_vote,
            vpr: VprCmd::new(result),
        })
    }

    pub(crate) fn boxed(ctx: SystemContext<'a, B>) -> Result<Box<dyn SysCmd + 'a>> {
        Ok(Box::new(Self::new(ctx)?))
    }
}

impl<'a, B: Backend> SysCmd for VoteCmd<'a, B> {
    fn run(&mut self) -> Result<Event> {
        let ctx = &mut self.ctx;
        ctx.update_staking()?;

        let account = ctx.account();
        set_vote(&mut *ctx.env.scs, &self.issue.key(), &account, &self.new_vote)?;

        if let Some(old) = ctx.vote.take() {
            self.vpr.sub(ctx, &old)?;
            ctx.vote = Some(old);
        }
        self.vpr.add(ctx, &self.new_vote)?;
        self.vpr.apply(ctx)?;

        debug!(
            issue = %self.issue.id(),
            voter = %ctx.sender.address(),
            old = %ctx.vote.as_ref().map(|v| v.amount.clone()).unwrap_or_default(),
            new = %self.new_vote.amount,
            "vote updated"
        );
        Ok(vote_event(
            ctx.fork,
            ctx.op(),
            ctx.receiver.address(),
            &ctx.tx.account,
            &self.args,
        ))
    }
}
