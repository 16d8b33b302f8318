use super::{refund, SysCmd, VprCmd};
use crate::context::SystemContext;
use crate::error::Result;
use crate::event::{staking_event, Event};
use crate::proposal::Issue;
use crate::staking::sub_staking_total;
use crate::store::Backend;
use crate::types::Amount;
use crate::vote::{get_vote, set_vote};
use crate::vote_result::VoteResult;
use tracing::debug;

/// Release locked coins, then shrink every vote above the new stake
pub struct UnstakeCmd<'a, B: Backend> {
    ctx: SystemContext<'a, B>,
    amount: Amount,
}

impl<'a, B: Backend + 'a> UnstakeCmd<'a, B> {
    /// Before fork 2 an amount above the stake is clamped to the stake
    pub fn new(ctx: SystemContext<'a, B>) -> Self {
        let amount = if ctx.fork.clamps_unstake() {
            (&ctx.tx.amount).min(&ctx.staked.amount).clone()
        } else {
            ctx.tx.amount.clone()
        };
        Self { ctx, amount }
    }

    pub(crate) fn boxed(ctx: SystemContext<'a, B>) -> Result<Box<dyn SysCmd + 'a>> {
        Ok(Box::new(Self::new(ctx)))
    }
}

impl<'a, B: Backend> SysCmd for UnstakeCmd<'a, B> {
    fn run(&mut self) -> Result<Event> {
        let ctx = &mut self.ctx;

        ctx.staked.amount -= &self.amount;
        ctx.staked.when = ctx.block.no;
        ctx.update_staking()?;
        sub_staking_total(&mut *ctx.env.scs, &self.amount)?;
        refund(ctx.receiver, ctx.sender, &self.amount)?;

        debug!(
            sender = %ctx.sender.address(),
            amount = %self.amount,
            staked = %ctx.staked.amount,
            "unstaked"
        );
        refresh_all_votes(ctx)?;

        Ok(staking_event(
            ctx.fork,
            ctx.op(),
            ctx.receiver.address(),
            &ctx.tx.account,
            &self.amount,
        ))
    }
}

/// Bring every open vote of the sender down to its current stake
///
/// Votes on DAO issues whose window already closed are left as cast.
pub fn refresh_all_votes<B: Backend>(ctx: &mut SystemContext<'_, B>) -> Result<()> {
    let account = ctx.account();
    let staked = ctx.staked.amount.clone();

    for issue in Issue::catalog() {
        let key = issue.key();
        let Some(mut vote) = get_vote(&*ctx.env.scs, &key, &account)? else {
            continue;
        };
        if vote.amount <= staked {
            continue;
        }
        if let Issue::Dao(param) = issue {
            let proposal = ctx.env.proposals.get(&*ctx.env.scs, param.id())?;
            if proposal.map_or(false, |p| p.is_closed(ctx.block.no)) {
                continue;
            }
        }

        let result = VoteResult::load(&*ctx.env.scs, issue)?;
        let mut cmd = VprCmd::new(result);
        cmd.sub(ctx, &vote)?;
        vote.amount = staked.clone();
        set_vote(&mut *ctx.env.scs, &key, &account, &vote)?;
        cmd.add(ctx, &vote)?;
        cmd.apply(ctx)?;

        debug!(issue = %issue.id(), amount = %staked, "refreshed vote");
    }
    Ok(())
}
