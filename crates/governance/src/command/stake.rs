use super::{transfer, SysCmd};
use crate::context::SystemContext;
use crate::error::Result;
use crate::event::{staking_event, Event};
use crate::staking::add_staking_total;
use crate::store::Backend;
use crate::types::Amount;
use tracing::debug;

/// Lock coins of the sender
pub struct StakeCmd<'a, B: Backend> {
    ctx: SystemContext<'a, B>,
    amount: Amount,
}

impl<'a, B: Backend + 'a> StakeCmd<'a, B> {
    pub fn new(ctx: SystemContext<'a, B>) -> Self {
        let amount = ctx.tx.amount.clone();
        Self { ctx, amount }
    }

    pub(crate) fn boxed(ctx: SystemContext<'a, B>) -> Result<Box<dyn SysCmd + 'a>> {
        Ok(Box::new(Self::new(ctx)))
    }
}

impl<'a, B: Backend> SysCmd for StakeCmd<'a, B> {
    fn run(&mut self) -> Result<Event> {
        let ctx = &mut self.ctx;
        transfer(ctx.sender, ctx.receiver, &self.amount)?;

        ctx.staked.amount += &self.amount;
        ctx.staked.when = ctx.block.no;
        ctx.update_staking()?;
        add_staking_total(&mut *ctx.env.scs, &self.amount)?;

        debug!(
            sender = %ctx.sender.address(),
            amount = %self.amount,
            staked = %ctx.staked.amount,
            "staked"
        );
        Ok(staking_event(
            ctx.fork,
            ctx.op(),
            ctx.receiver.address(),
            &ctx.tx.account,
            &self.amount,
        ))
    }
}
