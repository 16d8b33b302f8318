use super::{transfer, SysCmd};
use crate::context::SystemContext;
use crate::error::{GovernanceError, Result};
use crate::event::{proposal_event, Event};
use crate::proposal::{set_proposal, Proposal};
use crate::store::Backend;
use crate::types::Amount;
use tracing::info;

/// Register a new proposal, paying the attached amount to the system account
pub struct ProposalCmd<'a, B: Backend> {
    ctx: SystemContext<'a, B>,
    proposal: Proposal,
    amount: Amount,
}

impl<'a, B: Backend + 'a> ProposalCmd<'a, B> {
    pub fn new(ctx: SystemContext<'a, B>) -> Result<Self> {
        let proposal = ctx.proposal.clone().ok_or(GovernanceError::TxInvalidPayload)?;
        let amount = ctx.tx.amount.clone();
        Ok(Self {
            ctx,
            proposal,
            amount,
        })
    }

    pub(crate) fn boxed(ctx: SystemContext<'a, B>) -> Result<Box<dyn SysCmd + 'a>> {
        Ok(Box::new(Self::new(ctx)?))
    }
}

impl<'a, B: Backend> SysCmd for ProposalCmd<'a, B> {
    fn run(&mut self) -> Result<Event> {
        let ctx = &mut self.ctx;
        transfer(ctx.sender, ctx.receiver, &self.amount)?;
        set_proposal(&mut *ctx.env.scs, &self.proposal)?;

        info!(
            id = %self.proposal.id,
            blockfrom = self.proposal.blockfrom,
            blockto = self.proposal.blockto,
            "proposal created"
        );
        Ok(proposal_event(
            ctx.receiver.address(),
            &ctx.tx.account,
            &self.proposal.to_json()?,
        ))
    }
}
