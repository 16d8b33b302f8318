//! Transaction validation
//!
//! [`validate_system_tx`] decodes the payload and checks every
//! precondition of the operation against the current state, producing the
//! decoded staking record, previous vote and proposal a command needs.
//! Nothing is written during validation.

use crate::error::{GovernanceError, Result};
use crate::fork::Fork;
use crate::params::SystemParams;
use crate::payload::{decode_payload, parse_proposal_id, OpSysTx, Payload, SysCall};
use crate::proposal::{Issue, Proposal, ProposalCatalog};
use crate::staking::{get_staking, set_staking, Staking, STAKING_DELAY};
use crate::store::{Backend, ContractState};
use crate::types::{AccountState, Amount, BlockInfo, TxBody};
use crate::vote::{get_vote, Vote, VOTING_DELAY};
use crate::vpr::Vpr;
use num_traits::Zero;
use tracing::debug;

/// State a command runs against
pub struct Env<'a, B: Backend> {
    pub scs: &'a mut ContractState<B>,
    pub params: &'a SystemParams,
    pub proposals: &'a ProposalCatalog,
    pub vpr: &'a mut Vpr,
}

/// Result of validating one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub payload: Payload,

    /// Sender's staking record before the command
    pub staked: Staking,

    /// Sender's previous vote on the target issue
    pub vote: Option<Vote>,

    /// Target issue of a vote
    pub issue: Option<Issue>,

    /// Target or new proposal
    pub proposal: Option<Proposal>,
}

/// Everything a command needs to run
pub struct SystemContext<'a, B: Backend> {
    pub env: Env<'a, B>,
    pub tx: &'a TxBody,
    pub block: BlockInfo,
    pub fork: Fork,
    pub sender: &'a mut AccountState,
    pub receiver: &'a mut AccountState,
    pub payload: Payload,
    pub staked: Staking,
    pub vote: Option<Vote>,
    pub issue: Option<Issue>,
    pub proposal: Option<Proposal>,
}

impl<'a, B: Backend> SystemContext<'a, B> {
    /// Validate `tx` and bind the result to the state it will run against
    pub fn new(
        env: Env<'a, B>,
        tx: &'a TxBody,
        sender: &'a mut AccountState,
        receiver: &'a mut AccountState,
        block: BlockInfo,
    ) -> Result<Self> {
        let validated = validate_system_tx(&env, tx, sender, block)?;
        Ok(Self {
            env,
            tx,
            block,
            fork: Fork::of(block.fork_version),
            sender,
            receiver,
            payload: validated.payload,
            staked: validated.staked,
            vote: validated.vote,
            issue: validated.issue,
            proposal: validated.proposal,
        })
    }

    pub fn op(&self) -> OpSysTx {
        self.payload.op()
    }

    /// Sender's account ID bytes, the key of its staking and vote records
    pub fn account(&self) -> [u8; 32] {
        self.sender.id().0
    }

    pub fn update_staking(&mut self) -> Result<()> {
        let account = self.account();
        set_staking(self.env.scs, &account, &self.staked)
    }
}

/// Check `tx` against the state without writing
pub fn validate_system_tx<B: Backend>(
    env: &Env<'_, B>,
    tx: &TxBody,
    sender: &AccountState,
    block: BlockInfo,
) -> Result<Validated> {
    if tx.fee_delegation {
        return Err(GovernanceError::NotAllowedFeeDelegation);
    }
    let fork = Fork::of(block.fork_version);
    let payload = decode_payload(&tx.payload, fork)?;
    let account = sender.id().0;
    let scs: &ContractState<B> = &*env.scs;

    let mut validated = Validated {
        payload,
        staked: Staking::default(),
        vote: None,
        issue: None,
        proposal: None,
    };

    match &validated.payload.call {
        SysCall::Stake => {
            if sender.balance() < &tx.amount {
                return Err(GovernanceError::InsufficientBalance);
            }
            validated.staked = validate_for_staking(scs, env.params, &account, &tx.amount, block)?;
        }
        SysCall::Unstake => {
            validated.staked =
                validate_for_unstaking(scs, env.params, &account, &tx.amount, block, fork)?;
        }
        SysCall::VoteBp { .. } => {
            let (staked, vote) = validate_for_vote(scs, &account, Issue::Bp, block)?;
            validated.staked = staked;
            validated.vote = vote;
            validated.issue = Some(Issue::Bp);
        }
        SysCall::VoteDao { args } => {
            if !fork.supports_dao() {
                return Err(GovernanceError::NotSupportedOperation);
            }
            let param = parse_proposal_id(args)?;
            let proposal = env
                .proposals
                .get(scs, param.id())?
                .ok_or_else(|| GovernanceError::ProposalNotFound(param.id().to_string()))?;
            proposal.is_open(block.no)?;

            let choices = &args[1..];
            if choices.len() > proposal.multiple_choice as usize {
                return Err(GovernanceError::TooManyChoices(proposal.multiple_choice));
            }
            let mut candidates = Vec::with_capacity(choices.len());
            for choice in choices {
                let candidate = choice.as_str().ok_or(GovernanceError::InvalidCharacter)?;
                param.parse_value(candidate)?;
                candidates.push(candidate.to_string());
            }
            proposal.check_whitelist(&candidates)?;

            let issue = Issue::Dao(param);
            let (staked, vote) = validate_for_vote(scs, &account, issue, block)?;
            validated.staked = staked;
            validated.vote = vote;
            validated.issue = Some(issue);
            validated.proposal = Some(proposal);
        }
        SysCall::CreateProposal { proposal } => {
            if !fork.supports_dao() {
                return Err(GovernanceError::NotSupportedOperation);
            }
            if env.proposals.contains(scs, &proposal.id)? {
                return Err(GovernanceError::ProposalAlreadyExists(proposal.id.clone()));
            }
            if sender.balance() < &tx.amount {
                return Err(GovernanceError::InsufficientBalance);
            }
            validated.proposal = Some(proposal.clone());
        }
    }

    debug!(
        op = %validated.payload.op(),
        block_no = block.no,
        sender = %sender.address(),
        "validated governance tx"
    );
    Ok(validated)
}

fn validate_for_staking<B: Backend>(
    scs: &ContractState<B>,
    params: &SystemParams,
    account: &[u8],
    amount: &Amount,
    block: BlockInfo,
) -> Result<Staking> {
    let staked = get_staking(scs, account)?;
    if !staked.is_empty() && !staked.elapsed(STAKING_DELAY, block.no) {
        return Err(GovernanceError::LessTimeHasPassed);
    }
    let to_be = &staked.amount + amount;
    if params.staking_minimum_from_state(scs)? > to_be {
        return Err(GovernanceError::TooSmallAmount);
    }
    Ok(staked)
}

fn validate_for_unstaking<B: Backend>(
    scs: &ContractState<B>,
    params: &SystemParams,
    account: &[u8],
    amount: &Amount,
    block: BlockInfo,
    fork: Fork,
) -> Result<Staking> {
    let staked = get_staking(scs, account)?;
    if staked.is_empty() {
        return Err(GovernanceError::MustStakeBeforeUnstake);
    }
    if *amount > staked.amount && !fork.clamps_unstake() {
        return Err(GovernanceError::ExceedAmount);
    }
    if !staked.elapsed(STAKING_DELAY, block.no) {
        return Err(GovernanceError::LessTimeHasPassed);
    }
    let to_be = &staked.amount - amount.min(&staked.amount);
    if !to_be.is_zero() && params.staking_minimum_from_state(scs)? > to_be {
        return Err(GovernanceError::TooSmallAmount);
    }
    Ok(staked)
}

fn validate_for_vote<B: Backend>(
    scs: &ContractState<B>,
    account: &[u8],
    issue: Issue,
    block: BlockInfo,
) -> Result<(Staking, Option<Vote>)> {
    let staked = get_staking(scs, account)?;
    if staked.is_empty() {
        return Err(GovernanceError::MustStakeBeforeVote);
    }
    let vote = get_vote(scs, &issue.key(), account)?;
    if !staked.elapsed(VOTING_DELAY, block.no) {
        return Err(GovernanceError::LessTimeHasPassed);
    }
    Ok((staked, vote))
}
