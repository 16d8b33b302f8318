//! Error types for governance transaction processing

use thiserror::Error;

/// Governance errors
///
/// Validation, policy and consistency errors reject a single transaction.
/// Fatal errors mean persisted data cannot be trusted and block execution
/// must stop.
#[derive(Debug, Error)]
pub enum GovernanceError {
    // validation
    #[error("tx invalid format")]
    TxFormatInvalid,

    #[error("invalid payload")]
    TxInvalidPayload,

    #[error("include invalid character")]
    InvalidCharacter,

    #[error("include invalid number")]
    InvalidNumber,

    #[error("include invalid number range")]
    InvalidNumberRange,

    #[error("args[{0}] invalid id")]
    InvalidProposalId(usize),

    #[error("not supported operation")]
    NotSupportedOperation,

    #[error("the voting begins at {0}")]
    VotingNotStarted(u64),

    #[error("the voting was already done at {0}")]
    VotingClosed(u64),

    // policy
    #[error("not enough balance")]
    InsufficientBalance,

    #[error("too small amount to influence")]
    TooSmallAmount,

    #[error("request amount exceeds")]
    ExceedAmount,

    #[error("must stake before vote")]
    MustStakeBeforeVote,

    #[error("must stake before unstake")]
    MustStakeBeforeUnstake,

    #[error("less time has passed")]
    LessTimeHasPassed,

    #[error("fee delegation is not allowed")]
    NotAllowedFeeDelegation,

    // consistency
    #[error("proposal not found: {0}")]
    ProposalNotFound(String),

    #[error("proposal already exists: {0}")]
    ProposalAlreadyExists(String),

    #[error("candidate should be in {0:?}")]
    CandidateNotInWhitelist(Vec<String>),

    #[error("too many candidates arguments (max : {0})")]
    TooManyChoices(u32),

    // fatal
    #[error("corrupted state: {0}")]
    Corrupted(String),

    #[error("voting reward: no winner")]
    NoVotingRewardWinner,

    #[error("store error: {0}")]
    Store(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GovernanceError {
    /// Whether the error invalidates the whole block rather than one transaction
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GovernanceError::Corrupted(_)
                | GovernanceError::Store(_)
                | GovernanceError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GovernanceError>;
