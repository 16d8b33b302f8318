//! Proof-of-Stake Governance
//!
//! Deterministic on-chain governance for a proof-of-stake chain:
//! - **Staking** of coins into a per-account locked pool
//! - **Block producer election** by stake-weighted voting
//! - **Parameter governance** where DAO votes change protocol parameters
//! - **Voters' power ranking** used to draw voting rewards
//!
//! Every node must compute identical transitions for every governance
//! transaction, so all state lives in a flat byte-keyed namespace owned by
//! the system account and all amounts are arbitrary precision.

pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod fork;
pub mod keys;
pub mod params;
pub mod payload;
pub mod proposal;
pub mod query;
pub mod snapshot;
pub mod staking;
pub mod store;
pub mod types;
pub mod vote;
pub mod vote_result;
pub mod vpr;

pub use command::{execute_system_tx, SysCmd};
pub use config::GovernanceConfig;
pub use context::{Env, SystemContext};
pub use error::{GovernanceError, Result};
pub use event::Event;
pub use fork::Fork;
pub use params::{ParamDefaults, ParamId, SystemParams};
pub use payload::{CallInfo, OpSysTx};
pub use proposal::{Issue, Proposal, ProposalCatalog};
pub use query::VoteInfo;
pub use snapshot::Governance;
pub use staking::Staking;
pub use store::{Backend, ContractState, DataGetter, DataSetter, MemoryBackend};
pub use types::{AccountId, AccountState, Address, Amount, BlockInfo, BlockNo, ForkVersion, TxBody};
pub use vote::Vote;
pub use vote_result::VoteResult;
pub use vpr::{voting_reward_amount, Vpr, VotingPower};
