//! Events emitted by successful governance commands
//!
//! Every command yields exactly one event named after its operation. The
//! JSON argument shape changed at fork 2 from a `who`-keyed object to a
//! positional array with big numbers wrapped as `{"_bignum": "<dec>"}`.

use crate::fork::Fork;
use crate::payload::OpSysTx;
use crate::types::{Address, Amount};
use serde::{Deserialize, Serialize};

/// Contract event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Contract that emitted the event, the system account
    pub contract_address: Address,

    /// Operation ID such as `stake` or `voteDAO`
    pub event_name: String,

    /// JSON text of the event arguments
    pub json_args: String,

    /// Position among the events of one transaction
    pub event_idx: u32,
}

impl Event {
    pub fn new(contract_address: Address, op: OpSysTx, json_args: String) -> Self {
        Self {
            contract_address,
            event_name: op.id().to_string(),
            json_args,
            event_idx: 0,
        }
    }
}

/// JSON string literal of `s`, escaped
fn quote(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// Event of a stake or unstake of `amount`
pub fn staking_event(fork: Fork, op: OpSysTx, receiver: &Address, who: &Address, amount: &Amount) -> Event {
    let (who, amount) = (quote(&who.encode()), quote(&amount.to_string()));
    let json_args = match fork {
        Fork::Legacy => format!(r#"{{"who":{}, "amount":{}}}"#, who, amount),
        Fork::V2 => format!(r#"[{}, {{"_bignum":{}}}]"#, who, amount),
    };
    Event::new(receiver.clone(), op, json_args)
}

/// Event of a vote
///
/// `args` is already JSON: the argument array for BP votes, or for DAO
/// votes the `"<ID>", {"_bignum":"<value>"}` pair.
pub fn vote_event(fork: Fork, op: OpSysTx, receiver: &Address, who: &Address, args: &str) -> Event {
    let json_args = match fork {
        Fork::Legacy => format!(r#"{{"who":{}, "vote":{}}}"#, quote(&who.encode()), args),
        Fork::V2 => format!(r#"[{}, {}]"#, quote(&who.encode()), args),
    };
    Event::new(receiver.clone(), op, json_args)
}

/// `"<ID>", {"_bignum":"<value>"}` argument pair of a DAO vote event
pub fn dao_vote_args(id: &str, value: &str) -> String {
    format!(r#"{}, {{"_bignum":{}}}"#, quote(&id.to_uppercase()), quote(value))
}

/// Event of a proposal creation, `proposal` already JSON
pub fn proposal_event(receiver: &Address, who: &Address, proposal: &str) -> Event {
    let json_args = format!(r#"{{"who":{}, "Proposal":{}}}"#, quote(&who.encode()), proposal);
    Event::new(receiver.clone(), OpSysTx::CreateProposal, json_args)
}
