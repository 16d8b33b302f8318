//! Governance transaction payloads
//!
//! A payload is a JSON object `{"Name": "<cmd>", "Args": [...]}` with no
//! trailing bytes. Before fork 2 three single-byte forms are also accepted:
//! `s` (stake), `u` (unstake) and `v` followed by raw 39-byte peer IDs.
//!
//! Decoding resolves the operation and checks the argument shape that does
//! not depend on state. Checks that need state (proposal lookup, windows,
//! stake) happen when the [`SystemContext`](crate::context::SystemContext)
//! is built.

use crate::error::{GovernanceError, Result};
use crate::fork::Fork;
use crate::params::{parse_decimal, ParamId};
use crate::proposal::Proposal;
use crate::types::BlockNo;
use crate::vote::{decode_peer_ids, PEER_ID_LENGTH};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Raw call carried in a payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallInfo {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Args", default)]
    pub args: Vec<Value>,
}

impl CallInfo {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// JSON text of the argument list
    pub fn args_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.args)?)
    }
}

/// Governance operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OpSysTx {
    Stake,
    Unstake,
    VoteBp,
    VoteDao,
    CreateProposal,
}

impl OpSysTx {
    pub const ALL: [OpSysTx; 5] = [
        OpSysTx::Stake,
        OpSysTx::Unstake,
        OpSysTx::VoteBp,
        OpSysTx::VoteDao,
        OpSysTx::CreateProposal,
    ];

    /// Name carried in the payload
    pub fn cmd(&self) -> &'static str {
        match self {
            OpSysTx::Stake => "v1stake",
            OpSysTx::Unstake => "v1unstake",
            OpSysTx::VoteBp => "v1voteBP",
            OpSysTx::VoteDao => "v1voteDAO",
            OpSysTx::CreateProposal => "v1createProposal",
        }
    }

    /// Event name, and for BP votes the issue key
    pub fn id(&self) -> &'static str {
        match self {
            OpSysTx::Stake => "stake",
            OpSysTx::Unstake => "unstake",
            OpSysTx::VoteBp => "voteBP",
            OpSysTx::VoteDao => "voteDAO",
            OpSysTx::CreateProposal => "createProposal",
        }
    }

    pub fn from_cmd(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.cmd() == name)
    }
}

impl fmt::Display for OpSysTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Payload decoded into a typed call
#[derive(Debug, Clone, PartialEq)]
pub enum SysCall {
    Stake,
    Unstake,
    /// Base58 peer IDs and their raw concatenation
    VoteBp { peers: Vec<String>, candidate: Vec<u8> },
    /// Proposal ID argument followed by the chosen values, unchecked
    VoteDao { args: Vec<Value> },
    CreateProposal { proposal: Proposal },
}

impl SysCall {
    pub fn op(&self) -> OpSysTx {
        match self {
            SysCall::Stake => OpSysTx::Stake,
            SysCall::Unstake => OpSysTx::Unstake,
            SysCall::VoteBp { .. } => OpSysTx::VoteBp,
            SysCall::VoteDao { .. } => OpSysTx::VoteDao,
            SysCall::CreateProposal { .. } => OpSysTx::CreateProposal,
        }
    }
}

/// Decoded payload
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    /// Call as it appeared on the wire, short forms expanded
    pub call_info: CallInfo,

    pub call: SysCall,
}

impl Payload {
    pub fn op(&self) -> OpSysTx {
        self.call.op()
    }
}

/// Decode and shape-check a governance payload
pub fn decode_payload(payload: &[u8], fork: Fork) -> Result<Payload> {
    if fork.accepts_short_payload() {
        if let Some(decoded) = decode_short_payload(payload)? {
            return Ok(decoded);
        }
    }

    let mut de = serde_json::Deserializer::from_slice(payload);
    let call_info =
        CallInfo::deserialize(&mut de).map_err(|_| GovernanceError::TxInvalidPayload)?;
    de.end().map_err(|_| GovernanceError::TxFormatInvalid)?;

    let op = OpSysTx::from_cmd(&call_info.name).ok_or(GovernanceError::TxInvalidPayload)?;
    let call = match op {
        OpSysTx::Stake => SysCall::Stake,
        OpSysTx::Unstake => SysCall::Unstake,
        OpSysTx::VoteBp => {
            let peers = string_args(&call_info.args)?;
            let candidate = decode_peer_ids(&peers)?;
            SysCall::VoteBp { peers, candidate }
        }
        OpSysTx::VoteDao => {
            if call_info.args.is_empty() {
                return Err(GovernanceError::InvalidProposalId(0));
            }
            if call_info.args.len() < 2 {
                return Err(GovernanceError::TxInvalidPayload);
            }
            SysCall::VoteDao {
                args: call_info.args.clone(),
            }
        }
        OpSysTx::CreateProposal => SysCall::CreateProposal {
            proposal: parse_proposal(&call_info.args)?,
        },
    };
    Ok(Payload { call_info, call })
}

fn decode_short_payload(payload: &[u8]) -> Result<Option<Payload>> {
    let Some((&tag, rest)) = payload.split_first() else {
        return Ok(None);
    };
    let decoded = match tag {
        b's' if rest.is_empty() => Payload {
            call_info: CallInfo::new(OpSysTx::Stake.cmd(), Vec::new()),
            call: SysCall::Stake,
        },
        b'u' if rest.is_empty() => Payload {
            call_info: CallInfo::new(OpSysTx::Unstake.cmd(), Vec::new()),
            call: SysCall::Unstake,
        },
        b'v' => {
            if rest.len() % PEER_ID_LENGTH != 0 {
                return Err(GovernanceError::TxInvalidPayload);
            }
            let peers: Vec<String> = rest
                .chunks(PEER_ID_LENGTH)
                .map(|peer| bs58::encode(peer).into_string())
                .collect();
            let candidate = decode_peer_ids(&peers)?;
            let args = peers.iter().cloned().map(Value::String).collect();
            Payload {
                call_info: CallInfo::new(OpSysTx::VoteBp.cmd(), args),
                call: SysCall::VoteBp { peers, candidate },
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(decoded))
}

fn string_args(args: &[Value]) -> Result<Vec<String>> {
    args.iter()
        .map(|arg| {
            arg.as_str()
                .map(str::to_string)
                .ok_or(GovernanceError::TxInvalidPayload)
        })
        .collect()
}

/// Upper-cased parameter ID from `args[0]`
pub fn parse_proposal_id(args: &[Value]) -> Result<ParamId> {
    args.first()
        .and_then(Value::as_str)
        .and_then(ParamId::parse)
        .ok_or(GovernanceError::InvalidProposalId(0))
}

fn block_arg(args: &[Value], index: usize) -> Result<BlockNo> {
    let value = match args.get(index) {
        Some(Value::String(s)) => parse_decimal(s).and_then(|v| v.to_u64()),
        Some(Value::Number(n)) => n.as_u64(),
        _ => None,
    };
    value.ok_or(GovernanceError::TxInvalidPayload)
}

/// `[id, blockfrom, blockto, multipleChoice, description, [candidates]]`
pub fn parse_proposal(args: &[Value]) -> Result<Proposal> {
    let param = parse_proposal_id(args)?;
    let blockfrom = block_arg(args, 1)?;
    let blockto = block_arg(args, 2)?;
    let multiple_choice = u32::try_from(block_arg(args, 3)?)
        .map_err(|_| GovernanceError::TxInvalidPayload)?;
    if blockto != 0 && blockto < blockfrom {
        return Err(GovernanceError::TxInvalidPayload);
    }
    if multiple_choice == 0 {
        return Err(GovernanceError::TxInvalidPayload);
    }
    let description = match args.get(4) {
        Some(Value::String(s)) => s.clone(),
        None => String::new(),
        Some(_) => return Err(GovernanceError::TxInvalidPayload),
    };
    let candidates = match args.get(5) {
        Some(Value::Array(list)) => string_args(list)?,
        None => Vec::new(),
        Some(_) => return Err(GovernanceError::TxInvalidPayload),
    };
    for candidate in &candidates {
        param.parse_value(candidate)?;
    }
    if args.len() > 6 {
        return Err(GovernanceError::TxInvalidPayload);
    }

    Ok(Proposal {
        description,
        blockfrom,
        blockto,
        multiple_choice,
        candidates,
        ..Proposal::for_param(param)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn peer_arg(b: u8) -> String {
        bs58::encode(vec![b; PEER_ID_LENGTH]).into_string()
    }

    #[test]
    fn test_decode_stake() {
        let payload = decode_payload(br#"{"Name":"v1stake"}"#, Fork::V2).unwrap();
        assert_eq!(payload.call, SysCall::Stake);
        assert_eq!(payload.op().id(), "stake");
    }

    #[test]
    fn test_trailing_bytes_are_format_error() {
        assert!(matches!(
            decode_payload(br#"{"Name":"v1stake"}x"#, Fork::V2),
            Err(GovernanceError::TxFormatInvalid)
        ));
        assert!(decode_payload(b"{\"Name\":\"v1stake\"}\n", Fork::V2).is_ok());
    }

    #[test]
    fn test_unknown_name() {
        assert!(matches!(
            decode_payload(br#"{"Name":"v1steak"}"#, Fork::V2),
            Err(GovernanceError::TxInvalidPayload)
        ));
        assert!(matches!(
            decode_payload(b"not json", Fork::V2),
            Err(GovernanceError::TxInvalidPayload)
        ));
    }

    #[test]
    fn test_short_forms_only_before_fork_2() {
        assert_eq!(decode_payload(b"s", Fork::Legacy).unwrap().call, SysCall::Stake);
        assert_eq!(decode_payload(b"u", Fork::Legacy).unwrap().call, SysCall::Unstake);
        assert!(decode_payload(b"s", Fork::V2).is_err());

        let mut vote = b"v".to_vec();
        vote.extend_from_slice(&[1u8; PEER_ID_LENGTH]);
        let payload = decode_payload(&vote, Fork::Legacy).unwrap();
        assert_eq!(payload.op(), OpSysTx::VoteBp);
        assert_eq!(payload.call_info.args, vec![json!(peer_arg(1))]);

        vote.push(0);
        assert!(decode_payload(&vote, Fork::Legacy).is_err());
    }

    #[test]
    fn test_vote_bp_args() {
        let body = json!({"Name": "v1voteBP", "Args": [peer_arg(1), peer_arg(2)]}).to_string();
        match decode_payload(body.as_bytes(), Fork::V2).unwrap().call {
            SysCall::VoteBp { peers, candidate } => {
                assert_eq!(peers.len(), 2);
                assert_eq!(candidate.len(), 2 * PEER_ID_LENGTH);
            }
            other => panic!("unexpected call {:?}", other),
        }

        let numeric = json!({"Name": "v1voteBP", "Args": [1]}).to_string();
        assert!(decode_payload(numeric.as_bytes(), Fork::V2).is_err());

        let too_many: Vec<String> = (1..=31).map(peer_arg).collect();
        let body = json!({"Name": "v1voteBP", "Args": too_many}).to_string();
        assert!(decode_payload(body.as_bytes(), Fork::V2).is_err());
    }

    #[test]
    fn test_vote_dao_needs_id() {
        assert!(matches!(
            decode_payload(br#"{"Name":"v1voteDAO","Args":[]}"#, Fork::V2),
            Err(GovernanceError::InvalidProposalId(0))
        ));
        assert!(matches!(
            decode_payload(br#"{"Name":"v1voteDAO","Args":["bpcount"]}"#, Fork::V2),
            Err(GovernanceError::TxInvalidPayload)
        ));
    }

    #[test]
    fn test_parse_proposal() {
        let args = vec![
            json!("gasprice"),
            json!("10"),
            json!("20"),
            json!("2"),
            json!("lower gas"),
            json!(["1", "2"]),
        ];
        let proposal = parse_proposal(&args).unwrap();
        assert_eq!(proposal.id, "GASPRICE");
        assert_eq!(proposal.blockfrom, 10);
        assert_eq!(proposal.blockto, 20);
        assert_eq!(proposal.multiple_choice, 2);
        assert_eq!(proposal.candidates, vec!["1".to_string(), "2".to_string()]);

        let mut bad = args.clone();
        bad[0] = json!("fee");
        assert!(matches!(parse_proposal(&bad), Err(GovernanceError::InvalidProposalId(0))));

        let mut bad = args.clone();
        bad[2] = json!("5");
        assert!(parse_proposal(&bad).is_err());

        let mut bad = args;
        bad[3] = json!("0");
        assert!(parse_proposal(&bad).is_err());
    }
}
