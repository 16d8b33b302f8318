//! Behavior that differs across fork versions

mod common;

use common::*;
use pos_governance::types::aergo;
use pos_governance::vote::PEER_ID_LENGTH;
use pos_governance::{Amount, GovernanceError, Issue, Vote};

#[test]
fn test_legacy_stake_event() {
    let mut chain = Chain::new(1);
    let mut sender = named_account(aergo(100_000));
    let event = chain.stake(&mut sender, staking_min(), 0).unwrap();
    assert_eq!(
        event.json_args,
        format!(r#"{{"who":"{}", "amount":"{}"}}"#, SENDER, staking_min())
    );
}

#[test]
fn test_short_payloads_before_fork2() {
    let mut chain = Chain::new(1);
    let mut sender = named_account(aergo(100_000));

    let events = chain.exec_raw(&mut sender, staking_min(), b"s", 0).unwrap();
    assert_eq!(events[0].event_name, "stake");

    let mut vote = b"v".to_vec();
    vote.extend(peer(1));
    vote.extend(peer(2));
    let events = chain.exec_raw(&mut sender, Amount::default(), &vote, DAY).unwrap();
    assert_eq!(events[0].event_name, "voteBP");
    assert_eq!(
        events[0].json_args,
        format!(r#"{{"who":"{}", "vote":["{}","{}"]}}"#, SENDER, peer_id(1), peer_id(2))
    );
    let list = chain.gov.vote_result(Issue::Bp, 2).unwrap();
    assert!(list.iter().all(|v| v.amount == staking_min()));

    let events = chain.exec_raw(&mut sender, staking_min(), b"u", 2 * DAY).unwrap();
    assert_eq!(events[0].event_name, "unstake");
}

#[test]
fn test_short_payloads_rejected_at_fork2() {
    let mut chain = Chain::new(2);
    let mut sender = named_account(aergo(100_000));
    let err = chain.exec_raw(&mut sender, staking_min(), b"s", 0).unwrap_err();
    assert!(matches!(err, GovernanceError::TxInvalidPayload));
}

#[test]
fn test_ragged_short_vote_rejected() {
    let mut chain = Chain::new(1);
    let mut sender = named_account(aergo(100_000));
    chain.stake(&mut sender, staking_min(), 0).unwrap();

    let mut vote = b"v".to_vec();
    vote.extend(vec![1u8; PEER_ID_LENGTH + 1]);
    let err = chain.exec_raw(&mut sender, Amount::default(), &vote, DAY).unwrap_err();
    assert!(matches!(err, GovernanceError::TxInvalidPayload));
}

#[test]
fn test_legacy_vote_leaves_vpr_untouched() {
    let mut chain = Chain::new(1);
    let mut sender = named_account(aergo(100_000));
    chain.stake(&mut sender, staking_min(), 0).unwrap();
    chain
        .exec(&mut sender, Amount::default(), &vote_bp_payload(&[1]), DAY)
        .unwrap();

    assert!(chain.gov.vpr().is_empty());
    assert_eq!(
        chain.gov.vote_result(Issue::Bp, 1).unwrap(),
        vec![Vote::new(peer(1), staking_min())]
    );
}

#[test]
fn test_dao_not_supported_before_fork2() {
    let mut chain = Chain::new(1);
    let mut sender = named_account(aergo(100_000));
    chain.stake(&mut sender, staking_min(), 0).unwrap();
    let err = chain
        .exec(&mut sender, Amount::default(), &vote_dao_payload("bpcount", &["13"]), DAY)
        .unwrap_err();
    assert!(matches!(err, GovernanceError::NotSupportedOperation));
}

#[test]
fn test_unstake_over_stake() {
    let mut legacy = Chain::new(1);
    let mut sender = named_account(aergo(100_000));
    legacy.stake(&mut sender, staking_min(), 0).unwrap();
    let event = legacy.unstake(&mut sender, staking_min() * 2u32, DAY).unwrap();
    assert_eq!(
        event.json_args,
        format!(r#"{{"who":"{}", "amount":"{}"}}"#, SENDER, staking_min())
    );
    assert_eq!(sender.balance(), &aergo(100_000));

    let mut chain = Chain::new(2);
    let mut sender = named_account(aergo(100_000));
    chain.stake(&mut sender, staking_min(), 0).unwrap();
    let err = chain.unstake(&mut sender, staking_min() * 2u32, DAY).unwrap_err();
    assert!(matches!(err, GovernanceError::ExceedAmount));
}

#[test]
fn test_fork2_event_shapes() {
    let mut chain = Chain::new(2);
    let mut sender = named_account(aergo(100_000));
    chain.stake(&mut sender, staking_min(), 0).unwrap();

    let event = chain
        .exec(&mut sender, Amount::default(), &vote_bp_payload(&[1, 2]), DAY)
        .unwrap();
    assert_eq!(
        event.json_args,
        format!(r#"["{}", ["{}","{}"]]"#, SENDER, peer_id(1), peer_id(2))
    );

    let event = chain
        .exec(&mut sender, Amount::default(), &vote_dao_payload("gasprice", &["50000000000"]), 2 * DAY)
        .unwrap();
    assert_eq!(
        event.json_args,
        format!(r#"["{}", "GASPRICE", {{"_bignum":"50000000000"}}]"#, SENDER)
    );

    let event = chain.unstake(&mut sender, staking_min(), 3 * DAY).unwrap();
    assert_eq!(
        event.json_args,
        format!(r#"["{}", {{"_bignum":"{}"}}]"#, SENDER, staking_min())
    );
}
