//! End-to-end governance scenarios

mod common;

use common::*;
use pos_governance::fork::{VPR_QUIRK_ACCOUNT, VPR_QUIRK_BLOCK};
use pos_governance::types::aergo;
use pos_governance::{
    AccountId, AccountState, Address, Amount, GovernanceConfig, GovernanceError, Issue, ParamId, Vote,
};
use serde_json::json;

#[test]
fn test_basic_stake_unstake() {
    let mut chain = Chain::new(2);
    let mut sender = named_account(staking_min() * 2u32);

    let event = chain.stake(&mut sender, staking_min(), 0).unwrap();
    assert_eq!(sender.balance(), &staking_min());
    assert_eq!(event.event_name, "stake");
    assert_eq!(
        event.json_args,
        format!(r#"["{}", {{"_bignum":"10000000000000000000000"}}]"#, SENDER)
    );
    assert_eq!(event.contract_address, Address::system());
    assert_eq!(chain.gov.staking_total().unwrap(), staking_min());

    let err = chain.unstake(&mut sender, staking_min(), DAY - 1).unwrap_err();
    assert!(matches!(err, GovernanceError::LessTimeHasPassed));
    assert_eq!(sender.balance(), &staking_min());

    let event = chain.unstake(&mut sender, staking_min(), DAY).unwrap();
    assert_eq!(event.event_name, "unstake");
    assert_eq!(sender.balance(), &(staking_min() * 2u32));

    let staking = chain.gov.staking_of(&sender.id()).unwrap();
    assert_eq!(staking.amount, Amount::default());
    assert_eq!(staking.when, DAY);
    assert_eq!(chain.gov.staking_total().unwrap(), Amount::default());
}

#[test]
fn test_bp_vote() {
    let mut chain = Chain::new(2);
    let mut sender = named_account(staking_min() * 2u32);
    chain.stake(&mut sender, staking_min(), 0).unwrap();

    let err = chain.exec(&mut sender, Amount::default(), &vote_bp_payload(&[1]), DAY - 1);
    assert!(matches!(err, Err(GovernanceError::LessTimeHasPassed)));

    let event = chain
        .exec(&mut sender, Amount::default(), &vote_bp_payload(&[1]), DAY)
        .unwrap();
    assert_eq!(event.event_name, "voteBP");
    assert_eq!(event.json_args, format!(r#"["{}", ["{}"]]"#, SENDER, peer_id(1)));

    let list = chain.gov.vote_result(Issue::Bp, 10).unwrap();
    assert_eq!(list, vec![Vote::new(peer(1), staking_min())]);
    assert_eq!(chain.gov.bp_rankers(1).unwrap(), vec![peer_id(1)]);

    let votes = chain.gov.votes_of(&sender.id()).unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].id, "voteBP");
    assert_eq!(votes[0].candidates, vec![peer_id(1)]);

    // voting restarts the delay clock
    assert_eq!(chain.gov.staking_of(&sender.id()).unwrap().when, DAY);
}

#[test]
fn test_revote_moves_tally() {
    let mut chain = Chain::new(2);
    let mut sender = account(1, aergo(100_000));
    chain.stake(&mut sender, staking_min(), 0).unwrap();
    chain
        .exec(&mut sender, Amount::default(), &vote_bp_payload(&[1, 2]), DAY)
        .unwrap();
    chain
        .exec(&mut sender, Amount::default(), &vote_bp_payload(&[3]), 2 * DAY)
        .unwrap();

    let list = chain.gov.vote_result(Issue::Bp, 10).unwrap();
    assert_eq!(list[0], Vote::new(peer(3), staking_min()));
    assert!(list[1..].iter().all(|vote| vote.amount == Amount::default()));
    assert_eq!(
        chain.gov.vpr().voting_power_of(&sender.id()),
        Some(&staking_min())
    );
}

#[test]
fn test_dao_bpcount_change() {
    let mut chain = Chain::new(2);
    let mut voters: Vec<AccountState> = (1..=3).map(|i| account(i, aergo(100_000))).collect();
    for voter in voters.iter_mut() {
        chain.stake(voter, staking_min(), 0).unwrap();
    }

    let payload = vote_dao_payload("bpcount", &["13"]);
    let event = chain.exec(&mut voters[0], Amount::default(), &payload, DAY).unwrap();
    assert_eq!(event.event_name, "voteDAO");
    assert_eq!(
        event.json_args,
        format!(r#"["{}", "BPCOUNT", {{"_bignum":"13"}}]"#, voters[0].address())
    );
    let params = chain.gov.params();
    assert_eq!(params.get_next_block_param(ParamId::BpCount), Amount::from(3u32));

    chain.exec(&mut voters[1], Amount::default(), &payload, DAY).unwrap();
    assert_eq!(params.get_next_block_param(ParamId::BpCount), Amount::from(13u32));
    assert_eq!(chain.gov.bp_count(), 3);

    let list = chain.gov.vote_result(Issue::Dao(ParamId::BpCount), 1).unwrap();
    assert_eq!(list[0].candidate, b"13".to_vec());
    assert_eq!(list[0].amount, staking_min() * 2u32);

    chain.gov.commit_block().unwrap();
    assert_eq!(chain.gov.bp_count(), 13);
    assert_eq!(params.bp_count_from_state(chain.gov.state()).unwrap(), 13);
}

#[test]
fn test_dao_range_rejection() {
    let mut chain = Chain::new(2);
    let mut sender = account(1, aergo(100_000));
    chain.stake(&mut sender, staking_min(), 0).unwrap();
    chain.gov.commit_block().unwrap();

    for value in ["0", "101"] {
        let err = chain
            .exec(&mut sender, Amount::default(), &vote_dao_payload("bpcount", &[value]), DAY)
            .unwrap_err();
        assert!(matches!(err, GovernanceError::InvalidNumberRange));
    }
    assert_eq!(chain.gov.state().pending(), 0);
    assert_eq!(chain.gov.staking_of(&sender.id()).unwrap().when, 0);
    assert!(chain
        .gov
        .vote_result(Issue::Dao(ParamId::BpCount), 10)
        .unwrap()
        .is_empty());
}

#[test]
fn test_vote_refresh_on_unstake() {
    let mut chain = Chain::new(2);
    let mut sender = account(1, aergo(100_000));
    chain.stake(&mut sender, staking_min() * 2u32, 0).unwrap();
    chain
        .exec(&mut sender, Amount::default(), &vote_bp_payload(&[1]), DAY)
        .unwrap();
    chain
        .exec(&mut sender, Amount::default(), &vote_dao_payload("gasprice", &["100"]), 2 * DAY)
        .unwrap();
    assert_eq!(
        chain.gov.vpr().voting_power_of(&sender.id()),
        Some(&(staking_min() * 4u32))
    );

    chain.unstake(&mut sender, staking_min(), 3 * DAY).unwrap();

    for info in chain.gov.votes_of(&sender.id()).unwrap() {
        assert_eq!(info.amount, staking_min().to_string(), "issue {}", info.id);
    }
    let list = chain.gov.vote_result(Issue::Bp, 1).unwrap();
    assert_eq!(list[0], Vote::new(peer(1), staking_min()));
    assert_eq!(
        chain.gov.vpr().voting_power_of(&sender.id()),
        Some(&(staking_min() * 2u32))
    );
}

#[test]
fn test_refresh_skips_closed_proposal() {
    let mut config = pos_governance::GovernanceConfig::default();
    for proposal in config.proposals.iter_mut() {
        if proposal.id == "GASPRICE" {
            proposal.blockto = 2 * DAY;
        }
    }
    let mut chain = Chain::with_config(config, 2);
    let mut sender = account(1, aergo(100_000));
    chain.stake(&mut sender, staking_min() * 2u32, 0).unwrap();
    chain
        .exec(&mut sender, Amount::default(), &vote_dao_payload("gasprice", &["100"]), DAY)
        .unwrap();

    chain.unstake(&mut sender, staking_min(), 3 * DAY).unwrap();
    let votes = chain.gov.votes_of(&sender.id()).unwrap();
    assert_eq!(votes[0].id, "GASPRICE");
    assert_eq!(votes[0].amount, (staking_min() * 2u32).to_string());
}

#[test]
fn test_historical_vpr_quirk() {
    let quirk = AccountId::from_base58(VPR_QUIRK_ACCOUNT).unwrap();
    let mut chain = Chain::new(2);
    let mut sender = AccountState::with_id(Address::new(vec![9u8; 33]), quirk, aergo(100_000));

    chain
        .stake(&mut sender, staking_min(), VPR_QUIRK_BLOCK - DAY)
        .unwrap();
    chain
        .exec(&mut sender, Amount::default(), &vote_bp_payload(&[1]), VPR_QUIRK_BLOCK)
        .unwrap();
    assert_eq!(
        chain.gov.vpr().voting_power_of(&quirk),
        Some(&(staking_min() * 3u32))
    );
    assert_eq!(chain.gov.staking_of(&quirk).unwrap().amount, staking_min());
    assert_eq!(chain.gov.votes_of(&quirk).unwrap().len(), 1);
    assert!(chain.gov.votes_of(&sender.address().account_id()).unwrap().is_empty());

    // any other account at that block is applied once
    let mut other = account(2, aergo(100_000));
    chain.stake(&mut other, staking_min(), VPR_QUIRK_BLOCK - DAY).unwrap();
    chain
        .exec(&mut other, Amount::default(), &vote_bp_payload(&[1]), VPR_QUIRK_BLOCK)
        .unwrap();
    assert_eq!(chain.gov.vpr().voting_power_of(&other.id()), Some(&staking_min()));
}

#[test]
fn test_failed_tx_rolls_back() {
    let mut chain = Chain::new(2);
    let mut sender = account(1, aergo(15_000));
    let err = chain.stake(&mut sender, aergo(20_000), 0).unwrap_err();
    assert!(matches!(err, GovernanceError::InsufficientBalance));
    assert_eq!(sender.balance(), &aergo(15_000));
    assert_eq!(chain.system.balance(), &Amount::default());
    assert_eq!(chain.gov.state().pending(), 0);

    let err = chain
        .exec(&mut sender, Amount::default(), r#"{"Name":"v1stake"} {}"#, 0)
        .unwrap_err();
    assert!(matches!(err, GovernanceError::TxFormatInvalid));
}

#[test]
fn test_revert_block_restores_vpr_and_params() {
    let mut chain = Chain::new(2);
    let mut voters: Vec<AccountState> = (1..=2).map(|i| account(i, aergo(100_000))).collect();
    for voter in voters.iter_mut() {
        chain.stake(voter, staking_min(), 0).unwrap();
    }
    chain.gov.commit_block().unwrap();

    let payload = vote_dao_payload("bpcount", &["7"]);
    for voter in voters.iter_mut() {
        chain.exec(voter, Amount::default(), &payload, DAY).unwrap();
    }
    assert!(!chain.gov.vpr().is_empty());
    assert_eq!(
        chain.gov.params().get_next_block_param(ParamId::BpCount),
        Amount::from(7u32)
    );

    chain.gov.revert_block();
    assert!(chain.gov.vpr().is_empty());
    assert_eq!(chain.gov.bp_count(), 3);
    assert_eq!(
        chain.gov.params().get_next_block_param(ParamId::BpCount),
        Amount::from(3u32)
    );
    assert!(chain.gov.votes_of(&voters[0].id()).unwrap().is_empty());

    // the same votes replayed reach the same state
    for voter in voters.iter_mut() {
        chain.exec(voter, Amount::default(), &payload, DAY).unwrap();
    }
    chain.gov.commit_block().unwrap();
    assert_eq!(chain.gov.bp_count(), 7);
}

#[test]
fn test_reorg_reloads_from_state() {
    let mut chain = Chain::new(2);
    let mut sender = account(1, aergo(100_000));
    chain.stake(&mut sender, staking_min(), 0).unwrap();
    chain
        .exec(&mut sender, Amount::default(), &vote_bp_payload(&[4]), DAY)
        .unwrap();
    chain.gov.commit_block().unwrap();
    let committed = chain.gov.vpr().dump_rankers(0).unwrap();

    chain.stake(&mut sender, staking_min(), 2 * DAY).unwrap();
    chain.gov.reorg().unwrap();
    assert_eq!(chain.gov.vpr().dump_rankers(0).unwrap(), committed);
    assert!(!chain.gov.vpr().has_changes());
    assert_eq!(chain.gov.staking_of(&sender.id()).unwrap().amount, staking_min());
}

#[test]
fn test_voting_reward_winner() {
    let mut chain = Chain::new(2);
    let mut sender = account(1, aergo(100_000));
    assert!(chain.gov.vpr().pick_voting_reward_winner(7).is_err());

    chain.stake(&mut sender, staking_min(), 0).unwrap();
    chain
        .exec(&mut sender, Amount::default(), &vote_bp_payload(&[4]), DAY)
        .unwrap();
    assert_eq!(
        chain.gov.vpr().pick_voting_reward_winner(7).unwrap(),
        sender.address().clone()
    );
    let dump: serde_json::Value =
        serde_json::from_str(&chain.gov.vpr().dump_rankers(0).unwrap()).unwrap();
    assert_eq!(dump[0]["Power"], json!(staking_min().to_string()));
}

#[test]
fn test_create_proposal_then_vote() {
    let mut config = pos_governance::GovernanceConfig::default();
    config.proposals.retain(|p| p.id != "NAMEPRICE");
    let mut chain = Chain::with_config(config, 2);
    let mut sender = named_account(aergo(100_000));
    chain.stake(&mut sender, staking_min(), 0).unwrap();

    let err = chain
        .exec(&mut sender, Amount::default(), &vote_dao_payload("nameprice", &["2000000000000000000"]), DAY)
        .unwrap_err();
    assert!(matches!(err, GovernanceError::ProposalNotFound(_)));

    let create = json!({
        "Name": "v1createProposal",
        "Args": ["nameprice", "0", "0", "1", "name price", []]
    })
    .to_string();
    let event = chain.exec(&mut sender, aergo(1), &create, 1).unwrap();
    assert_eq!(event.event_name, "createProposal");
    assert!(event
        .json_args
        .starts_with(&format!(r#"{{"who":"{}", "Proposal":{{"ID":"NAMEPRICE""#, SENDER)));
    assert_eq!(chain.system.balance(), &(staking_min() + aergo(1)));

    let again = chain.exec(&mut sender, aergo(1), &create, 2).unwrap_err();
    assert!(matches!(again, GovernanceError::ProposalAlreadyExists(_)));

    chain
        .exec(&mut sender, Amount::default(), &vote_dao_payload("nameprice", &["2000000000000000000"]), DAY)
        .unwrap();
}

#[test]
fn test_genesis_vote_result() {
    let mut chain = Chain::new(2);
    let tally = std::collections::BTreeMap::from([
        (peer_id(1), aergo(5)),
        (peer_id(2), aergo(9)),
    ]);
    chain.gov.init_vote_result(&tally).unwrap();
    assert_eq!(chain.gov.bp_rankers(2).unwrap(), vec![peer_id(2), peer_id(1)]);
}

#[test]
fn test_full_rank_evicts_and_rejects_ties() {
    let config = GovernanceConfig {
        vpr_max: 2,
        ..GovernanceConfig::default()
    };
    let mut chain = Chain::with_config(config, 2);
    let mut voters: Vec<AccountState> = (1..=5).map(|i| account(i, aergo(100_000))).collect();
    for (voter, n) in voters.iter_mut().zip([2u32, 3, 1, 2, 4]) {
        chain.stake(voter, staking_min() * n, 0).unwrap();
    }

    let ids: Vec<AccountId> = voters.iter().map(AccountState::id).collect();
    let payload = vote_bp_payload(&[1]);
    for voter in voters.iter_mut().take(2) {
        chain.exec(voter, Amount::default(), &payload, DAY).unwrap();
    }
    assert_eq!(chain.gov.vpr().len(), 2);

    // below and equal to the lowest ranker are both turned away
    for voter in voters[2..4].iter_mut() {
        chain.exec(voter, Amount::default(), &payload, DAY).unwrap();
    }
    assert_eq!(chain.gov.vpr().voting_power_of(&ids[2]), None);
    assert_eq!(chain.gov.vpr().voting_power_of(&ids[3]), None);
    assert_eq!(chain.gov.vpr().voting_power_of(&ids[0]), Some(&(staking_min() * 2u32)));

    chain.exec(&mut voters[4], Amount::default(), &payload, DAY).unwrap();
    let vpr = chain.gov.vpr();
    assert_eq!(vpr.len(), 2);
    assert_eq!(vpr.voting_power_of(&ids[0]), None);
    assert_eq!(vpr.voting_power_of(&ids[1]), Some(&(staking_min() * 3u32)));
    assert_eq!(vpr.voting_power_of(&ids[4]), Some(&(staking_min() * 4u32)));
    assert_eq!(vpr.total_power(), &(staking_min() * 7u32));
}

#[test]
fn test_proposal_default_seeds_params() {
    let yaml = "proposals:\n  - ID: GASPRICE\n    MultipleChoice: 1\n    Default: \"100\"\n";
    let chain = Chain::with_config(GovernanceConfig::from_yaml_str(yaml).unwrap(), 2);
    assert_eq!(chain.gov.params().gas_price(), Amount::from(100u32));
    assert_eq!(chain.gov.bp_count(), 3);
}
