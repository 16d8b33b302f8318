//! Shared fixtures for governance integration tests

#![allow(dead_code)]

use pos_governance::types::aergo;
use pos_governance::vote::PEER_ID_LENGTH;
use pos_governance::{
    AccountState, Address, Amount, BlockInfo, Event, Governance, GovernanceConfig, Result, TxBody,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

pub const SENDER: &str = "AmPNYHyzyh9zweLwDyuoiUuTVCdrdksxkRWDjVJS76WQLExa2Jr4";

pub const DAY: u64 = 60 * 60 * 24;

pub fn staking_min() -> Amount {
    aergo(10_000)
}

/// Governance over an in-memory store plus the system account
pub struct Chain {
    pub gov: Governance,
    pub system: AccountState,
    pub fork: i32,
}

impl Chain {
    pub fn new(fork: i32) -> Self {
        Self::with_config(GovernanceConfig::default(), fork)
    }

    pub fn with_config(config: GovernanceConfig, fork: i32) -> Self {
        init_tracing();
        Self {
            gov: Governance::in_memory(config).expect("governance"),
            system: AccountState::new(Address::system(), Amount::default()),
            fork,
        }
    }

    pub fn exec_raw(
        &mut self,
        sender: &mut AccountState,
        amount: Amount,
        payload: &[u8],
        block_no: u64,
    ) -> Result<Vec<Event>> {
        let tx = TxBody::new(sender.address().clone(), amount, payload.to_vec());
        self.gov
            .execute(&tx, sender, &mut self.system, BlockInfo::new(block_no, self.fork))
    }

    pub fn exec(&mut self, sender: &mut AccountState, amount: Amount, payload: &str, block_no: u64) -> Result<Event> {
        let mut events = self.exec_raw(sender, amount, payload.as_bytes(), block_no)?;
        assert_eq!(events.len(), 1);
        Ok(events.remove(0))
    }

    pub fn stake(&mut self, sender: &mut AccountState, amount: Amount, block_no: u64) -> Result<Event> {
        self.exec(sender, amount, &stake_payload(), block_no)
    }

    pub fn unstake(&mut self, sender: &mut AccountState, amount: Amount, block_no: u64) -> Result<Event> {
        self.exec(sender, amount, &unstake_payload(), block_no)
    }
}

/// Log to the test writer, filtered by `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Account with a synthetic 33-byte address
pub fn account(seed: u8, balance: Amount) -> AccountState {
    AccountState::new(Address::new(vec![seed; 33]), balance)
}

pub fn named_account(balance: Amount) -> AccountState {
    AccountState::new(Address::decode(SENDER).expect("address"), balance)
}

pub fn peer(seed: u8) -> Vec<u8> {
    vec![seed; PEER_ID_LENGTH]
}

pub fn peer_id(seed: u8) -> String {
    bs58::encode(peer(seed)).into_string()
}

pub fn stake_payload() -> String {
    json!({"Name": "v1stake"}).to_string()
}

pub fn unstake_payload() -> String {
    json!({"Name": "v1unstake"}).to_string()
}

pub fn vote_bp_payload(seeds: &[u8]) -> String {
    let peers: Vec<String> = seeds.iter().copied().map(peer_id).collect();
    json!({"Name": "v1voteBP", "Args": peers}).to_string()
}

pub fn vote_dao_payload(id: &str, values: &[&str]) -> String {
    let mut args = vec![json!(id)];
    args.extend(values.iter().map(|v| json!(v)));
    json!({"Name": "v1voteDAO", "Args": args}).to_string()
}
