//! Parameter registry
//!
//! Four protocol parameters governed by DAO votes. Each has a *current*
//! value read by the rest of the node and a pending *next* value written by
//! a vote that crosses its threshold. [`SystemParams::commit`] publishes the
//! pending values at block commit, giving a one-block publication delay.
//!
//! The registry is the only governance state read from outside the block
//! execution path (RPC gas price queries), so it sits behind a
//! reader-writer lock.

use crate::error::{GovernanceError, Result};
use crate::keys;
use crate::store::{get_nonempty, Backend, ContractState, DataGetter, DataSetter};
use crate::types::{aergo, amount_from_bytes, amount_to_bytes, gaer, Amount};
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Largest accepted BP count
pub const MAX_BP_COUNT: u64 = 100;

/// Governed parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ParamId {
    BpCount,
    StakingMin,
    GasPrice,
    NamePrice,
}

impl ParamId {
    pub const ALL: [ParamId; 4] = [
        ParamId::BpCount,
        ParamId::StakingMin,
        ParamId::GasPrice,
        ParamId::NamePrice,
    ];

    /// Upper-case identifier, also the proposal ID
    pub fn id(&self) -> &'static str {
        match self {
            ParamId::BpCount => "BPCOUNT",
            ParamId::StakingMin => "STAKINGMIN",
            ParamId::GasPrice => "GASPRICE",
            ParamId::NamePrice => "NAMEPRICE",
        }
    }

    /// Case-insensitive lookup
    pub fn parse(id: &str) -> Option<Self> {
        let upper = id.to_uppercase();
        Self::ALL.into_iter().find(|p| p.id() == upper)
    }

    /// Accepted value range, inclusive
    pub fn range(&self) -> (Amount, Amount) {
        let max_aer = aergo(500) * BigUint::from(10u32).pow(6);
        match self {
            ParamId::BpCount => (BigUint::from(1u32), BigUint::from(MAX_BP_COUNT)),
            ParamId::StakingMin | ParamId::NamePrice => (aergo(1), max_aer),
            ParamId::GasPrice => (BigUint::from(1u32), aergo(5) * BigUint::from(10u32).pow(8)),
        }
    }

    pub fn validate(&self, value: &Amount) -> bool {
        let (min, max) = self.range();
        !value.is_zero() && *value >= min && *value <= max
    }

    /// Parse a decimal vote candidate and check its range
    pub fn parse_value(&self, candidate: &str) -> Result<Amount> {
        let value = parse_decimal(candidate).ok_or(GovernanceError::InvalidNumber)?;
        if !self.validate(&value) {
            return Err(GovernanceError::InvalidNumberRange);
        }
        Ok(value)
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ParamId {
    type Err = GovernanceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| GovernanceError::ProposalNotFound(s.to_string()))
    }
}

impl TryFrom<String> for ParamId {
    type Error = GovernanceError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ParamId> for String {
    fn from(id: ParamId) -> Self {
        id.id().to_string()
    }
}

/// Strict base-10 parse, digits only
pub fn parse_decimal(s: &str) -> Option<Amount> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    BigUint::parse_bytes(s.as_bytes(), 10)
}

/// Default value of each parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDefaults {
    pub bp_count: Amount,
    pub staking_min: Amount,
    pub gas_price: Amount,
    pub name_price: Amount,
}

impl ParamDefaults {
    /// Fixed defaults with BPCOUNT from the consensus configuration
    pub fn new(bp_count: u64) -> Self {
        Self {
            bp_count: BigUint::from(bp_count),
            staking_min: aergo(10_000),
            gas_price: gaer(50),
            name_price: aergo(1),
        }
    }

    pub fn get(&self, id: ParamId) -> &Amount {
        match id {
            ParamId::BpCount => &self.bp_count,
            ParamId::StakingMin => &self.staking_min,
            ParamId::GasPrice => &self.gas_price,
            ParamId::NamePrice => &self.name_price,
        }
    }

    pub fn set(&mut self, id: ParamId, value: Amount) {
        match id {
            ParamId::BpCount => self.bp_count = value,
            ParamId::StakingMin => self.staking_min = value,
            ParamId::GasPrice => self.gas_price = value,
            ParamId::NamePrice => self.name_price = value,
        }
    }
}

/// Current and pending values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamTable {
    current: BTreeMap<ParamId, Amount>,
    next: BTreeMap<ParamId, Amount>,
}

impl ParamTable {
    /// Read every persisted value, falling back to the defaults
    pub fn load<G: DataGetter + ?Sized>(g: &G, defaults: &ParamDefaults) -> Result<Self> {
        let mut current = BTreeMap::new();
        for id in ParamId::ALL {
            let value = match get_nonempty(g, &keys::param_key(id.id()))? {
                Some(data) => amount_from_bytes(&data),
                None => defaults.get(id).clone(),
            };
            current.insert(id, value);
        }
        Ok(Self {
            current,
            next: BTreeMap::new(),
        })
    }

    pub fn current(&self, id: ParamId) -> Option<&Amount> {
        self.current.get(&id)
    }

    pub fn next(&self, id: ParamId) -> Option<&Amount> {
        self.next.get(&id)
    }
}

/// Process-wide parameter registry
#[derive(Debug)]
pub struct SystemParams {
    defaults: ParamDefaults,
    table: RwLock<ParamTable>,
}

impl SystemParams {
    /// Registry holding only the defaults
    pub fn new(defaults: ParamDefaults) -> Self {
        let current = ParamId::ALL
            .into_iter()
            .map(|id| (id, defaults.get(id).clone()))
            .collect();
        Self {
            defaults,
            table: RwLock::new(ParamTable {
                current,
                next: BTreeMap::new(),
            }),
        }
    }

    /// Registry initialized from persisted values
    pub fn load<G: DataGetter + ?Sized>(g: &G, defaults: ParamDefaults) -> Result<Self> {
        let table = ParamTable::load(g, &defaults)?;
        Ok(Self {
            defaults,
            table: RwLock::new(table),
        })
    }

    /// Replace the whole table from persisted values, dropping pending ones
    pub fn reload<G: DataGetter + ?Sized>(&self, g: &G) -> Result<()> {
        let table = ParamTable::load(g, &self.defaults)?;
        *self.table.write() = table;
        info!("reloaded system parameters");
        Ok(())
    }

    pub fn defaults(&self) -> &ParamDefaults {
        &self.defaults
    }

    /// Copy of the current table
    pub fn snapshot(&self) -> ParamTable {
        self.table.read().clone()
    }

    /// Current value
    pub fn get(&self, id: ParamId) -> Amount {
        self.table
            .read()
            .current(id)
            .cloned()
            .unwrap_or_else(|| self.defaults.get(id).clone())
    }

    /// Value the next block will see: pending, else current, else default
    pub fn get_next_block_param(&self, id: ParamId) -> Amount {
        let table = self.table.read();
        table
            .next(id)
            .or_else(|| table.current(id))
            .cloned()
            .unwrap_or_else(|| self.defaults.get(id).clone())
    }

    /// Put back a table taken with [`snapshot`](Self::snapshot)
    pub fn restore(&self, table: ParamTable) {
        *self.table.write() = table;
    }

    pub fn set(&self, id: ParamId, value: Amount) {
        self.table.write().current.insert(id, value);
    }

    pub fn set_next(&self, id: ParamId, value: Amount) {
        self.table.write().next.insert(id, value);
    }

    pub fn del_next(&self, id: ParamId) {
        self.table.write().next.remove(&id);
    }

    /// Publish (`apply`) or drop the pending values
    pub fn commit(&self, apply: bool) {
        let mut table = self.table.write();
        let next = std::mem::take(&mut table.next);
        if apply {
            for (id, value) in next {
                info!(param = %id, value = %value, "parameter changed");
                table.current.insert(id, value);
            }
        }
    }

    /// Persist a voted value and stage it for the next block
    pub fn update<S: DataSetter + ?Sized>(&self, s: &mut S, id: ParamId, value: Amount) -> Result<()> {
        s.set_data(&keys::param_key(id.id()), &amount_to_bytes(&value))?;
        self.set_next(id, value);
        Ok(())
    }

    pub fn bp_count(&self) -> u64 {
        self.get(ParamId::BpCount).to_u64().unwrap_or(MAX_BP_COUNT)
    }

    pub fn staking_minimum(&self) -> Amount {
        self.get(ParamId::StakingMin)
    }

    pub fn gas_price(&self) -> Amount {
        self.get(ParamId::GasPrice)
    }

    pub fn name_price(&self) -> Amount {
        self.get(ParamId::NamePrice)
    }

    /// Durable value as of the start of the block, else the default
    pub fn get_from_state<B>(&self, scs: &ContractState<B>, id: ParamId) -> Result<Amount>
    where
        B: Backend,
    {
        Ok(param_from_state(scs, id)?.unwrap_or_else(|| self.defaults.get(id).clone()))
    }

    pub fn staking_minimum_from_state<B: Backend>(
        &self,
        scs: &ContractState<B>,
    ) -> Result<Amount> {
        self.get_from_state(scs, ParamId::StakingMin)
    }

    pub fn gas_price_from_state<B: Backend>(
        &self,
        scs: &ContractState<B>,
    ) -> Result<Amount> {
        self.get_from_state(scs, ParamId::GasPrice)
    }

    pub fn name_price_from_state<B: Backend>(
        &self,
        scs: &ContractState<B>,
    ) -> Result<Amount> {
        self.get_from_state(scs, ParamId::NamePrice)
    }

    pub fn bp_count_from_state<B: Backend>(
        &self,
        scs: &ContractState<B>,
    ) -> Result<u64> {
        Ok(self
            .get_from_state(scs, ParamId::BpCount)?
            .to_u64()
            .unwrap_or(MAX_BP_COUNT))
    }
}

/// Durable value of `id` ignoring writes pending in this block
pub fn param_from_state<B: Backend>(
    scs: &ContractState<B>,
    id: ParamId,
) -> Result<Option<Amount>> {
    Ok(scs
        .get_initial_data(&keys::param_key(id.id()))?
        .filter(|data| !data.is_empty())
        .map(|data| amount_from_bytes(&data)))
}
