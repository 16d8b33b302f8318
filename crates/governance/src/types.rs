//! Core chain types consumed by the governance subsystem
//!
//! Addresses, account identifiers, amounts, block metadata and the mutable
//! account view handed over by the host for the duration of a transaction.

use crate::error::{GovernanceError, Result};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of a public-key address in bytes (compressed secp256k1 point)
pub const ADDRESS_LENGTH: usize = 33;

/// Base58check version byte of encoded addresses
pub const ADDRESS_VERSION: u8 = 0x42;

/// Name of the system account owning the governance namespace
pub const SYSTEM_ACCOUNT: &str = "aergo.system";

/// Named accounts that are addressed by name instead of by key
const SPECIAL_ACCOUNTS: [&str; 4] = ["aergo.system", "aergo.name", "aergo.enterprise", "aergo.vault"];

/// Block number
pub type BlockNo = u64;

/// Fork version tag carried by each block
pub type ForkVersion = i32;

/// Arbitrary precision non-negative monetary amount
pub type Amount = BigUint;

/// 10^18, the number of base units in one whole coin
pub fn one_aergo() -> Amount {
    BigUint::from(10u32).pow(18)
}

/// `n` whole coins in base units
pub fn aergo(n: u64) -> Amount {
    BigUint::from(n) * one_aergo()
}

/// `n` gaer (10^9 base units)
pub fn gaer(n: u64) -> Amount {
    BigUint::from(n) * BigUint::from(1_000_000_000u64)
}

/// Big-endian magnitude bytes, empty for zero
pub fn amount_to_bytes(amount: &Amount) -> Vec<u8> {
    if amount.is_zero() {
        Vec::new()
    } else {
        amount.to_bytes_be()
    }
}

/// Amount from big-endian bytes, empty means zero
pub fn amount_from_bytes(bytes: &[u8]) -> Amount {
    BigUint::from_bytes_be(bytes)
}

/// Account address
///
/// Either a 33-byte public key or the UTF-8 name of a special account.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(Vec<u8>);

impl Address {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The system account `aergo.system`
    pub fn system() -> Self {
        Self(SYSTEM_ACCOUNT.as_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Decode a base58check address or a special account name
    pub fn decode(encoded: &str) -> Result<Self> {
        if SPECIAL_ACCOUNTS.contains(&encoded) {
            return Ok(Self(encoded.as_bytes().to_vec()));
        }
        let mut bytes = bs58::decode(encoded)
            .with_check(Some(ADDRESS_VERSION))
            .into_vec()
            .map_err(|_| GovernanceError::TxInvalidPayload)?;
        if bytes.len() == ADDRESS_LENGTH + 1 && bytes[0] == ADDRESS_VERSION {
            bytes.remove(0);
        }
        if bytes.len() != ADDRESS_LENGTH {
            return Err(GovernanceError::TxInvalidPayload);
        }
        Ok(Self(bytes))
    }

    /// Base58check text for key addresses, the raw name otherwise
    pub fn encode(&self) -> String {
        if self.0.len() != ADDRESS_LENGTH {
            return String::from_utf8_lossy(&self.0).into_owned();
        }
        bs58::encode(&self.0)
            .with_check_version(ADDRESS_VERSION)
            .into_string()
    }

    /// Account ID derived as sha256 of the address bytes
    pub fn account_id(&self) -> AccountId {
        let digest = Sha256::digest(&self.0);
        let mut id = [0u8; 32];
        id.copy_from_slice(&digest);
        AccountId(id)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.encode())
    }
}

/// Hashed account identifier
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let id: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(id))
    }

    pub fn from_base58(encoded: &str) -> Result<Self> {
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|_| GovernanceError::TxInvalidPayload)?;
        Self::from_slice(&bytes).ok_or(GovernanceError::TxInvalidPayload)
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.to_base58())
    }
}

/// Header fields visible to governance execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockInfo {
    /// Block number being executed
    pub no: BlockNo,

    /// Fork version of this block
    pub fork_version: ForkVersion,
}

impl BlockInfo {
    pub fn new(no: BlockNo, fork_version: ForkVersion) -> Self {
        Self { no, fork_version }
    }
}

/// Mutable account view owned by the host
///
/// Balances move between the sender and the system account while a command
/// runs; the host persists them after a successful transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    address: Address,
    id: AccountId,
    balance: Amount,
}

impl AccountState {
    pub fn new(address: Address, balance: Amount) -> Self {
        let id = address.account_id();
        Self { address, id, balance }
    }

    /// Account with an ID supplied by the host instead of derived from the address
    pub fn with_id(address: Address, id: AccountId, balance: Amount) -> Self {
        Self { address, id, balance }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn balance(&self) -> &Amount {
        &self.balance
    }

    pub fn add_balance(&mut self, amount: &Amount) {
        self.balance += amount;
    }

    pub fn sub_balance(&mut self, amount: &Amount) -> Result<()> {
        if self.balance < *amount {
            return Err(GovernanceError::InsufficientBalance);
        }
        self.balance -= amount;
        Ok(())
    }

    pub(crate) fn set_balance(&mut self, balance: Amount) {
        self.balance = balance;
    }
}

/// Governance transaction body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxBody {
    /// Sender address
    pub account: Address,

    /// Recipient, always the system account for governance transactions
    pub recipient: Address,

    /// Amount attached to the transaction
    pub amount: Amount,

    /// Call payload
    pub payload: Vec<u8>,

    /// Whether the fee is paid by the recipient contract
    pub fee_delegation: bool,
}

impl TxBody {
    pub fn new(account: Address, amount: Amount, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            account,
            recipient: Address::system(),
            amount,
            payload: payload.into(),
            fee_delegation: false,
        }
    }
}
