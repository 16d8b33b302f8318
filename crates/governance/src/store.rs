//! Contract state facade
//!
//! The system account owns a flat byte-keyed namespace. Every governance
//! component reads and writes through [`DataGetter`] and [`DataSetter`];
//! [`ContractState`] layers two write buffers over a durable [`Backend`]:
//!
//! - a transaction buffer, merged into the block buffer on success and
//!   dropped on failure
//! - a block buffer, written to the backend by [`ContractState::apply`] or
//!   dropped by [`ContractState::discard`]

use crate::error::Result;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Read access to the governance namespace
pub trait DataGetter {
    fn get_data(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
}

/// Write access to the governance namespace
pub trait DataSetter {
    fn set_data(&mut self, key: &[u8], value: &[u8]) -> Result<()>;
}

/// Durable key-value store supplied by the host
pub trait Backend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Write all entries atomically
    fn write_batch(&mut self, batch: BTreeMap<Vec<u8>, Vec<u8>>) -> Result<()>;
}

/// In-memory backend
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Backend for MemoryBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.get(key).cloned())
    }

    fn write_batch(&mut self, batch: BTreeMap<Vec<u8>, Vec<u8>>) -> Result<()> {
        self.data.extend(batch);
        Ok(())
    }
}

/// Buffered view of the system account's namespace
#[derive(Debug, Clone)]
pub struct ContractState<B: Backend = MemoryBackend> {
    backend: B,
    block: BTreeMap<Vec<u8>, Vec<u8>>,
    tx: Option<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl ContractState<MemoryBackend> {
    /// State over a fresh in-memory backend
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }
}

impl<B: Backend> ContractState<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            block: BTreeMap::new(),
            tx: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Value as of the last [`apply`](Self::apply), ignoring pending writes
    pub fn get_initial_data(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.backend.get(key)
    }

    /// Open a transaction buffer
    pub fn begin_tx(&mut self) {
        if self.tx.is_some() {
            debug!("nested transaction requested, keeping outer buffer");
            return;
        }
        self.tx = Some(BTreeMap::new());
    }

    /// Merge the transaction buffer into the block buffer
    pub fn commit_tx(&mut self) {
        if let Some(writes) = self.tx.take() {
            self.block.extend(writes);
        }
    }

    /// Drop every write made since [`begin_tx`](Self::begin_tx)
    pub fn rollback_tx(&mut self) {
        if let Some(writes) = self.tx.take() {
            debug!(dropped = writes.len(), "rolled back transaction writes");
        }
    }

    /// Flush buffered writes to the backend
    pub fn apply(&mut self) -> Result<()> {
        self.commit_tx();
        let batch = std::mem::take(&mut self.block);
        debug!(entries = batch.len(), "applying contract state");
        self.backend.write_batch(batch)
    }

    /// Drop all buffered writes
    pub fn discard(&mut self) {
        self.tx = None;
        self.block.clear();
    }

    /// Number of buffered writes
    pub fn pending(&self) -> usize {
        self.block.len() + self.tx.as_ref().map_or(0, |tx| tx.len())
    }
}

impl<B: Backend> DataGetter for ContractState<B> {
    fn get_data(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(value) = self.tx.as_ref().and_then(|tx| tx.get(key)) {
            return Ok(Some(value.clone()));
        }
        if let Some(value) = self.block.get(key) {
            return Ok(Some(value.clone()));
        }
        self.backend.get(key)
    }
}

impl<B: Backend> DataSetter for ContractState<B> {
    fn set_data(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        trace!(key = %hex::encode(key), len = value.len(), "set data");
        match self.tx.as_mut() {
            Some(tx) => tx.insert(key.to_vec(), value.to_vec()),
            None => self.block.insert(key.to_vec(), value.to_vec()),
        };
        Ok(())
    }
}

/// Read a value, treating an empty value like an absent one
pub(crate) fn get_nonempty<G: DataGetter + ?Sized>(g: &G, key: &[u8]) -> Result<Option<Vec<u8>>> {
    Ok(g.get_data(key)?.filter(|v| !v.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_rollback_drops_writes() {
        let mut state = ContractState::in_memory();
        state.set_data(b"a", b"1").unwrap();

        state.begin_tx();
        state.set_data(b"a", b"2").unwrap();
        state.set_data(b"b", b"3").unwrap();
        assert_eq!(state.get_data(b"a").unwrap(), Some(b"2".to_vec()));
        state.rollback_tx();

        assert_eq!(state.get_data(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(state.get_data(b"b").unwrap(), None);
    }

    #[test]
    fn test_apply_and_initial_data() {
        let mut state = ContractState::in_memory();
        state.begin_tx();
        state.set_data(b"k", b"v").unwrap();
        state.commit_tx();
        assert_eq!(state.get_initial_data(b"k").unwrap(), None);

        state.apply().unwrap();
        assert_eq!(state.get_initial_data(b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(state.pending(), 0);
    }

    #[test]
    fn test_discard() {
        let mut state = ContractState::in_memory();
        state.set_data(b"k", b"v").unwrap();
        state.discard();
        assert_eq!(state.get_data(b"k").unwrap(), None);
        assert!(state.backend().is_empty());
    }

    #[test]
    fn test_empty_value_reads_as_absent() {
        let mut state = ContractState::in_memory();
        state.set_data(b"k", b"").unwrap();
        assert_eq!(get_nonempty(&state, b"k").unwrap(), None);
    }
}
