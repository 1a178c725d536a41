//! In-process ledger backed by an ordered map.
//!
//! [`InMemoryLedger`] is the reference [`Ledger`]: committed state lives in a
//! `BTreeMap`, so range scans come back in lexicographic key order. That
//! ordering is a property of this backend only.
//!
//! Every commit advances a height counter; each key remembers the height of
//! the commit that last wrote it, which serves as its version for read
//! conflict detection.

use crate::store::{Ledger, StateReader, StoreError};
use crate::transaction::WriteSet;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
struct LedgerState {
    height: u64,
    entries: BTreeMap<String, VersionedValue>,
}

#[derive(Debug, Clone)]
struct VersionedValue {
    value: Vec<u8>,
    version: u64,
}

/// Thread-safe in-memory ledger.
///
/// Cloning shares the underlying state.
///
/// # Example
///
/// ```
/// use rxledger_core::memory::InMemoryLedger;
/// use rxledger_core::store::{KeyValueStore, Ledger, StateReader};
/// use rxledger_core::transaction::Transaction;
///
/// # fn example() -> Result<(), rxledger_core::store::StoreError> {
/// let ledger = InMemoryLedger::new();
/// let mut tx = Transaction::new(&ledger);
/// tx.put("a", vec![1])?;
/// ledger.commit(tx.into_write_set())?;
///
/// assert_eq!(ledger.height()?, 1);
/// assert_eq!(ledger.version("a")?, Some(1));
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful commits so far.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the lock is poisoned.
    pub fn height(&self) -> Result<u64, StoreError> {
        Ok(self.read()?.height)
    }

    /// Number of keys in committed state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.entries.len())
    }

    /// Whether committed state is empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.read()?.entries.is_empty())
    }

    /// All committed keys, in order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the lock is poisoned.
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.read()?.entries.keys().cloned().collect())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, LedgerState>, StoreError> {
        self.state
            .read()
            .map_err(|e| StoreError::Backend(format!("ledger lock poisoned: {e}")))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, LedgerState>, StoreError> {
        self.state
            .write()
            .map_err(|e| StoreError::Backend(format!("ledger lock poisoned: {e}")))
    }
}

impl StateReader for InMemoryLedger {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.read()?.entries.get(key).map(|v| v.value.clone()))
    }

    fn range_scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let state = self.read()?;
        Ok(state
            .entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, v)| (key.clone(), v.value.clone()))
            .collect())
    }

    fn version(&self, key: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.read()?.entries.get(key).map(|v| v.version))
    }
}

impl Ledger for InMemoryLedger {
    fn commit(&self, write_set: WriteSet) -> Result<(), StoreError> {
        let mut state = self.write()?;

        for (key, expected) in write_set.reads() {
            let actual = state.entries.get(key).map(|v| v.version);
            if actual != *expected {
                tracing::warn!(key = %key.escape_debug(), ?expected, ?actual, "Rejecting commit on read conflict");
                return Err(StoreError::ReadConflict {
                    key: key.clone(),
                    expected: *expected,
                    actual,
                });
            }
        }

        state.height += 1;
        let version = state.height;
        let count = write_set.len();
        for (key, value) in write_set.into_writes() {
            state.entries.insert(key, VersionedValue { value, version });
        }

        tracing::debug!(height = version, writes = count, "Applied write set");
        Ok(())
    }
}
