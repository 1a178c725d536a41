//! Unit of work for a single invocation.
//!
//! A [`Transaction`] simulates an invocation against a read-only view of the
//! ledger. Writes are buffered in a [`WriteSet`] and are visible to later
//! reads in the same transaction; nothing reaches the ledger until the
//! platform hands the write set to [`Ledger::commit`](crate::store::Ledger::commit).
//! Dropping a transaction discards every buffered write.
//!
//! The transaction also records the version of every key it read from the
//! ledger, so that the platform can reject the commit when another invocation
//! modified one of those keys in the meantime.

use crate::store::{KeyValueStore, StateReader, StoreError};
use std::cell::RefCell;
use std::collections::BTreeMap;

/// The outcome of a transaction: the keys it read and the writes it made.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSet {
    reads: BTreeMap<String, Option<u64>>,
    writes: BTreeMap<String, Vec<u8>>,
}

impl WriteSet {
    /// Versions observed for every key read from the ledger.
    #[must_use]
    pub const fn reads(&self) -> &BTreeMap<String, Option<u64>> {
        &self.reads
    }

    /// Buffered writes, ordered by key.
    #[must_use]
    pub const fn writes(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.writes
    }

    /// Number of buffered writes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Whether the transaction wrote nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Consume the write set, yielding its writes.
    #[must_use]
    pub fn into_writes(self) -> BTreeMap<String, Vec<u8>> {
        self.writes
    }
}

/// Read-your-writes view over a ledger for one invocation.
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
///
/// let mut tx = Transaction::new(&ledger);
/// tx.put("RX1", b"record".to_vec())?;
/// assert_eq!(tx.get("RX1")?, Some(b"record".to_vec()));
/// assert_eq!(ledger.get("RX1")?, None);
///
/// ledger.commit(tx.into_write_set())?;
/// assert_eq!(ledger.get("RX1")?, Some(b"record".to_vec()));
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub struct Transaction<'a, R: StateReader + ?Sized> {
    reader: &'a R,
    reads: RefCell<BTreeMap<String, Option<u64>>>,
    writes: BTreeMap<String, Vec<u8>>,
}

impl<'a, R: StateReader + ?Sized> Transaction<'a, R> {
    /// Begin a transaction over `reader`.
    #[must_use]
    pub const fn new(reader: &'a R) -> Self {
        Self {
            reader,
            reads: RefCell::new(BTreeMap::new()),
            writes: BTreeMap::new(),
        }
    }

    /// Finish the transaction, yielding what it read and wrote.
    #[must_use]
    pub fn into_write_set(self) -> WriteSet {
        WriteSet {
            reads: self.reads.into_inner(),
            writes: self.writes,
        }
    }

    /// Number of writes buffered so far.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    fn record_read(&self, key: &str) -> Result<(), StoreError> {
        if self.reads.borrow().contains_key(key) {
            return Ok(());
        }
        let version = self.reader.version(key)?;
        self.reads.borrow_mut().insert(key.to_string(), version);
        Ok(())
    }
}

impl<R: StateReader + ?Sized> StateReader for Transaction<'_, R> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if let Some(value) = self.writes.get(key) {
            return Ok(Some(value.clone()));
        }
        self.record_read(key)?;
        self.reader.get(key)
    }

    fn range_scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let mut merged: BTreeMap<String, Vec<u8>> =
            self.reader.range_scan(prefix)?.into_iter().collect();

        for (key, value) in self
            .writes
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
        {
            merged.insert(key.clone(), value.clone());
        }

        Ok(merged.into_iter().collect())
    }

    fn version(&self, key: &str) -> Result<Option<u64>, StoreError> {
        self.reader.version(key)
    }
}

impl<R: StateReader + ?Sized> KeyValueStore for Transaction<'_, R> {
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey("key cannot be empty".to_string()));
        }
        self.writes.insert(key.to_string(), value);
        Ok(())
    }
}
