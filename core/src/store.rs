//! Key-value store abstraction and composite keys.
//!
//! This module defines the contract a ledger platform offers to a contract:
//!
//! - [`StateReader`]: point reads and prefix range scans over committed state
//! - [`KeyValueStore`]: the invocation's read/write view (reads plus `put`)
//! - [`Ledger`]: the platform side, which atomically commits a [`WriteSet`]
//!
//! Secondary indexes are emulated with composite keys built by
//! [`make_composite_key`] and decomposed by [`split_composite_key`]. A
//! composite key is the namespace followed by each component, every piece
//! preceded by U+0000 and the whole key terminated by U+0000:
//!
//! ```text
//! \0patient~prescription\0PAT1\0RX1\0
//! ```
//!
//! Because every component is terminated, the key built from a leading subset
//! of the components is a strict prefix of the full key and can be handed to
//! [`StateReader::range_scan`] as-is.

use crate::transaction::WriteSet;
use thiserror::Error;

/// Delimiter used between composite key components.
pub const COMPOSITE_KEY_DELIMITER: char = '\u{0}';

/// Errors that can occur during store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The key cannot be stored or decomposed.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// A key read by the transaction was modified before it committed.
    #[error("Read conflict on key {key:?}: expected version {expected:?}, found {actual:?}")]
    ReadConflict {
        /// The conflicting key.
        key: String,
        /// Version observed when the transaction read the key.
        expected: Option<u64>,
        /// Version present at commit time.
        actual: Option<u64>,
    },

    /// The backing storage failed.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Read access to ledger state.
pub trait StateReader {
    /// Read the value stored under `key`.
    ///
    /// Returns `None` when the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Return every `(key, value)` whose key starts with `prefix`.
    ///
    /// Result order is whatever the backend yields and is not part of the
    /// contract.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    fn range_scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError>;

    /// Commit version of `key`, if the backend tracks versions.
    ///
    /// Used to detect concurrent modification between read and commit.
    /// The default reports no version, which disables conflict detection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    fn version(&self, _key: &str) -> Result<Option<u64>, StoreError> {
        Ok(None)
    }
}

/// The read/write view of the ledger available to one invocation.
pub trait KeyValueStore: StateReader {
    /// Write `value` under `key`.
    ///
    /// The write only becomes durable if the surrounding unit of work
    /// commits.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the key is invalid or the backend fails.
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;
}

/// A ledger platform that can atomically commit write sets.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; a platform may run invocations
/// on several threads against the same committed state.
pub trait Ledger: StateReader + Send + Sync {
    /// Apply every write in `write_set`, or none of them.
    ///
    /// # Errors
    ///
    /// - `ReadConflict`: a key read by the transaction changed since it was read
    /// - `Backend`: the backing storage failed
    fn commit(&self, write_set: WriteSet) -> Result<(), StoreError>;
}

/// Build a composite key from a namespace and its components.
///
/// Passing only a leading subset of the components yields the prefix for a
/// partial-key range scan.
///
/// # Errors
///
/// Returns [`StoreError::InvalidKey`] if the namespace is empty or any piece
/// contains the U+0000 delimiter.
///
/// # Examples
///
/// ```
/// use rxledger_core::store::{make_composite_key, split_composite_key};
///
/// let key = make_composite_key("patient~prescription", &["PAT1", "RX1"]).unwrap();
/// let prefix = make_composite_key("patient~prescription", &["PAT1"]).unwrap();
/// assert!(key.starts_with(&prefix));
///
/// let (namespace, parts) = split_composite_key(&key).unwrap();
/// assert_eq!(namespace, "patient~prescription");
/// assert_eq!(parts, vec!["PAT1".to_string(), "RX1".to_string()]);
/// ```
pub fn make_composite_key(namespace: &str, parts: &[&str]) -> Result<String, StoreError> {
    if namespace.is_empty() {
        return Err(StoreError::InvalidKey(
            "composite key namespace cannot be empty".to_string(),
        ));
    }

    let capacity = namespace.len() + parts.iter().map(|p| p.len() + 1).sum::<usize>() + 2;
    let mut key = String::with_capacity(capacity);
    key.push(COMPOSITE_KEY_DELIMITER);

    for piece in std::iter::once(&namespace).chain(parts) {
        if piece.contains(COMPOSITE_KEY_DELIMITER) {
            return Err(StoreError::InvalidKey(format!(
                "composite key component {piece:?} contains the U+0000 delimiter"
            )));
        }
        key.push_str(piece);
        key.push(COMPOSITE_KEY_DELIMITER);
    }

    Ok(key)
}

/// Split a composite key back into its namespace and components.
///
/// # Errors
///
/// Returns [`StoreError::InvalidKey`] if `key` was not built by
/// [`make_composite_key`].
pub fn split_composite_key(key: &str) -> Result<(String, Vec<String>), StoreError> {
    let body = key
        .strip_prefix(COMPOSITE_KEY_DELIMITER)
        .and_then(|rest| rest.strip_suffix(COMPOSITE_KEY_DELIMITER))
        .ok_or_else(|| StoreError::InvalidKey(format!("{key:?} is not a composite key")))?;

    let mut pieces = body.split(COMPOSITE_KEY_DELIMITER).map(str::to_string);
    let namespace = pieces.next().unwrap_or_default();
    if namespace.is_empty() {
        return Err(StoreError::InvalidKey(format!(
            "{key:?} has an empty namespace"
        )));
    }

    Ok((namespace, pieces.collect()))
}

/// Check that `key` can be used as a simple (non-composite) key.
///
/// Simple keys may not begin with U+0000; that space belongs to composite
/// keys.
///
/// # Errors
///
/// Returns [`StoreError::InvalidKey`] if `key` is empty or starts with the
/// composite key delimiter.
pub fn validate_simple_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey("key cannot be empty".to_string()));
    }
    if key.starts_with(COMPOSITE_KEY_DELIMITER) {
        return Err(StoreError::InvalidKey(format!(
            "simple key {key:?} starts with the U+0000 composite key delimiter"
        )));
    }
    Ok(())
}
