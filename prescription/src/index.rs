//! Patient → prescriptions secondary index.
//!
//! Each prescription gets its own index key, the composite of
//! `(patient id, prescription id)` in the `patient~prescription` namespace,
//! with a one-byte marker as value. Only the key's existence matters.
//! Storing one key per pair instead of a per-patient list means two
//! prescriptions for the same patient never write the same key.
//!
//! Entries are only ever added.

use crate::error::Result;
use rxledger_core::store::{
    KeyValueStore, StateReader, make_composite_key, split_composite_key,
};

/// Namespace of patient index keys.
pub const PATIENT_INDEX: &str = "patient~prescription";

/// Value stored under every index key.
pub const INDEX_MARKER: &[u8] = &[0];

/// Index key for one `(patient, prescription)` pair.
///
/// # Errors
///
/// Returns a store error if either id contains the key delimiter.
pub fn index_key(patient_id: &str, prescription_id: &str) -> Result<String> {
    Ok(make_composite_key(PATIENT_INDEX, &[patient_id, prescription_id])?)
}

/// Record that `prescription_id` belongs to `patient_id`.
///
/// # Errors
///
/// Returns a store error if the key is invalid or the write fails.
pub fn add_entry<S>(store: &mut S, patient_id: &str, prescription_id: &str) -> Result<()>
where
    S: KeyValueStore + ?Sized,
{
    let key = index_key(patient_id, prescription_id)?;
    store.put(&key, INDEX_MARKER.to_vec())?;
    tracing::debug!(patient_id, prescription_id, "Indexed prescription by patient");
    Ok(())
}

/// Ids of every prescription indexed under `patient_id`.
///
/// Order follows the store's range scan and carries no meaning.
///
/// # Errors
///
/// Returns a store error if the scan fails or yields a key that is not a
/// patient index key.
pub fn prescriptions_for<S>(store: &S, patient_id: &str) -> Result<Vec<String>>
where
    S: StateReader + ?Sized,
{
    let prefix = make_composite_key(PATIENT_INDEX, &[patient_id])?;

    store
        .range_scan(&prefix)?
        .into_iter()
        .map(|(key, _)| prescription_id_from_key(&key))
        .collect()
}

/// Recover the prescription id from an index key.
///
/// # Errors
///
/// Returns a store error if `key` is not a two-part patient index key.
pub fn prescription_id_from_key(key: &str) -> Result<String> {
    let (namespace, mut parts) = split_composite_key(key)?;
    if namespace != PATIENT_INDEX || parts.len() != 2 {
        return Err(rxledger_core::store::StoreError::InvalidKey(format!(
            "{key:?} is not a patient index key"
        ))
        .into());
    }
    Ok(parts.swap_remove(1))
}
