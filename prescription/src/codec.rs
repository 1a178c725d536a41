//! Record codec and argument parsing.
//!
//! Records are stored as JSON with camelCase field names. Timestamps use a
//! fixed, lexicographically sortable RFC 3339 form: UTC, whole seconds, `Z`
//! suffix (`2025-01-01T00:00:00Z`). Reading accepts any RFC 3339 timestamp.

use crate::error::ContractError;
use crate::types::Prescription;
use chrono::{DateTime, SecondsFormat, Utc};

/// Render a timestamp in the stored format.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a stored timestamp.
///
/// # Errors
///
/// Returns [`ContractError::Serialization`] if `raw` is not RFC 3339.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ContractError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| ContractError::Serialization(format!("invalid timestamp {raw:?}: {e}")))
}

/// Serde adapter for timestamps in the stored format.
pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as `YYYY-MM-DDTHH:MM:SSZ`
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(*at))
    }

    /// Deserialize any RFC 3339 timestamp
    ///
    /// # Errors
    ///
    /// Fails if the value is not an RFC 3339 string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serialize a record for storage.
///
/// # Errors
///
/// Returns [`ContractError::Serialization`] if encoding fails.
pub fn encode_prescription(prescription: &Prescription) -> Result<Vec<u8>, ContractError> {
    serde_json::to_vec(prescription).map_err(|e| {
        ContractError::Serialization(format!(
            "failed to encode prescription {}: {e}",
            prescription.id
        ))
    })
}

/// Deserialize a stored record.
///
/// # Errors
///
/// Returns [`ContractError::Serialization`] if `bytes` is not a valid record.
pub fn decode_prescription(bytes: &[u8]) -> Result<Prescription, ContractError> {
    serde_json::from_slice(bytes)
        .map_err(|e| ContractError::Serialization(format!("failed to decode prescription: {e}")))
}

/// Serialize a list of prescription ids as a JSON array.
///
/// # Errors
///
/// Returns [`ContractError::Serialization`] if encoding fails.
pub fn encode_id_list(ids: &[String]) -> Result<Vec<u8>, ContractError> {
    serde_json::to_vec(ids)
        .map_err(|e| ContractError::Serialization(format!("failed to encode id list: {e}")))
}

/// How numeric arguments that fail to parse are treated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NumericArgs {
    /// Unparseable values (including negatives) become zero
    #[default]
    Lenient,
    /// Unparseable values are rejected
    Strict,
}

/// Parse an integer argument.
///
/// Any value that parses as a signed 64-bit integer is kept as given,
/// negatives included.
///
/// # Errors
///
/// In [`NumericArgs::Strict`] mode, returns [`ContractError::InvalidArgument`]
/// when `raw` is not an integer. Lenient mode never fails and yields zero.
pub fn parse_int(name: &str, raw: &str, mode: NumericArgs) -> Result<i64, ContractError> {
    match (raw.parse::<i64>(), mode) {
        (Ok(value), _) => Ok(value),
        (Err(_), NumericArgs::Lenient) => {
            tracing::debug!(argument = name, value = raw, "Unparseable integer treated as zero");
            Ok(0)
        },
        (Err(e), NumericArgs::Strict) => Err(ContractError::InvalidArgument {
            name: name.to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Parse a refill count argument.
///
/// Parses like [`parse_int`]; in lenient mode a negative count becomes zero
/// and a count beyond `u32::MAX` saturates.
///
/// # Errors
///
/// In [`NumericArgs::Strict`] mode, returns [`ContractError::InvalidArgument`]
/// when `raw` is not an integer or is out of range for a count.
pub fn parse_count(name: &str, raw: &str, mode: NumericArgs) -> Result<u32, ContractError> {
    let value = parse_int(name, raw, mode)?;
    match (u32::try_from(value), mode) {
        (Ok(count), _) => Ok(count),
        (Err(_), NumericArgs::Lenient) => {
            tracing::debug!(argument = name, value, "Out-of-range count clamped");
            Ok(if value < 0 { 0 } else { u32::MAX })
        },
        (Err(e), NumericArgs::Strict) => Err(ContractError::InvalidArgument {
            name: name.to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        }),
    }
}
