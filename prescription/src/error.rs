//! Contract errors.
//!
//! Every failure is returned to the caller with a stable [`ErrorKind`] and a
//! human-readable message. Nothing is retried here; a failed invocation
//! writes nothing.

use crate::types::PrescriptionStatus;
use chrono::{DateTime, Utc};
use rxledger_core::store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for contract operations.
pub type Result<T> = std::result::Result<T, ContractError>;

/// Why an operation is not legal from the record's current state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateViolation {
    /// Every granted refill has been used
    #[error("no refills remaining")]
    NoRefillsRemaining,

    /// The operation requires an `ACTIVE` prescription
    #[error("prescription is not active (status {status})")]
    NotActive {
        /// Current status
        status: PrescriptionStatus,
    },

    /// The prescription expired before the request
    #[error("prescription expired at {expiry_date}")]
    Expired {
        /// When the prescription expired
        expiry_date: DateTime<Utc>,
    },

    /// Approval without a pending refill request
    #[error("refill was not requested (status {status})")]
    RefillNotRequested {
        /// Current status
        status: PrescriptionStatus,
    },
}

/// Errors returned by the prescription contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// No record exists for the id
    #[error("Prescription not found: {0}")]
    NotFound(String),

    /// A record already exists for the id
    #[error("This prescription already exists: {0}")]
    AlreadyExists(String),

    /// Wrong number of positional arguments
    #[error("Incorrect number of arguments for {operation}. Expecting {expected}, got {actual}")]
    InvalidArgumentCount {
        /// Operation name
        operation: &'static str,
        /// Required argument count
        expected: usize,
        /// Supplied argument count
        actual: usize,
    },

    /// An argument could not be interpreted (strict numeric mode only)
    #[error("Invalid value {value:?} for argument {name}: {reason}")]
    InvalidArgument {
        /// Argument name
        name: String,
        /// Supplied value
        value: String,
        /// Parse failure
        reason: String,
    },

    /// The caller is not the issuing doctor
    #[error("Doctor {doctor_id} is not authorized to update prescription {prescription_id}")]
    Unauthorized {
        /// Doctor that attempted the update
        doctor_id: String,
        /// Prescription addressed
        prescription_id: String,
    },

    /// The operation is not legal from the current status
    #[error("Invalid state for prescription {id}: {violation}")]
    InvalidState {
        /// Prescription addressed
        id: String,
        /// What precondition failed
        violation: StateViolation,
    },

    /// A record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The ledger failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The operation name is not part of the vocabulary
    #[error("Invalid function name: {0}")]
    UnknownOperation(String),
}

/// Stable, machine-readable error classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// See [`ContractError::NotFound`]
    NotFound,
    /// See [`ContractError::AlreadyExists`]
    AlreadyExists,
    /// See [`ContractError::InvalidArgumentCount`]
    InvalidArgumentCount,
    /// See [`ContractError::InvalidArgument`]
    InvalidArgument,
    /// See [`ContractError::Unauthorized`]
    Unauthorized,
    /// See [`ContractError::InvalidState`]
    InvalidState,
    /// See [`ContractError::Serialization`]
    SerializationError,
    /// See [`ContractError::Store`]
    StoreError,
    /// See [`ContractError::UnknownOperation`]
    InvalidOperation,
}

impl ErrorKind {
    /// Label used in logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::InvalidArgumentCount => "invalid_argument_count",
            Self::InvalidArgument => "invalid_argument",
            Self::Unauthorized => "unauthorized",
            Self::InvalidState => "invalid_state",
            Self::SerializationError => "serialization_error",
            Self::StoreError => "store_error",
            Self::InvalidOperation => "invalid_operation",
        }
    }
}

impl ContractError {
    /// Classification of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::InvalidArgumentCount { .. } => ErrorKind::InvalidArgumentCount,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::Serialization(_) => ErrorKind::SerializationError,
            Self::Store(_) => ErrorKind::StoreError,
            Self::UnknownOperation(_) => ErrorKind::InvalidOperation,
        }
    }

    /// The state violation, if this is an `InvalidState` error
    #[must_use]
    pub const fn violation(&self) -> Option<&StateViolation> {
        match self {
            Self::InvalidState { violation, .. } => Some(violation),
            _ => None,
        }
    }

    pub(crate) fn invalid_state(id: &str, violation: StateViolation) -> Self {
        Self::InvalidState {
            id: id.to_string(),
            violation,
        }
    }
}
