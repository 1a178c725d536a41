//! # RxLedger Prescription
//!
//! Prescription lifecycle contract over a transactional key-value ledger.
//!
//! Doctors issue prescriptions, patients request refills, pharmacies approve
//! them, and the issuing doctor may amend medication or dosage while the
//! prescription is active. Every record lives under its id; a
//! patient → prescriptions index is kept alongside with composite keys.
//!
//! ## Layout
//!
//! - [`types`]: the record, its status machine, actions and effects
//! - [`reducer`]: the lifecycle engine, pure and clock-injected
//! - [`dispatcher`]: operation names, argument binding and routing
//! - [`index`]: the patient index
//! - [`codec`]: JSON record format, timestamps, numeric arguments
//! - [`host`]: atomic execution against a [`Ledger`](rxledger_core::store::Ledger)
//! - [`config`]: environment configuration
//!
//! ## Example
//!
//! ```
//! use rxledger_core::environment::SystemClock;
//! use rxledger_core::memory::InMemoryLedger;
//! use rxledger_prescription::{ContractHost, Invocation, PrescriptionContract};
//! use std::sync::Arc;
//!
//! let host = ContractHost::new(
//!     InMemoryLedger::new(),
//!     PrescriptionContract::new(Arc::new(SystemClock)),
//! );
//!
//! let create = Invocation::new(
//!     "createPrescription",
//!     ["RX1", "PAT1", "DOC1", "Amoxicillin", "500mg", "30", "2", "hash"],
//! );
//! assert!(host.execute(&create).is_ok());
//!
//! let history = host.execute(&Invocation::new("getPatientHistory", ["PAT1"]));
//! assert_eq!(history.payload.as_deref(), Some(r#"["RX1"]"#));
//! ```

pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod index;
pub mod reducer;
pub mod types;

pub use config::ContractConfig;
pub use dispatcher::{Invocation, Operation, PrescriptionContract};
pub use error::{ContractError, ErrorKind, Result, StateViolation};
pub use host::{ContractHost, Response};
pub use reducer::{PrescriptionEnvironment, PrescriptionReducer};
pub use types::{
    NewPrescription, Prescription, PrescriptionAction, PrescriptionEffect, PrescriptionStatus,
};
