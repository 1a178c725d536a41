//! Ledger host: runs each invocation as one atomic unit of work.
//!
//! The host opens a [`Transaction`] over the committed ledger state, lets
//! the contract read and write through it, and commits the buffered writes
//! only when the contract succeeded. A rejected invocation leaves the
//! ledger untouched.
//!
//! # Metrics
//!
//! - `rxledger_invocations_total{operation, outcome}`: one per invocation,
//!   `operation` is the vocabulary name or `unknown`, `outcome` is `ok` or
//!   the [`ErrorKind`] label
//! - `rxledger_writes_total`: keys written by committed invocations

use crate::dispatcher::{Invocation, Operation, PrescriptionContract};
use crate::error::{ErrorKind, Result};
use rxledger_core::store::Ledger;
use rxledger_core::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// Response status for a successful invocation
pub const STATUS_OK: u16 = 200;

/// Response status for a rejected invocation
pub const STATUS_ERROR: u16 = 500;

/// Metric label for names outside the operation vocabulary.
pub const UNKNOWN_OPERATION_LABEL: &str = "unknown";

/// Bounded `operation` label for an invocation's function name
#[must_use]
pub fn operation_label(function: &str) -> &'static str {
    Operation::known_name(function).unwrap_or(UNKNOWN_OPERATION_LABEL)
}

/// Outcome of one invocation as reported to the submitter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// [`STATUS_OK`] or [`STATUS_ERROR`]
    pub status: u16,
    /// Response payload, absent when empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    /// Error message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Error classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl Response {
    /// Build a response from an invocation result
    #[must_use]
    pub fn from_result(result: &Result<Vec<u8>>) -> Self {
        match result {
            Ok(payload) => Self {
                status: STATUS_OK,
                payload: (!payload.is_empty())
                    .then(|| String::from_utf8_lossy(payload).into_owned()),
                message: None,
                kind: None,
            },
            Err(error) => Self {
                status: STATUS_ERROR,
                payload: None,
                message: Some(error.to_string()),
                kind: Some(error.kind()),
            },
        }
    }

    /// Whether the invocation succeeded
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Runs contract invocations against a ledger.
#[derive(Debug)]
pub struct ContractHost<L: Ledger> {
    ledger: L,
    contract: PrescriptionContract,
}

impl<L: Ledger> ContractHost<L> {
    /// Host `contract` on `ledger`
    #[must_use]
    pub const fn new(ledger: L, contract: PrescriptionContract) -> Self {
        Self { ledger, contract }
    }

    /// The hosted ledger
    #[must_use]
    pub const fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Run one invocation, committing its writes if it succeeds.
    ///
    /// Invocations that wrote nothing are not committed.
    ///
    /// # Errors
    ///
    /// Returns the contract's error, or a store error if the commit fails
    /// (including a read conflict with a concurrent commit). No writes are
    /// applied in either case.
    #[tracing::instrument(skip(self, invocation), fields(operation = %invocation.function))]
    pub fn submit(&self, invocation: &Invocation) -> Result<Vec<u8>> {
        let result = self.run(invocation);

        let outcome = result
            .as_ref()
            .map_or_else(|error| error.kind().as_str(), |_| "ok");
        metrics::counter!(
            "rxledger_invocations_total",
            "operation" => operation_label(&invocation.function),
            "outcome" => outcome
        )
        .increment(1);

        match &result {
            Ok(_) => tracing::debug!("Invocation succeeded"),
            Err(error) => tracing::warn!(
                kind = error.kind().as_str(),
                %error,
                "Invocation rejected"
            ),
        }

        result
    }

    /// Run one invocation and wrap the outcome in a [`Response`].
    #[must_use]
    pub fn execute(&self, invocation: &Invocation) -> Response {
        Response::from_result(&self.submit(invocation))
    }

    fn run(&self, invocation: &Invocation) -> Result<Vec<u8>> {
        let mut tx = Transaction::new(&self.ledger);
        let payload = self.contract.invoke(&mut tx, invocation)?;

        let write_set = tx.into_write_set();
        if !write_set.is_empty() {
            let writes = write_set.len();
            self.ledger.commit(write_set)?;
            metrics::counter!("rxledger_writes_total").increment(writes as u64);
            tracing::info!(writes, "Committed write set");
        }

        Ok(payload)
    }
}
