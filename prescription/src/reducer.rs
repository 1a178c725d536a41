//! Lifecycle engine for prescriptions.
//!
//! The reducer validates a command against the record loaded for this
//! invocation, updates that record in place and returns the writes to
//! perform. It never touches the ledger itself, and a rejected command
//! leaves the record exactly as it was loaded.

use crate::config::DEFAULT_VALIDITY_MONTHS;
use crate::error::{ContractError, StateViolation};
use crate::types::{
    NewPrescription, Prescription, PrescriptionAction, PrescriptionEffect, PrescriptionStatus,
};
use chrono::{Datelike, DateTime, Days, Months, Utc};
use rxledger_core::environment::Clock;
use rxledger_core::reducer::Reducer;
use rxledger_core::{SmallVec, smallvec};
use std::sync::Arc;

/// Environment dependencies for the prescription reducer
#[derive(Clone)]
pub struct PrescriptionEnvironment {
    /// Clock for issue, request and approval timestamps
    pub clock: Arc<dyn Clock>,
    /// Validity period applied at issue
    pub validity: Months,
}

impl PrescriptionEnvironment {
    /// Creates an environment with the default six-month validity
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_validity(clock, DEFAULT_VALIDITY_MONTHS)
    }

    /// Creates an environment with a custom validity in months
    #[must_use]
    pub fn with_validity(clock: Arc<dyn Clock>, months: u32) -> Self {
        Self {
            clock,
            validity: Months::new(months),
        }
    }

    /// Expiry for a prescription issued at `issued`.
    ///
    /// Months are added to the first of the issue month and the day offset
    /// is re-applied afterwards, so a day past the end of the target month
    /// rolls into the next one (Aug 31 + 6 months = Mar 3).
    fn expiry_for(&self, issued: DateTime<Utc>) -> Result<DateTime<Utc>, ContractError> {
        issued
            .with_day(1)
            .and_then(|first| first.checked_add_months(self.validity))
            .and_then(|first| first.checked_add_days(Days::new(u64::from(issued.day0()))))
            .ok_or_else(|| ContractError::InvalidArgument {
                name: "issueDate".to_string(),
                value: issued.to_string(),
                reason: "validity period overflows the calendar".to_string(),
            })
    }
}

impl std::fmt::Debug for PrescriptionEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrescriptionEnvironment")
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}

/// Reducer for the prescription lifecycle
///
/// State is the record stored under the command's id, or `None` when no
/// record exists yet.
#[derive(Clone, Debug, Default)]
pub struct PrescriptionReducer;

type Effects = SmallVec<[PrescriptionEffect; 4]>;

impl PrescriptionReducer {
    /// Creates a new `PrescriptionReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn existing<'a>(
        state: &'a mut Option<Prescription>,
        id: &str,
    ) -> Result<&'a mut Prescription, ContractError> {
        state
            .as_mut()
            .ok_or_else(|| ContractError::NotFound(id.to_string()))
    }

    fn create(
        state: &mut Option<Prescription>,
        new: NewPrescription,
        env: &PrescriptionEnvironment,
    ) -> Result<Effects, ContractError> {
        if state.is_some() {
            return Err(ContractError::AlreadyExists(new.id));
        }

        let issue_date = env.clock.now();
        let expiry_date = env.expiry_for(issue_date)?;

        let mut prescription = Prescription {
            id: new.id,
            patient_id: new.patient_id,
            doctor_id: new.doctor_id,
            medication_name: new.medication_name,
            dosage: new.dosage,
            quantity: new.quantity,
            refills_allowed: new.refills_allowed,
            refills_used: 0,
            issue_date,
            expiry_date,
            status: PrescriptionStatus::Active,
            document_hash: new.document_hash,
            med_history: Vec::new(),
        };
        prescription.record(format!(
            "Prescription created on {}",
            crate::codec::format_timestamp(issue_date)
        ));

        tracing::debug!(
            id = %prescription.id,
            patient_id = %prescription.patient_id,
            refills_allowed = prescription.refills_allowed,
            "Prescription issued"
        );

        let effects = smallvec![
            PrescriptionEffect::IndexByPatient {
                patient_id: prescription.patient_id.clone(),
                prescription_id: prescription.id.clone(),
            },
            PrescriptionEffect::SaveRecord(prescription.clone()),
        ];
        *state = Some(prescription);
        Ok(effects)
    }

    fn request_refill(
        state: &mut Option<Prescription>,
        id: &str,
        env: &PrescriptionEnvironment,
    ) -> Result<Effects, ContractError> {
        let prescription = Self::existing(state, id)?;

        if prescription.refills_used >= prescription.refills_allowed {
            return Err(ContractError::invalid_state(
                id,
                StateViolation::NoRefillsRemaining,
            ));
        }

        if prescription.status != PrescriptionStatus::Active {
            return Err(ContractError::invalid_state(
                id,
                StateViolation::NotActive {
                    status: prescription.status,
                },
            ));
        }

        let now = env.clock.now();
        if prescription.is_expired_at(now) {
            return Err(ContractError::invalid_state(
                id,
                StateViolation::Expired {
                    expiry_date: prescription.expiry_date,
                },
            ));
        }

        prescription.request_refill(now);
        tracing::debug!(id, remaining = prescription.remaining_refills(), "Refill requested");

        Ok(smallvec![PrescriptionEffect::SaveRecord(prescription.clone())])
    }

    fn approve_refill(
        state: &mut Option<Prescription>,
        id: &str,
        pharmacy_id: &str,
        env: &PrescriptionEnvironment,
    ) -> Result<Effects, ContractError> {
        let prescription = Self::existing(state, id)?;

        if prescription.status != PrescriptionStatus::RefillRequested {
            return Err(ContractError::invalid_state(
                id,
                StateViolation::RefillNotRequested {
                    status: prescription.status,
                },
            ));
        }

        if prescription.remaining_refills() == 0 {
            return Err(ContractError::invalid_state(
                id,
                StateViolation::NoRefillsRemaining,
            ));
        }

        let completed = prescription.approve_refill(pharmacy_id, env.clock.now());
        tracing::debug!(
            id,
            pharmacy_id,
            refills_used = prescription.refills_used,
            completed,
            "Refill approved"
        );

        Ok(smallvec![PrescriptionEffect::SaveRecord(prescription.clone())])
    }

    fn update(
        state: &mut Option<Prescription>,
        id: &str,
        doctor_id: &str,
        changes: (&str, &str, &str),
        env: &PrescriptionEnvironment,
    ) -> Result<Effects, ContractError> {
        let prescription = Self::existing(state, id)?;

        if prescription.doctor_id != doctor_id {
            return Err(ContractError::Unauthorized {
                doctor_id: doctor_id.to_string(),
                prescription_id: id.to_string(),
            });
        }

        if prescription.status != PrescriptionStatus::Active {
            return Err(ContractError::invalid_state(
                id,
                StateViolation::NotActive {
                    status: prescription.status,
                },
            ));
        }

        let (medication_name, dosage, comment) = changes;
        let changed = prescription.amend(medication_name, dosage, comment, env.clock.now());
        tracing::debug!(id, ?changed, "Prescription amended");

        Ok(smallvec![PrescriptionEffect::SaveRecord(prescription.clone())])
    }
}

impl Reducer for PrescriptionReducer {
    type State = Option<Prescription>;
    type Action = PrescriptionAction;
    type Environment = PrescriptionEnvironment;
    type Effect = PrescriptionEffect;
    type Error = ContractError;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Result<Effects, ContractError> {
        match action {
            PrescriptionAction::Create(new) => Self::create(state, new, env),
            PrescriptionAction::RequestRefill { id } => Self::request_refill(state, &id, env),
            PrescriptionAction::ApproveRefill { id, pharmacy_id } => {
                Self::approve_refill(state, &id, &pharmacy_id, env)
            },
            PrescriptionAction::Update {
                id,
                doctor_id,
                medication_name,
                dosage,
                comment,
            } => Self::update(
                state,
                &id,
                &doctor_id,
                (&medication_name, &dosage, &comment),
                env,
            ),
        }
    }
}
