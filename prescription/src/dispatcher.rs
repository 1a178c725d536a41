//! Invocation dispatcher.
//!
//! An [`Invocation`] names an operation and carries positional string
//! arguments. [`Operation::parse`] resolves the name and checks the exact
//! argument count once, at the boundary; [`PrescriptionContract::invoke`]
//! then routes each variant to its handler.
//!
//! | Operation            | Arguments                                                                                  |
//! |----------------------|--------------------------------------------------------------------------------------------|
//! | `createPrescription` | id, patientId, doctorId, medicationName, dosage, quantity, refillsAllowed, documentHash    |
//! | `getPrescription`    | id                                                                                         |
//! | `requestRefill`      | id                                                                                         |
//! | `approveRefill`      | id, pharmacyId                                                                             |
//! | `getPatientHistory`  | patientId                                                                                  |
//! | `updatePrescription` | id, doctorId, medicationName, dosage, comment                                              |

use crate::codec::{self, NumericArgs};
use crate::config::ContractConfig;
use crate::error::{ContractError, Result};
use crate::index;
use crate::reducer::{PrescriptionEnvironment, PrescriptionReducer};
use crate::types::{NewPrescription, PrescriptionAction, PrescriptionEffect};
use rxledger_core::environment::Clock;
use rxledger_core::reducer::Reducer;
use rxledger_core::store::{KeyValueStore, validate_simple_key};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One externally submitted call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Operation name
    pub function: String,
    /// Positional arguments
    #[serde(default)]
    pub args: Vec<String>,
}

impl Invocation {
    /// Build an invocation from a name and arguments
    #[must_use]
    pub fn new<I, S>(function: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            function: function.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// The operation vocabulary, with arguments already bound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Issue a new prescription
    CreatePrescription(NewPrescription),
    /// Read one record
    GetPrescription {
        /// Prescription id
        id: String,
    },
    /// Ask for a refill
    RequestRefill {
        /// Prescription id
        id: String,
    },
    /// Approve a pending refill
    ApproveRefill {
        /// Prescription id
        id: String,
        /// Approving pharmacy
        pharmacy_id: String,
    },
    /// List a patient's prescription ids
    GetPatientHistory {
        /// Patient id
        patient_id: String,
    },
    /// Amend medication or dosage
    UpdatePrescription {
        /// Prescription id
        id: String,
        /// Doctor making the change
        doctor_id: String,
        /// New medication name, empty to keep
        medication_name: String,
        /// New dosage, empty to keep
        dosage: String,
        /// Free-text note
        comment: String,
    },
}

/// Take exactly `N` arguments or report the mismatch.
fn exact<const N: usize>(operation: &'static str, args: &[String]) -> Result<[String; N]> {
    <[String; N]>::try_from(args.to_vec()).map_err(|_| ContractError::InvalidArgumentCount {
        operation,
        expected: N,
        actual: args.len(),
    })
}

impl Operation {
    /// Resolve an operation name and bind its arguments.
    ///
    /// # Errors
    ///
    /// - `UnknownOperation`: the name is not in the vocabulary
    /// - `InvalidArgumentCount`: the argument count is not exactly the one required
    /// - `InvalidArgument`: a count failed to parse in [`NumericArgs::Strict`] mode
    pub fn parse(function: &str, args: &[String], numeric: NumericArgs) -> Result<Self> {
        match function {
            "createPrescription" => {
                let [
                    id,
                    patient_id,
                    doctor_id,
                    medication_name,
                    dosage,
                    quantity,
                    refills_allowed,
                    document_hash,
                ] = exact::<8>("createPrescription", args)?;

                validate_simple_key(&id).map_err(|e| ContractError::InvalidArgument {
                    name: "id".to_string(),
                    value: id.escape_debug().to_string(),
                    reason: e.to_string(),
                })?;

                Ok(Self::CreatePrescription(NewPrescription {
                    id,
                    patient_id,
                    doctor_id,
                    medication_name,
                    dosage,
                    quantity: codec::parse_int("quantity", &quantity, numeric)?,
                    refills_allowed: codec::parse_count("refillsAllowed", &refills_allowed, numeric)?,
                    document_hash,
                }))
            },
            "getPrescription" => {
                let [id] = exact::<1>("getPrescription", args)?;
                Ok(Self::GetPrescription { id })
            },
            "requestRefill" => {
                let [id] = exact::<1>("requestRefill", args)?;
                Ok(Self::RequestRefill { id })
            },
            "approveRefill" => {
                let [id, pharmacy_id] = exact::<2>("approveRefill", args)?;
                Ok(Self::ApproveRefill { id, pharmacy_id })
            },
            "getPatientHistory" => {
                let [patient_id] = exact::<1>("getPatientHistory", args)?;
                Ok(Self::GetPatientHistory { patient_id })
            },
            "updatePrescription" => {
                let [id, doctor_id, medication_name, dosage, comment] =
                    exact::<5>("updatePrescription", args)?;
                Ok(Self::UpdatePrescription {
                    id,
                    doctor_id,
                    medication_name,
                    dosage,
                    comment,
                })
            },
            other => Err(ContractError::UnknownOperation(other.to_string())),
        }
    }

    /// Names of every operation in the vocabulary.
    pub const NAMES: [&'static str; 6] = [
        "createPrescription",
        "getPrescription",
        "requestRefill",
        "approveRefill",
        "getPatientHistory",
        "updatePrescription",
    ];

    /// The vocabulary entry matching `function`, if any
    #[must_use]
    pub fn known_name(function: &str) -> Option<&'static str> {
        Self::NAMES.into_iter().find(|name| *name == function)
    }

    /// The operation's external name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreatePrescription(_) => "createPrescription",
            Self::GetPrescription { .. } => "getPrescription",
            Self::RequestRefill { .. } => "requestRefill",
            Self::ApproveRefill { .. } => "approveRefill",
            Self::GetPatientHistory { .. } => "getPatientHistory",
            Self::UpdatePrescription { .. } => "updatePrescription",
        }
    }
}

/// The prescription contract: routes invocations to the lifecycle engine
/// and executes the writes it asks for.
///
/// Holds no state between invocations; each call sees only the store it is
/// given.
#[derive(Clone, Debug)]
pub struct PrescriptionContract {
    reducer: PrescriptionReducer,
    env: PrescriptionEnvironment,
    numeric: NumericArgs,
}

impl PrescriptionContract {
    /// Create a contract with default configuration
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_config(clock, &ContractConfig::default())
    }

    /// Create a contract from configuration
    #[must_use]
    pub fn with_config(clock: Arc<dyn Clock>, config: &ContractConfig) -> Self {
        Self {
            reducer: PrescriptionReducer::new(),
            env: PrescriptionEnvironment::with_validity(clock, config.validity_months),
            numeric: config.numeric_args(),
        }
    }

    /// Execute one invocation against `store`.
    ///
    /// Returns the response payload: the stored record for
    /// `getPrescription`, a JSON array of ids for `getPatientHistory`, and
    /// an empty payload for every mutation.
    ///
    /// On error the store may hold partial writes; the caller must discard
    /// them (see [`ContractHost`](crate::host::ContractHost)).
    ///
    /// # Errors
    ///
    /// Returns [`ContractError`] describing why the invocation was rejected.
    #[tracing::instrument(skip(self, store, invocation), fields(operation = %invocation.function))]
    pub fn invoke<S>(&self, store: &mut S, invocation: &Invocation) -> Result<Vec<u8>>
    where
        S: KeyValueStore + ?Sized,
    {
        let operation = Operation::parse(&invocation.function, &invocation.args, self.numeric)?;

        match operation {
            Operation::GetPrescription { id } => Self::get_prescription(store, &id),
            Operation::GetPatientHistory { patient_id } => {
                let ids = index::prescriptions_for(store, &patient_id)?;
                tracing::debug!(%patient_id, count = ids.len(), "Patient history listed");
                codec::encode_id_list(&ids)
            },
            Operation::CreatePrescription(new) => self.apply(store, PrescriptionAction::Create(new)),
            Operation::RequestRefill { id } => {
                self.apply(store, PrescriptionAction::RequestRefill { id })
            },
            Operation::ApproveRefill { id, pharmacy_id } => {
                self.apply(store, PrescriptionAction::ApproveRefill { id, pharmacy_id })
            },
            Operation::UpdatePrescription {
                id,
                doctor_id,
                medication_name,
                dosage,
                comment,
            } => self.apply(
                store,
                PrescriptionAction::Update {
                    id,
                    doctor_id,
                    medication_name,
                    dosage,
                    comment,
                },
            ),
        }
    }

    fn get_prescription<S>(store: &S, id: &str) -> Result<Vec<u8>>
    where
        S: KeyValueStore + ?Sized,
    {
        Self::read_record(store, id)?.ok_or_else(|| ContractError::NotFound(id.to_string()))
    }

    /// Stored bytes of the record `id`; ids outside the simple-key space
    /// never name a record.
    fn read_record<S>(store: &S, id: &str) -> Result<Option<Vec<u8>>>
    where
        S: KeyValueStore + ?Sized,
    {
        if let Err(error) = validate_simple_key(id) {
            tracing::debug!(id = %id.escape_debug(), %error, "Not a record key");
            return Ok(None);
        }
        Ok(store.get(id)?)
    }

    /// Load the addressed record, run the engine, perform its writes.
    fn apply<S>(&self, store: &mut S, action: PrescriptionAction) -> Result<Vec<u8>>
    where
        S: KeyValueStore + ?Sized,
    {
        let id = action.id().to_string();
        let mut state = Self::read_record(store, &id)?
            .map(|bytes| codec::decode_prescription(&bytes))
            .transpose()?;

        let effects = self.reducer.reduce(&mut state, action, &self.env)?;

        for effect in effects {
            match effect {
                PrescriptionEffect::SaveRecord(prescription) => {
                    let bytes = codec::encode_prescription(&prescription)?;
                    store.put(&prescription.id, bytes)?;
                },
                PrescriptionEffect::IndexByPatient {
                    patient_id,
                    prescription_id,
                } => index::add_entry(store, &patient_id, &prescription_id)?,
            }
        }

        Ok(Vec::new())
    }
}
