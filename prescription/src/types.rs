//! Domain types for the prescription contract.
//!
//! A [`Prescription`] is the only entity. It is created once, mutated in
//! place by refills and amendments, and never deleted. Every mutation appends
//! to [`Prescription::med_history`].

use crate::codec::{format_timestamp, timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a prescription.
///
/// ```text
/// ACTIVE ──requestRefill──► REFILL_REQUESTED ──approveRefill──► ACTIVE
///                                            └─(last refill)──► COMPLETED
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrescriptionStatus {
    /// Issued and usable; refills may be requested and details amended
    Active,
    /// A refill was requested and awaits pharmacy approval
    RefillRequested,
    /// All refills used; terminal
    Completed,
}

impl PrescriptionStatus {
    /// The stored literal for this status
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::RefillRequested => "REFILL_REQUESTED",
            Self::Completed => "COMPLETED",
        }
    }

    /// Whether no further transition is possible
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A medication prescription as stored on the ledger.
///
/// Field names on the ledger are camelCase and must stay stable; new fields
/// may be added, unknown fields are ignored when reading.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    /// Primary key, chosen by the caller
    pub id: String,
    /// Patient the prescription was issued to
    pub patient_id: String,
    /// Issuing doctor; the only principal allowed to amend
    pub doctor_id: String,
    /// Medication name
    pub medication_name: String,
    /// Dosage instructions
    pub dosage: String,
    /// Units dispensed per fill
    pub quantity: i64,
    /// Number of refills granted at issue
    pub refills_allowed: u32,
    /// Refills approved so far, never above `refills_allowed`
    pub refills_used: u32,
    /// When the prescription was issued
    #[serde(with = "timestamp")]
    pub issue_date: DateTime<Utc>,
    /// Last instant at which a refill may be requested
    #[serde(with = "timestamp")]
    pub expiry_date: DateTime<Utc>,
    /// Lifecycle status
    pub status: PrescriptionStatus,
    /// Hash of the supporting off-ledger document
    pub document_hash: String,
    /// Append-only audit trail
    #[serde(default)]
    pub med_history: Vec<String>,
}

impl Prescription {
    /// Refills still available
    #[must_use]
    pub const fn remaining_refills(&self) -> u32 {
        self.refills_allowed.saturating_sub(self.refills_used)
    }

    /// Whether `now` is past the expiry date
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry_date
    }

    /// Append an audit line
    pub fn record(&mut self, entry: impl Into<String>) {
        self.med_history.push(entry.into());
    }

    /// Move to `REFILL_REQUESTED`
    pub fn request_refill(&mut self, at: DateTime<Utc>) {
        self.status = PrescriptionStatus::RefillRequested;
        self.record(format!("Refill requested on {}", format_timestamp(at)));
    }

    /// Count an approved refill, completing the prescription on the last one.
    ///
    /// Returns `true` when the prescription became `COMPLETED`.
    pub fn approve_refill(&mut self, pharmacy_id: &str, at: DateTime<Utc>) -> bool {
        let when = format_timestamp(at);
        self.refills_used = self.refills_used.saturating_add(1);
        self.status = PrescriptionStatus::Active;
        self.record(format!("Refill approved by pharmacy {pharmacy_id} on {when}"));

        if self.refills_used >= self.refills_allowed {
            self.status = PrescriptionStatus::Completed;
            self.record(format!(
                "Prescription marked as completed on {when} - no more refills"
            ));
            return true;
        }
        false
    }

    /// Apply an amendment and record it as one history entry.
    ///
    /// Medication and dosage change only when the new value is non-empty and
    /// different. The entry is written even when nothing changed.
    ///
    /// Returns the names of the fields that changed.
    pub fn amend(
        &mut self,
        medication_name: &str,
        dosage: &str,
        comment: &str,
        at: DateTime<Utc>,
    ) -> Vec<&'static str> {
        let mut entry = format!("Updated on {}: ", format_timestamp(at));
        let mut changed = Vec::new();

        if !medication_name.is_empty() && medication_name != self.medication_name {
            entry.push_str(&format!(
                "Medication changed from {} to {medication_name}. ",
                self.medication_name
            ));
            self.medication_name = medication_name.to_string();
            changed.push("medicationName");
        }

        if !dosage.is_empty() && dosage != self.dosage {
            entry.push_str(&format!("Dosage changed from {} to {dosage}. ", self.dosage));
            self.dosage = dosage.to_string();
            changed.push("dosage");
        }

        if !comment.is_empty() {
            entry.push_str("Comment: ");
            entry.push_str(comment);
        }

        self.record(entry);
        changed
    }
}

/// Caller-supplied fields of a new prescription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPrescription {
    /// Primary key
    pub id: String,
    /// Patient identifier
    pub patient_id: String,
    /// Issuing doctor
    pub doctor_id: String,
    /// Medication name
    pub medication_name: String,
    /// Dosage instructions
    pub dosage: String,
    /// Units per fill
    pub quantity: i64,
    /// Refills granted
    pub refills_allowed: u32,
    /// Supporting document hash
    pub document_hash: String,
}

/// Commands accepted by the lifecycle engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrescriptionAction {
    /// Issue a new prescription
    Create(NewPrescription),

    /// Patient asks for a refill
    RequestRefill {
        /// Prescription to refill
        id: String,
    },

    /// Pharmacy approves a pending refill
    ApproveRefill {
        /// Prescription to refill
        id: String,
        /// Approving pharmacy
        pharmacy_id: String,
    },

    /// Issuing doctor amends medication or dosage
    Update {
        /// Prescription to amend
        id: String,
        /// Doctor making the change
        doctor_id: String,
        /// New medication name, empty to keep
        medication_name: String,
        /// New dosage, empty to keep
        dosage: String,
        /// Free-text note, empty for none
        comment: String,
    },
}

impl PrescriptionAction {
    /// The prescription this command addresses
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Create(new) => &new.id,
            Self::RequestRefill { id }
            | Self::ApproveRefill { id, .. }
            | Self::Update { id, .. } => id,
        }
    }
}

/// Writes requested by the lifecycle engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrescriptionEffect {
    /// Persist the full record under its id
    SaveRecord(Prescription),

    /// Add the `(patient, prescription)` entry to the patient index
    IndexByPatient {
        /// Patient identifier
        patient_id: String,
        /// Prescription identifier
        prescription_id: String,
    },
}
