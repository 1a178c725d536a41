//! End-to-end tests: invocations submitted through a host over an
//! in-memory ledger.

#![allow(clippy::unwrap_used)]

use chrono::{Duration, TimeZone, Utc};
use rxledger_core::memory::InMemoryLedger;
use rxledger_core::store::{Ledger, StoreError};
use rxledger_core::transaction::Transaction;
use rxledger_prescription::codec::decode_prescription;
use rxledger_prescription::{
    ContractConfig, ContractError, ContractHost, ErrorKind, Invocation, Prescription,
    PrescriptionContract, PrescriptionStatus, StateViolation,
};
use rxledger_testing::{ManualClock, init_test_tracing, test_clock, test_time};
use std::collections::BTreeSet;
use std::sync::Arc;

fn host() -> ContractHost<InMemoryLedger> {
    init_test_tracing();
    ContractHost::new(
        InMemoryLedger::new(),
        PrescriptionContract::new(Arc::new(test_clock())),
    )
}

fn create(id: &str, patient: &str, refills: &str) -> Invocation {
    Invocation::new(
        "createPrescription",
        [id, patient, "DOC1", "Amoxicillin", "500mg", "30", refills, "QmHash"],
    )
}

fn fetch(host: &ContractHost<InMemoryLedger>, id: &str) -> Prescription {
    let bytes = host
        .submit(&Invocation::new("getPrescription", [id]))
        .unwrap();
    decode_prescription(&bytes).unwrap()
}

fn history(host: &ContractHost<InMemoryLedger>, patient: &str) -> BTreeSet<String> {
    let bytes = host
        .submit(&Invocation::new("getPatientHistory", [patient]))
        .unwrap();
    serde_json::from_slice::<Vec<String>>(&bytes)
        .unwrap()
        .into_iter()
        .collect()
}

fn ids(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

#[test]
fn test_full_refill_lifecycle() {
    let host = host();

    host.submit(&create("RX1", "PAT1", "2")).unwrap();
    let rx = fetch(&host, "RX1");
    assert_eq!(rx.status, PrescriptionStatus::Active);
    assert_eq!(rx.refills_used, 0);
    assert_eq!(rx.issue_date, test_time());
    assert_eq!(rx.expiry_date, Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap());
    assert_eq!(rx.med_history.len(), 1);

    host.submit(&Invocation::new("requestRefill", ["RX1"])).unwrap();
    assert_eq!(fetch(&host, "RX1").status, PrescriptionStatus::RefillRequested);

    host.submit(&Invocation::new("approveRefill", ["RX1", "PHARM1"]))
        .unwrap();
    let rx = fetch(&host, "RX1");
    assert_eq!(rx.status, PrescriptionStatus::Active);
    assert_eq!(rx.refills_used, 1);

    host.submit(&Invocation::new("requestRefill", ["RX1"])).unwrap();
    host.submit(&Invocation::new("approveRefill", ["RX1", "PHARM2"]))
        .unwrap();
    let rx = fetch(&host, "RX1");
    assert_eq!(rx.status, PrescriptionStatus::Completed);
    assert_eq!(rx.refills_used, 2);
    assert_eq!(rx.med_history.len(), 6);
    assert_eq!(
        rx.med_history.last().unwrap(),
        "Prescription marked as completed on 2025-01-01T00:00:00Z - no more refills"
    );

    let err = host
        .submit(&Invocation::new("requestRefill", ["RX1"]))
        .unwrap_err();
    assert_eq!(err.violation(), Some(&StateViolation::NoRefillsRemaining));
    assert_eq!(fetch(&host, "RX1"), rx);
}

#[test]
fn test_stored_record_uses_ledger_field_names() {
    let host = host();
    host.submit(&create("RX1", "PAT1", "2")).unwrap();

    let bytes = host
        .submit(&Invocation::new("getPrescription", ["RX1"]))
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(json["patientId"], "PAT1");
    assert_eq!(json["medicationName"], "Amoxicillin");
    assert_eq!(json["refillsAllowed"], 2);
    assert_eq!(json["refillsUsed"], 0);
    assert_eq!(json["issueDate"], "2025-01-01T00:00:00Z");
    assert_eq!(json["expiryDate"], "2025-07-01T00:00:00Z");
    assert_eq!(json["status"], "ACTIVE");
    assert_eq!(json["documentHash"], "QmHash");
    assert_eq!(
        json["medHistory"][0],
        "Prescription created on 2025-01-01T00:00:00Z"
    );
}

#[test]
fn test_duplicate_create_leaves_record_unchanged() {
    let host = host();
    host.submit(&create("RX1", "PAT1", "2")).unwrap();
    let before = fetch(&host, "RX1");

    let err = host.submit(&create("RX1", "PAT2", "5")).unwrap_err();
    assert_eq!(err, ContractError::AlreadyExists("RX1".to_string()));
    assert_eq!(err.to_string(), "This prescription already exists: RX1");

    assert_eq!(fetch(&host, "RX1"), before);
    assert!(history(&host, "PAT2").is_empty());
}

#[test]
fn test_patient_history_partitions_by_patient() {
    let host = host();
    host.submit(&create("RX1", "P1", "1")).unwrap();
    host.submit(&create("RX2", "P1", "1")).unwrap();
    host.submit(&create("RX3", "P2", "1")).unwrap();

    assert_eq!(history(&host, "P1"), ids(&["RX1", "RX2"]));
    assert_eq!(history(&host, "P2"), ids(&["RX3"]));
    assert!(history(&host, "P3").is_empty());
}

#[test]
fn test_empty_history_is_an_empty_array() {
    let host = host();
    let bytes = host
        .submit(&Invocation::new("getPatientHistory", ["NOBODY"]))
        .unwrap();
    assert_eq!(bytes, b"[]".to_vec());
}

#[test]
fn test_patient_prefix_does_not_leak() {
    let host = host();
    host.submit(&create("RX1", "P1", "1")).unwrap();
    host.submit(&create("RX10", "P10", "1")).unwrap();

    assert_eq!(history(&host, "P1"), ids(&["RX1"]));
}

#[test]
fn test_history_survives_refills_and_updates() {
    let host = host();
    host.submit(&create("RX1", "P1", "1")).unwrap();
    host.submit(&Invocation::new("requestRefill", ["RX1"])).unwrap();
    host.submit(&Invocation::new("approveRefill", ["RX1", "PHARM1"]))
        .unwrap();

    assert_eq!(history(&host, "P1"), ids(&["RX1"]));
}

#[test]
fn test_update_by_issuing_doctor() {
    let host = host();
    host.submit(&create("RX1", "PAT1", "2")).unwrap();

    host.submit(&Invocation::new(
        "updatePrescription",
        ["RX1", "DOC1", "Ibuprofen", "", "switch to NSAID"],
    ))
    .unwrap();

    let rx = fetch(&host, "RX1");
    assert_eq!(rx.medication_name, "Ibuprofen");
    assert_eq!(rx.dosage, "500mg");
    assert_eq!(rx.status, PrescriptionStatus::Active);
    assert_eq!(
        rx.med_history.last().unwrap(),
        "Updated on 2025-01-01T00:00:00Z: Medication changed from Amoxicillin to Ibuprofen. \
         Comment: switch to NSAID"
    );
}

#[test]
fn test_unauthorized_update_changes_nothing() {
    let host = host();
    host.submit(&create("RX1", "PAT1", "2")).unwrap();
    let before = fetch(&host, "RX1");

    let err = host
        .submit(&Invocation::new(
            "updatePrescription",
            ["RX1", "DOC2", "Ibuprofen", "200mg", "x"],
        ))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(fetch(&host, "RX1"), before);
}

#[test]
fn test_update_rejected_while_refill_pending() {
    let host = host();
    host.submit(&create("RX1", "PAT1", "2")).unwrap();
    host.submit(&Invocation::new("requestRefill", ["RX1"])).unwrap();

    let err = host
        .submit(&Invocation::new(
            "updatePrescription",
            ["RX1", "DOC1", "Ibuprofen", "", ""],
        ))
        .unwrap_err();
    assert_eq!(
        err.violation(),
        Some(&StateViolation::NotActive {
            status: PrescriptionStatus::RefillRequested
        })
    );
}

#[test]
fn test_approve_without_request() {
    let host = host();
    host.submit(&create("RX1", "PAT1", "2")).unwrap();

    let err = host
        .submit(&Invocation::new("approveRefill", ["RX1", "PHARM1"]))
        .unwrap_err();
    assert_eq!(
        err.violation(),
        Some(&StateViolation::RefillNotRequested {
            status: PrescriptionStatus::Active
        })
    );
    assert_eq!(fetch(&host, "RX1").refills_used, 0);
}

#[test]
fn test_zero_refills_cannot_be_requested() {
    let host = host();
    host.submit(&create("RX1", "PAT1", "0")).unwrap();

    let err = host
        .submit(&Invocation::new("requestRefill", ["RX1"]))
        .unwrap_err();
    assert_eq!(err.violation(), Some(&StateViolation::NoRefillsRemaining));
}

#[test]
fn test_expiry_is_enforced_by_the_clock() {
    init_test_tracing();
    let clock = ManualClock::new(test_time());
    let host = ContractHost::new(
        InMemoryLedger::new(),
        PrescriptionContract::new(Arc::new(clock.clone())),
    );
    host.submit(&create("RX1", "PAT1", "3")).unwrap();

    // The expiry instant itself is still valid
    clock.set(Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap());
    host.submit(&Invocation::new("requestRefill", ["RX1"])).unwrap();
    host.submit(&Invocation::new("approveRefill", ["RX1", "PHARM1"]))
        .unwrap();

    clock.advance(Duration::seconds(1));
    let err = host
        .submit(&Invocation::new("requestRefill", ["RX1"]))
        .unwrap_err();
    assert!(matches!(
        err.violation(),
        Some(StateViolation::Expired { .. })
    ));
    assert_eq!(fetch(&host, "RX1").status, PrescriptionStatus::Active);
}

#[test]
fn test_configured_validity_period() {
    let config = ContractConfig {
        validity_months: 12,
        ..ContractConfig::default()
    };
    let host = ContractHost::new(
        InMemoryLedger::new(),
        PrescriptionContract::with_config(Arc::new(test_clock()), &config),
    );
    host.submit(&create("RX1", "PAT1", "1")).unwrap();

    assert_eq!(
        fetch(&host, "RX1").expiry_date,
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    );
}

#[test]
fn test_strict_numeric_arguments() {
    let config = ContractConfig {
        strict_numeric_args: true,
        ..ContractConfig::default()
    };
    let host = ContractHost::new(
        InMemoryLedger::new(),
        PrescriptionContract::with_config(Arc::new(test_clock()), &config),
    );

    let err = host.submit(&create("RX1", "PAT1", "two")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(host.ledger().is_empty().unwrap());
}

#[test]
fn test_lenient_numeric_arguments_become_zero() {
    let host = host();
    host.submit(&create("RX1", "PAT1", "two")).unwrap();
    assert_eq!(fetch(&host, "RX1").refills_allowed, 0);
}

#[test]
fn test_signed_quantity_is_stored_as_given() {
    let host = host();
    host.submit(&Invocation::new(
        "createPrescription",
        ["RX1", "PAT1", "DOC1", "Amoxicillin", "500mg", "-5", "-1", "QmHash"],
    ))
    .unwrap();

    let rx = fetch(&host, "RX1");
    assert_eq!(rx.quantity, -5);
    assert_eq!(rx.refills_allowed, 0);
}

#[test]
fn test_missing_prescription() {
    let host = host();
    for invocation in [
        Invocation::new("getPrescription", ["RX9"]),
        Invocation::new("requestRefill", ["RX9"]),
        Invocation::new("approveRefill", ["RX9", "PHARM1"]),
        Invocation::new("updatePrescription", ["RX9", "DOC1", "", "", ""]),
    ] {
        let err = host.submit(&invocation).unwrap_err();
        assert_eq!(err, ContractError::NotFound("RX9".to_string()));
    }
    assert!(host.ledger().is_empty().unwrap());
}

#[test]
fn test_dispatch_errors_write_nothing() {
    let host = host();

    let err = host
        .submit(&Invocation::new("approveRefill", ["RX1"]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgumentCount);

    let err = host
        .submit(&Invocation::new("revokePrescription", ["RX1"]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);

    let err = host
        .submit(&Invocation::new(
            "createPrescription",
            ["RX1", "PAT1", "DOC1", "M", "D", "30", "2"],
        ))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgumentCount);

    assert!(host.ledger().is_empty().unwrap());
    assert_eq!(host.ledger().height().unwrap(), 0);
}

#[test]
fn test_invocation_parses_from_json() {
    let invocation: Invocation =
        serde_json::from_str(r#"{"function":"getPatientHistory","args":["PAT1"]}"#).unwrap();
    assert_eq!(invocation, Invocation::new("getPatientHistory", ["PAT1"]));
}

#[test]
fn test_concurrent_creates_conflict() {
    let ledger = InMemoryLedger::new();
    let contract = PrescriptionContract::new(Arc::new(test_clock()));

    let mut first = Transaction::new(&ledger);
    let mut second = Transaction::new(&ledger);
    contract
        .invoke(&mut first, &create("RX1", "PAT1", "1"))
        .unwrap();
    contract
        .invoke(&mut second, &create("RX1", "PAT2", "1"))
        .unwrap();

    let first = first.into_write_set();
    let second = second.into_write_set();
    ledger.commit(first).unwrap();
    let err = ledger.commit(second).unwrap_err();
    assert!(matches!(err, StoreError::ReadConflict { .. }));

    let host = ContractHost::new(ledger, contract);
    assert_eq!(fetch(&host, "RX1").patient_id, "PAT1");
    assert!(history(&host, "PAT2").is_empty());
}
