//! Property tests over arbitrary invocation sequences.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use rxledger_core::memory::InMemoryLedger;
use rxledger_prescription::codec::decode_prescription;
use rxledger_prescription::{
    ContractHost, Invocation, Prescription, PrescriptionContract, PrescriptionStatus,
};
use rxledger_testing::test_clock;
use std::sync::Arc;

#[derive(Clone, Debug)]
enum Step {
    Request,
    Approve,
    Update { doctor: &'static str, dosage: String },
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Request),
        Just(Step::Approve),
        (prop_oneof![Just("DOC1"), Just("DOC2")], "[a-z0-9]{0,4}")
            .prop_map(|(doctor, dosage)| Step::Update { doctor, dosage }),
    ]
}

impl Step {
    fn invocation(&self) -> Invocation {
        match self {
            Self::Request => Invocation::new("requestRefill", ["RX1"]),
            Self::Approve => Invocation::new("approveRefill", ["RX1", "PHARM1"]),
            Self::Update { doctor, dosage } => Invocation::new(
                "updatePrescription",
                ["RX1", *doctor, "", dosage.as_str(), ""],
            ),
        }
    }
}

fn fetch(host: &ContractHost<InMemoryLedger>) -> Prescription {
    let bytes = host
        .submit(&Invocation::new("getPrescription", ["RX1"]))
        .unwrap();
    decode_prescription(&bytes).unwrap()
}

proptest! {
    #[test]
    fn lifecycle_invariants_hold(
        refills in 0_u32..5,
        steps in prop::collection::vec(step(), 0..40),
    ) {
        let host = ContractHost::new(
            InMemoryLedger::new(),
            PrescriptionContract::new(Arc::new(test_clock())),
        );
        let refills_arg = refills.to_string();
        host.submit(&Invocation::new(
            "createPrescription",
            ["RX1", "PAT1", "DOC1", "Amoxicillin", "500mg", "30", refills_arg.as_str(), "h"],
        ))
        .unwrap();

        let mut before = fetch(&host);

        for step in &steps {
            let result = host.submit(&step.invocation());
            let after = fetch(&host);

            prop_assert!(after.refills_used <= after.refills_allowed);
            prop_assert_eq!(after.refills_allowed, refills);
            prop_assert_eq!(&after.doctor_id, "DOC1");
            prop_assert_eq!(&after.patient_id, "PAT1");
            if after.status == PrescriptionStatus::Completed {
                prop_assert_eq!(after.refills_used, after.refills_allowed);
            }

            match result {
                Ok(_) => {
                    prop_assert!(after.med_history.starts_with(&before.med_history));
                    prop_assert!(after.med_history.len() > before.med_history.len());
                },
                Err(_) => prop_assert_eq!(&after, &before),
            }

            if before.status.is_terminal() {
                prop_assert_eq!(&after, &before);
            }

            before = after;
        }
    }

    #[test]
    fn history_only_lists_own_prescriptions(
        owners in prop::collection::vec(0_usize..3, 1..12),
    ) {
        let host = ContractHost::new(
            InMemoryLedger::new(),
            PrescriptionContract::new(Arc::new(test_clock())),
        );
        let patients = ["P1", "P10", "P2"];

        for (n, owner) in owners.iter().enumerate() {
            let id = format!("RX{n}");
            host.submit(&Invocation::new(
                "createPrescription",
                [id.as_str(), patients[*owner], "DOC1", "M", "D", "1", "1", "h"],
            ))
            .unwrap();
        }

        for (p, patient) in patients.iter().enumerate() {
            let bytes = host
                .submit(&Invocation::new("getPatientHistory", [*patient]))
                .unwrap();
            let mut listed: Vec<String> = serde_json::from_slice(&bytes).unwrap();
            listed.sort();

            let mut expected: Vec<String> = owners
                .iter()
                .enumerate()
                .filter(|(_, owner)| **owner == p)
                .map(|(n, _)| format!("RX{n}"))
                .collect();
            expected.sort();

            prop_assert_eq!(listed, expected);
        }
    }
}
