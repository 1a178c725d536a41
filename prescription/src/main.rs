//! `rxledger`: runs the prescription contract over an in-memory ledger.
//!
//! Reads one JSON invocation per line from stdin, e.g.
//!
//! ```text
//! {"function":"createPrescription","args":["RX1","PAT1","DOC1","Amoxicillin","500mg","30","2","hash"]}
//! {"function":"getPatientHistory","args":["PAT1"]}
//! ```
//!
//! and writes one JSON response per line to stdout. Logs go to stderr.

use anyhow::Context;
use rxledger_core::environment::SystemClock;
use rxledger_core::memory::InMemoryLedger;
use rxledger_prescription::host::STATUS_ERROR;
use rxledger_prescription::{ContractConfig, ContractHost, Invocation, PrescriptionContract, Response};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    let config = ContractConfig::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!(
        validity_months = config.validity_months,
        strict_numeric_args = config.strict_numeric_args,
        "Starting rxledger"
    );

    let contract = PrescriptionContract::with_config(Arc::new(SystemClock), &config);
    let host = ContractHost::new(InMemoryLedger::new(), contract);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut handled = 0_u64;

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Invocation>(line) {
            Ok(invocation) => host.execute(&invocation),
            Err(error) => {
                tracing::warn!(%error, "Malformed invocation");
                Response {
                    status: STATUS_ERROR,
                    payload: None,
                    message: Some(format!("Malformed invocation: {error}")),
                    kind: None,
                }
            },
        };

        let mut out = serde_json::to_vec(&response).context("failed to encode response")?;
        out.push(b'\n');
        stdout.write_all(&out).await.context("failed to write stdout")?;
        stdout.flush().await.context("failed to flush stdout")?;
        handled += 1;
    }

    tracing::info!(
        invocations = handled,
        height = host.ledger().height()?,
        "Input exhausted, shutting down"
    );

    Ok(())
}
