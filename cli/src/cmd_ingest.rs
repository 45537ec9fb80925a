//! `neoetl ingest`: fill the gap between the store and the chain.

use std::time::Duration;

use anyhow::{Context, Result};

use neoetl_ingest::{IngestReport, Ingestor, IngestorBuilder};

use crate::config::{open_store, FileConfig};

pub async fn build_ingestor(file: &FileConfig) -> Result<Ingestor> {
    let store = open_store(file.database.as_deref()).await?;
    IngestorBuilder::new()
        .config(file.ingest.clone())
        .store(store)
        .build()
        .context("building ingestor")
}

pub async fn run(file: &FileConfig, follow: bool, interval_secs: u64) -> Result<()> {
    let ingestor = build_ingestor(file).await?;

    if !follow {
        let report = ingestor.ingest_missing().await.context("ingesting missing blocks")?;
        print_report(&report);
        return Ok(());
    }

    let interval = Duration::from_secs(interval_secs.max(1));
    loop {
        match ingestor.ingest_missing().await {
            Ok(report) => print_report(&report),
            Err(e) if !e.is_fatal() => {
                tracing::warn!(error = %e, "ingestion run failed; retrying next interval");
            }
            Err(e) => return Err(e).context("ingesting missing blocks"),
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted; stopping");
                return Ok(());
            }
        }
    }
}

fn print_report(report: &IngestReport) {
    match report.to {
        None => println!("up to date (next height {}, chain height {})", report.from, report.chain_height),
        Some(to) => {
            let s = &report.stats;
            println!(
                "ingested {}..={} ({} blocks, {} transactions): {} records, {} ignored, {} skipped, {} ledger updates skipped, {} reconnects",
                report.from,
                to,
                s.blocks,
                s.transactions,
                s.records,
                s.ignored,
                s.skipped,
                s.ledger_skipped,
                report.reconnects,
            );
        }
    }
}
