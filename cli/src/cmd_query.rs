//! `neoetl status`, `neoetl trading-state` and `neoetl baseline`.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};

use neoetl_core::contracts::CONTRACT_V3;
use neoetl_rpc::queries::is_trading_active;
use neoetl_rpc::NeoscanClient;

use crate::cmd_ingest::build_ingestor;
use crate::config::FileConfig;

pub async fn status(file: &FileConfig, json: bool) -> Result<()> {
    let ingestor = build_ingestor(file).await?;
    let status = ingestor.status().await.context("querying status")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }
    println!("Node:            {}", status.node);
    println!("Chain height:    {}", status.chain_height);
    println!("Blocks stored:   {}", status.ingested);
    println!("Next height:     {}", status.next_height);
    println!("Blocks behind:   {}", status.behind);
    Ok(())
}

pub async fn trading_state(file: &FileConfig, contract: Option<&str>) -> Result<()> {
    let contract = contract.unwrap_or(CONTRACT_V3);
    let ingestor = build_ingestor(file).await?;
    let rpc = ingestor.connect().await.context("connecting to a node")?;
    let active = is_trading_active(rpc.as_ref(), contract)
        .await
        .with_context(|| format!("querying getState on {contract}"))?;
    println!(
        "{contract}: trading {}",
        if active { "active" } else { "frozen" }
    );
    Ok(())
}

pub async fn baseline(file: &FileConfig, address: &str) -> Result<()> {
    let neoscan = NeoscanClient::new(
        file.ingest.node_directory_url.clone(),
        Duration::from_millis(file.ingest.request_timeout_ms),
    )?;
    let balances: BTreeMap<String, u64> = neoscan
        .balance(address)
        .await
        .with_context(|| format!("fetching balance of {address}"))?
        .into_iter()
        .collect();

    let ingestor = build_ingestor(file).await?;
    ingestor
        .ledger()
        .set_baseline_balance(address, balances.clone())
        .await
        .with_context(|| format!("storing baseline for {address}"))?;

    println!("{address}:");
    for (asset, amount) in &balances {
        println!("  {asset:<8} {amount}");
    }
    Ok(())
}
