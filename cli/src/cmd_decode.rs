//! `neoetl decode`: run one script through the decoder and show each stage.

use anyhow::{Context, Result};

use neoetl_core::{Block, Decoder, Transaction, Vout};
use neoetl_ingest::IngestConfig;

pub struct Input<'a> {
    pub script: String,
    pub vout: Option<&'a str>,
    pub txid: String,
    pub height: u64,
    pub time: i64,
}

impl Input<'_> {
    fn into_block(self) -> Result<Block> {
        let vout: Vec<Vout> = match self.vout {
            Some(json) => serde_json::from_str(json).context("parsing --vout")?,
            None => Vec::new(),
        };
        let tx = Transaction {
            txid: self.txid,
            size: 0,
            tx_type: "InvocationTransaction".into(),
            vout,
            script: Some(self.script),
        };
        Ok(Block {
            hash: "0x00".into(),
            size: 0,
            time: self.time,
            index: self.height,
            previous_hash: None,
            merkle_root: None,
            tx: vec![tx],
        })
    }
}

pub fn run(config: &IngestConfig, input: Input<'_>, json: bool) -> Result<()> {
    let decoder = Decoder::new(config.registry().context("loading contract registry")?);
    let block = input.into_block()?;
    let tx = &block.tx[0];
    let inspection = decoder
        .inspect(&block, tx)
        .with_context(|| format!("decoding transaction {}", tx.hash_hex()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&inspection.record)?);
        return Ok(());
    }

    println!("Instructions ({}):", inspection.instructions.len());
    for (i, ins) in inspection.instructions.iter().enumerate() {
        println!("  {i:>3}  {ins}");
    }
    println!();
    match &inspection.resolution {
        Some(res) => {
            println!("Contract:  {} ({})", res.contract.hash, res.contract.version);
            println!("Operation: {}", res.kind);
        }
        None => println!("Not a tracked exchange transaction."),
    }
    if let Some(record) = &inspection.record {
        println!();
        println!("{}", serde_json::to_string_pretty(record)?);
    }
    Ok(())
}
