//! Per-block decode, classification and batching.
//!
//! Transactions are handled strictly in block order. Each decoded record
//! goes to `transactions` (plus `fees` or `freezes` by kind) through a
//! write batch flushed every `flush_interval` records, and is folded into
//! the ledger immediately. The block document is written last, so a block
//! present in `blocks` has had all of its records applied.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use neoetl_core::{Block, Collection, Decoder, DocumentStore, OperationRecord, WriteBatch};
use neoetl_ledger::LedgerEngine;

use crate::error::IngestError;

/// Counters for one or more walked blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkStats {
    pub blocks: u64,
    pub transactions: u64,
    /// Transactions decoded into a record.
    pub records: u64,
    /// Transactions that do not touch a tracked contract.
    pub ignored: u64,
    /// Transactions dropped on a decode error.
    pub skipped: u64,
    /// Records stored whose ledger update was dropped.
    pub ledger_skipped: u64,
    pub flushes: u64,
}

impl WalkStats {
    pub fn merge(&mut self, other: &WalkStats) {
        self.blocks += other.blocks;
        self.transactions += other.transactions;
        self.records += other.records;
        self.ignored += other.ignored;
        self.skipped += other.skipped;
        self.ledger_skipped += other.ledger_skipped;
        self.flushes += other.flushes;
    }
}

/// The stored form of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDocument {
    pub hash: String,
    pub index: u64,
    pub size: u64,
    pub time: i64,
    pub date: String,
    pub tx_count: usize,
}

impl From<&Block> for BlockDocument {
    fn from(block: &Block) -> Self {
        Self {
            hash: block.hash_hex().to_string(),
            index: block.index,
            size: block.size,
            time: block.time,
            date: block.date(),
            tx_count: block.tx.len(),
        }
    }
}

/// Document id of the block at `height`.
pub fn block_id(height: u64) -> String {
    height.to_string()
}

pub struct BlockWalker {
    decoder: Arc<Decoder>,
    ledger: Arc<LedgerEngine>,
    store: Arc<dyn DocumentStore>,
    flush_interval: usize,
}

impl BlockWalker {
    pub fn new(
        decoder: Arc<Decoder>,
        ledger: Arc<LedgerEngine>,
        store: Arc<dyn DocumentStore>,
        flush_interval: usize,
    ) -> Self {
        Self {
            decoder,
            ledger,
            store,
            flush_interval: flush_interval.max(1),
        }
    }

    /// Decode, route and store every transaction of `block`, then the block.
    ///
    /// A transaction that fails to decode is logged and skipped. A critical
    /// contract failure aborts the block before the block document is
    /// written, so the block is retried on the next run.
    pub async fn walk(&self, block: &Block) -> Result<WalkStats, IngestError> {
        let mut stats = WalkStats {
            blocks: 1,
            ..Default::default()
        };
        let mut batch = WriteBatch::new();
        let mut pending = 0usize;

        for tx in &block.tx {
            stats.transactions += 1;
            let record = match self.decoder.decode_transaction(block, tx) {
                Ok(Some(record)) => record,
                Ok(None) => {
                    stats.ignored += 1;
                    continue;
                }
                Err(e) if e.is_fatal() => {
                    error!(block = block.index, tx = %tx.hash_hex(), error = %e, "aborting block");
                    return Err(IngestError::Decode {
                        block: block.index,
                        tx: tx.hash_hex().to_string(),
                        source: e,
                    });
                }
                Err(e) => {
                    warn!(block = block.index, tx = %tx.hash_hex(), error = %e, "skipping transaction");
                    stats.skipped += 1;
                    continue;
                }
            };

            let meta = record.meta();
            debug!(
                block = block.index,
                tx = %meta.transaction_hash,
                contract = %meta.contract_hash,
                kind = record.type_name(),
                "decoded"
            );
            stats.records += 1;
            classify(&record, &mut batch)?;

            match self.ledger.apply(&record).await {
                Ok(_) => {}
                Err(e) if e.is_skippable() => {
                    warn!(
                        block = block.index,
                        tx = %meta.transaction_hash,
                        kind = record.type_name(),
                        error = %e,
                        "ledger update skipped"
                    );
                    stats.ledger_skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }

            pending += 1;
            if pending >= self.flush_interval {
                self.store.apply(std::mem::take(&mut batch)).await?;
                stats.flushes += 1;
                pending = 0;
            }
        }

        if !batch.is_empty() {
            self.store.apply(batch).await?;
            stats.flushes += 1;
        }

        let mut last = WriteBatch::new();
        last.put_value(Collection::Blocks, block_id(block.index), &BlockDocument::from(block))?;
        self.store.apply(last).await?;
        Ok(stats)
    }
}

/// Queue the per-record documents: every record in `transactions`, fills
/// also in `fees`, trading state changes also in `freezes`.
fn classify(record: &OperationRecord, batch: &mut WriteBatch) -> Result<(), IngestError> {
    let id = record.transaction_hash();
    batch.put_value(Collection::Transactions, id, record)?;
    match record {
        OperationRecord::FillOffer(_) => batch.put_value(Collection::Fees, id, record)?,
        OperationRecord::FreezeTrading(_) | OperationRecord::UnfreezeTrading(_) => {
            batch.put_value(Collection::Freezes, id, record)?
        }
        _ => {}
    }
    Ok(())
}
