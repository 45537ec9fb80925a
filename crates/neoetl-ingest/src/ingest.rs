//! The gap-filling ingestion loop.
//!
//! One run:
//!   - connect to a node and read the chain height
//!   - find the first height missing from `blocks`
//!   - fetch the range up to height − 1 in chunks, walking each block in order
//!
//! A connection failure during a chunk re-selects a node and retries that
//! chunk once. Every write is keyed, so a run interrupted anywhere can
//! simply be started again.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use neoetl_core::{Block, Collection, DocumentStore};
use neoetl_ledger::LedgerEngine;
use neoetl_rpc::{NeoRpc, RpcConnector};

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::fetcher::{chunks, BlockFetcher};
use crate::walker::{block_id, BlockWalker, WalkStats};

/// Outcome of one [`Ingestor::ingest_missing`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Highest block index on the node at the start of the run.
    pub chain_height: u64,
    /// First height ingested, or the next height when already up to date.
    pub from: u64,
    pub to: Option<u64>,
    pub chunks: usize,
    pub reconnects: u32,
    pub stats: WalkStats,
}

impl IngestReport {
    pub fn is_up_to_date(&self) -> bool {
        self.to.is_none()
    }
}

/// Where the store stands relative to the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStatus {
    pub node: String,
    pub chain_height: u64,
    /// Documents in `blocks`.
    pub ingested: u64,
    /// First height not yet in `blocks`.
    pub next_height: u64,
    pub behind: u64,
}

pub struct Ingestor {
    config: IngestConfig,
    connector: Arc<dyn RpcConnector>,
    store: Arc<dyn DocumentStore>,
    ledger: Arc<LedgerEngine>,
    fetcher: BlockFetcher,
    walker: BlockWalker,
}

impl Ingestor {
    pub fn new(
        config: IngestConfig,
        connector: Arc<dyn RpcConnector>,
        store: Arc<dyn DocumentStore>,
        walker: BlockWalker,
        ledger: Arc<LedgerEngine>,
    ) -> Self {
        Self {
            fetcher: BlockFetcher::new(config.concurrency),
            config,
            connector,
            store,
            ledger,
            walker,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<LedgerEngine> {
        &self.ledger
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Ingest every block from the first gap up to the chain height − 1.
    pub async fn ingest_missing(&self) -> Result<IngestReport, IngestError> {
        let mut rpc = self.connector.connect().await?;
        let count = rpc.block_count().await?;
        let from = self.first_missing().await?;
        let mut report = IngestReport {
            chain_height: count.saturating_sub(1),
            from,
            ..Default::default()
        };

        let Some(tip) = count.checked_sub(1).filter(|tip| *tip >= from) else {
            info!(next = from, chain_height = report.chain_height, "up to date");
            return Ok(report);
        };
        report.to = Some(tip);
        info!(node = %rpc.url(), from, to = tip, "ingesting missing blocks");

        for (lo, hi) in chunks(from, tip, self.config.chunk_size) {
            let blocks = match self.fetcher.fetch(rpc.as_ref(), lo, hi).await {
                Ok(blocks) => blocks,
                Err(e) if e.is_connection_error() => {
                    warn!(node = %rpc.url(), from = lo, to = hi, error = %e, "re-selecting node");
                    rpc = self.connector.connect().await?;
                    report.reconnects += 1;
                    self.fetcher.fetch(rpc.as_ref(), lo, hi).await?
                }
                Err(e) => return Err(e.into()),
            };

            let chunk = self.walk_all(&blocks).await?;
            info!(
                from = lo,
                to = hi,
                records = chunk.records,
                skipped = chunk.skipped,
                ledger_skipped = chunk.ledger_skipped,
                "chunk ingested"
            );
            report.stats.merge(&chunk);
            report.chunks += 1;
        }

        info!(
            blocks = report.stats.blocks,
            records = report.stats.records,
            skipped = report.stats.skipped,
            "ingestion run complete"
        );
        Ok(report)
    }

    async fn walk_all(&self, blocks: &[Block]) -> Result<WalkStats, IngestError> {
        let mut stats = WalkStats::default();
        for block in blocks {
            stats.merge(&self.walker.walk(block).await?);
        }
        Ok(stats)
    }

    /// First height at or above `start_height` missing from `blocks`.
    ///
    /// Blocks are written in height order, so the stored heights form a
    /// prefix from the start height and the gap is found by binary search
    /// below `start_height + count`.
    pub async fn first_missing(&self) -> Result<u64, IngestError> {
        let start = self.config.start_height;
        let count = self.store.count(Collection::Blocks).await?;
        let (mut lo, mut hi) = (start, start.saturating_add(count));
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.has_block(mid).await? {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

    async fn has_block(&self, height: u64) -> Result<bool, IngestError> {
        Ok(self
            .store
            .find_one(Collection::Blocks, &block_id(height))
            .await?
            .is_some())
    }

    pub async fn status(&self) -> Result<IngestStatus, IngestError> {
        let rpc = self.connector.connect().await?;
        let count = rpc.block_count().await?;
        let ingested = self.store.count(Collection::Blocks).await?;
        let next_height = self.first_missing().await?;
        Ok(IngestStatus {
            node: rpc.url().to_string(),
            chain_height: count.saturating_sub(1),
            ingested,
            next_height,
            behind: count.saturating_sub(next_height),
        })
    }

    /// A node connection, for auxiliary queries.
    pub async fn connect(&self) -> Result<Arc<dyn NeoRpc>, IngestError> {
        Ok(self.connector.connect().await?)
    }
}
