//! Ingestion configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use neoetl_core::ContractRegistry;
use neoetl_ledger::{LedgerConfig, TradePairs};
use neoetl_rpc::node::{DEFAULT_DENY_LIST, NEOSCAN_MAINNET};
use neoetl_rpc::{DenyList, HttpClientConfig, RetryConfig};

use crate::error::IngestError;

/// Configuration for an ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// First block height considered for ingestion.
    pub start_height: u64,
    /// Block requests in flight at once.
    pub concurrency: usize,
    /// Blocks fetched and applied per chunk.
    pub chunk_size: u64,
    /// Records between store flushes inside a block.
    pub flush_interval: usize,
    pub request_timeout_ms: u64,
    pub retry: RetryConfig,
    /// Nodes to use directly. When empty, nodes come from `node_directory_url`.
    pub node_urls: Vec<String>,
    pub node_directory_url: String,
    /// Host patterns never selected (`*suffix` or substring).
    pub deny_list: Vec<String>,
    /// Contract hashes recorded without a typed decoder.
    pub pass_unknown: Vec<String>,
    pub settlement_asset: String,
    /// First `YYYY-MM-DD` counted into rich-list totals.
    pub rich_list_cutoff: String,
    /// Trade pairs known in addition to the built-in list.
    pub extra_trade_pairs: Vec<String>,
    /// JSON token listing merged into the built-in token table.
    pub token_file: Option<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        let ledger = LedgerConfig::default();
        Self {
            start_height: 2_000_000,
            concurrency: 5,
            chunk_size: 10,
            flush_interval: 10,
            request_timeout_ms: 30_000,
            retry: RetryConfig::default(),
            node_urls: Vec::new(),
            node_directory_url: NEOSCAN_MAINNET.into(),
            deny_list: DEFAULT_DENY_LIST.iter().map(|s| s.to_string()).collect(),
            pass_unknown: Vec::new(),
            settlement_asset: ledger.settlement_asset,
            rich_list_cutoff: ledger.rich_list_cutoff,
            extra_trade_pairs: Vec::new(),
            token_file: None,
        }
    }
}

impl IngestConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.concurrency == 0 {
            return Err(IngestError::Config("concurrency must be at least 1".into()));
        }
        if self.chunk_size == 0 {
            return Err(IngestError::Config("chunk_size must be at least 1".into()));
        }
        if self.flush_interval == 0 {
            return Err(IngestError::Config("flush_interval must be at least 1".into()));
        }
        Ok(())
    }

    pub fn http_client(&self) -> HttpClientConfig {
        HttpClientConfig {
            retry: self.retry.clone(),
            request_timeout_ms: self.request_timeout_ms,
        }
    }

    pub fn deny(&self) -> DenyList {
        DenyList::from_patterns(self.deny_list.iter().cloned())
    }

    pub fn ledger(&self) -> LedgerConfig {
        LedgerConfig {
            settlement_asset: self.settlement_asset.clone(),
            rich_list_cutoff: self.rich_list_cutoff.clone(),
        }
    }

    pub fn trade_pairs(&self) -> TradePairs {
        TradePairs::default().with_pairs(self.extra_trade_pairs.iter().cloned())
    }

    /// Mainnet contracts plus the configured allow-list and token file.
    pub fn registry(&self) -> Result<ContractRegistry, IngestError> {
        let mut registry =
            ContractRegistry::mainnet().with_pass_unknown(self.pass_unknown.iter().cloned());
        if let Some(path) = &self.token_file {
            let json = std::fs::read_to_string(path)
                .map_err(|e| IngestError::Config(format!("{}: {e}", path.display())))?;
            let added = registry
                .tokens_mut()
                .extend_from_json(&json)
                .map_err(|e| IngestError::Config(format!("{}: {e}", path.display())))?;
            tracing::info!(path = %path.display(), tokens = added, "loaded token listing");
        }
        Ok(registry)
    }
}
