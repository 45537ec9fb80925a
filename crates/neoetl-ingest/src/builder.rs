//! Fluent builder API for creating ingestors.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn run(store: std::sync::Arc<dyn neoetl_core::DocumentStore>) -> Result<(), neoetl_ingest::IngestError> {
//! use neoetl_ingest::IngestorBuilder;
//!
//! let ingestor = IngestorBuilder::new()
//!     .start_height(2_000_000)
//!     .concurrency(5)
//!     .node_urls(["http://127.0.0.1:10332"])
//!     .store(store)
//!     .build()?;
//! let report = ingestor.ingest_missing().await?;
//! # let _ = report;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use neoetl_core::{Decoder, DocumentStore};
use neoetl_ledger::LedgerEngine;
use neoetl_rpc::{
    FixedConnector, NeoRpc, NeoscanClient, NodeDirectory, NodeSelector, RpcConnector,
    StaticDirectory,
};

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::ingest::Ingestor;
use crate::walker::BlockWalker;

/// Fluent builder for [`Ingestor`].
#[derive(Default)]
pub struct IngestorBuilder {
    config: IngestConfig,
    store: Option<Arc<dyn DocumentStore>>,
    connector: Option<Arc<dyn RpcConnector>>,
    decoder: Option<Decoder>,
}

impl IngestorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn config(mut self, config: IngestConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the first block height considered.
    pub fn start_height(mut self, height: u64) -> Self {
        self.config.start_height = height;
        self
    }

    /// Set the number of block requests in flight.
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    /// Set the number of blocks per fetch chunk.
    pub fn chunk_size(mut self, size: u64) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the number of records between store flushes.
    pub fn flush_interval(mut self, n: usize) -> Self {
        self.config.flush_interval = n;
        self
    }

    pub fn request_timeout_ms(mut self, ms: u64) -> Self {
        self.config.request_timeout_ms = ms;
        self
    }

    /// Use these nodes instead of the node directory.
    pub fn node_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.node_urls = urls.into_iter().map(Into::into).collect();
        self
    }

    pub fn node_directory_url(mut self, url: impl Into<String>) -> Self {
        self.config.node_directory_url = url.into();
        self
    }

    pub fn deny<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.deny_list = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn pass_unknown<I, S>(mut self, hashes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.pass_unknown = hashes.into_iter().map(Into::into).collect();
        self
    }

    pub fn settlement_asset(mut self, symbol: impl Into<String>) -> Self {
        self.config.settlement_asset = symbol.into();
        self
    }

    pub fn rich_list_cutoff(mut self, date: impl Into<String>) -> Self {
        self.config.rich_list_cutoff = date.into();
        self
    }

    pub fn extra_trade_pairs<I, S>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.extra_trade_pairs = pairs.into_iter().map(Into::into).collect();
        self
    }

    pub fn token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.token_file = Some(path.into());
        self
    }

    /// Set the document store. Required.
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set how nodes are obtained. Defaults to a [`NodeSelector`] over the
    /// configured nodes or node directory.
    pub fn connector(mut self, connector: Arc<dyn RpcConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Always use this one client.
    pub fn rpc(self, rpc: Arc<dyn NeoRpc>) -> Self {
        self.connector(Arc::new(FixedConnector(rpc)))
    }

    /// Replace the decoder built from the configured registry.
    pub fn decoder(mut self, decoder: Decoder) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Build the `IngestConfig`.
    pub fn build_config(self) -> IngestConfig {
        self.config
    }

    pub fn build(self) -> Result<Ingestor, IngestError> {
        let config = self.config;
        config.validate()?;
        let store = self
            .store
            .ok_or_else(|| IngestError::Config("a document store is required".into()))?;

        let connector = match self.connector {
            Some(connector) => connector,
            None => default_connector(&config)?,
        };
        let decoder = match self.decoder {
            Some(decoder) => decoder,
            None => Decoder::new(config.registry()?),
        };

        let ledger = Arc::new(
            LedgerEngine::new(store.clone())
                .with_trade_pairs(config.trade_pairs())
                .with_config(config.ledger()),
        );
        let walker = BlockWalker::new(
            Arc::new(decoder),
            ledger.clone(),
            store.clone(),
            config.flush_interval,
        );
        Ok(Ingestor::new(config, connector, store, walker, ledger))
    }
}

fn default_connector(config: &IngestConfig) -> Result<Arc<dyn RpcConnector>, IngestError> {
    let client = config.http_client();
    let directory: Box<dyn NodeDirectory> = if config.node_urls.is_empty() {
        Box::new(NeoscanClient::new(
            config.node_directory_url.clone(),
            Duration::from_millis(config.request_timeout_ms),
        )?)
    } else {
        Box::new(StaticDirectory::new(config.node_urls.clone(), client.clone()))
    };
    Ok(Arc::new(NodeSelector::new(directory, config.deny(), client)))
}
