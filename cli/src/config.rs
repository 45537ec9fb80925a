//! Config file loading and store construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use neoetl_core::DocumentStore;
use neoetl_ingest::IngestConfig;
use neoetl_storage::{MemoryStore, SqliteStore};

use crate::tracing_setup::LogConfig;

/// Contents of the JSON config file. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// SQLite database file. An in-memory store is used when unset.
    pub database: Option<PathBuf>,
    pub ingest: IngestConfig,
    pub log: LogConfig,
}

impl FileConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }
}

pub async fn open_store(database: Option<&Path>) -> Result<Arc<dyn DocumentStore>> {
    match database {
        Some(path) => {
            let store = SqliteStore::open(&path.to_string_lossy())
                .await
                .with_context(|| format!("opening database {}", path.display()))?;
            tracing::info!(path = %path.display(), "using SQLite store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("no database configured; using an in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
