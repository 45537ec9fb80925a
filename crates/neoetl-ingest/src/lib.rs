//! neoetl-ingest: fetching, walking and storing NEO exchange blocks.
//!
//! # Architecture
//!
//! ```text
//! Ingestor::ingest_missing
//!   ├─ first_missing()          binary search over `blocks`
//!   ├─ BlockFetcher::fetch      bounded-concurrency getblock, in order
//!   └─ BlockWalker::walk        per transaction:
//!        decode → transactions / fees / freezes (batched)
//!               → LedgerEngine::apply             (per record)
//!        then the block document, last
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod ingest;
pub mod walker;

pub use builder::IngestorBuilder;
pub use config::IngestConfig;
pub use error::IngestError;
pub use fetcher::BlockFetcher;
pub use ingest::{IngestReport, IngestStatus, Ingestor};
pub use walker::{BlockDocument, BlockWalker, WalkStats};
