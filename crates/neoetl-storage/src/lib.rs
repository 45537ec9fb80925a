//! neoetl-storage: [`DocumentStore`](neoetl_core::DocumentStore) backends.
//!
//! Backends:
//! - [`memory`]: in-memory (tests, dry runs)
//! - [`sqlite`]: SQLite via `sqlx` (single-file persistence, `sqlite` feature)

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
