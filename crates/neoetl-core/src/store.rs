//! Document store abstraction the pipeline writes through.
//!
//! Every document is keyed by a string id within a [`Collection`], and every
//! write is an upsert, so replaying a block converges on the same state.

use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The collections the pipeline maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    Blocks,
    Transactions,
    Fees,
    Freezes,
    OfferHash,
    Addresses,
    AddressesDate,
    AddressTransactions,
    /// Per-address activity log, one document per address and transaction.
    AddressActivity,
    /// Merge keys already folded into `addresses` / `addresses_date`.
    AddressMerges,
}

impl Collection {
    pub const ALL: [Collection; 10] = [
        Collection::Blocks,
        Collection::Transactions,
        Collection::Fees,
        Collection::Freezes,
        Collection::OfferHash,
        Collection::Addresses,
        Collection::AddressesDate,
        Collection::AddressTransactions,
        Collection::AddressActivity,
        Collection::AddressMerges,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blocks => "blocks",
            Self::Transactions => "transactions",
            Self::Fees => "fees",
            Self::Freezes => "freezes",
            Self::OfferHash => "offer_hash",
            Self::Addresses => "addresses",
            Self::AddressesDate => "addresses_date",
            Self::AddressTransactions => "address_transactions",
            Self::AddressActivity => "address_activity",
            Self::AddressMerges => "address_merges",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Backend(String),

    #[error("Serialization error in {collection}/{id}: {reason}")]
    Serialization {
        collection: String,
        id: String,
        reason: String,
    },
}

impl StoreError {
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}

/// A stored JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub body: serde_json::Value,
}

impl Document {
    pub fn new(id: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            body,
        }
    }

    /// Serialize `value` as the document body.
    pub fn from_value<T: Serialize>(
        collection: Collection,
        id: impl Into<String>,
        value: &T,
    ) -> Result<Self, StoreError> {
        let id = id.into();
        let body = serde_json::to_value(value).map_err(|e| StoreError::Serialization {
            collection: collection.to_string(),
            id: id.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { id, body })
    }

    /// Deserialize the body.
    pub fn parse<T: DeserializeOwned>(&self, collection: Collection) -> Result<T, StoreError> {
        serde_json::from_value(self.body.clone()).map_err(|e| StoreError::Serialization {
            collection: collection.to_string(),
            id: self.id.clone(),
            reason: e.to_string(),
        })
    }
}

/// A set of upserts applied atomically.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    writes: Vec<(Collection, Document)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, collection: Collection, doc: Document) {
        self.writes.push((collection, doc));
    }

    pub fn put_value<T: Serialize>(
        &mut self,
        collection: Collection,
        id: impl Into<String>,
        value: &T,
    ) -> Result<(), StoreError> {
        self.put(collection, Document::from_value(collection, id, value)?);
        Ok(())
    }

    pub fn extend(&mut self, other: WriteBatch) {
        self.writes.extend(other.writes);
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn into_writes(self) -> Vec<(Collection, Document)> {
        self.writes
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Collection, Document)> {
        self.writes.iter()
    }
}

/// Persistent keyed document storage.
///
/// Implementations include `MemoryStore` and `SqliteStore` in `neoetl-storage`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Apply every upsert in `batch`, all or nothing.
    async fn apply(&self, batch: WriteBatch) -> Result<(), StoreError>;

    async fn find_one(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, StoreError>;

    async fn count(&self, collection: Collection) -> Result<u64, StoreError>;

    /// All documents whose id starts with `prefix`, ordered by id.
    async fn scan_prefix(
        &self,
        collection: Collection,
        prefix: &str,
    ) -> Result<Vec<Document>, StoreError>;

    /// Upsert `docs` into one collection atomically.
    async fn upsert_many(
        &self,
        collection: Collection,
        docs: Vec<Document>,
    ) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        for doc in docs {
            batch.put(collection, doc);
        }
        self.apply(batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names() {
        let names: Vec<_> = Collection::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(
            names,
            [
                "blocks",
                "transactions",
                "fees",
                "freezes",
                "offer_hash",
                "addresses",
                "addresses_date",
                "address_transactions",
                "address_activity",
                "address_merges"
            ]
        );
    }

    #[test]
    fn document_round_trip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Row {
            n: u64,
        }
        let doc = Document::from_value(Collection::Fees, "a", &Row { n: 7 }).unwrap();
        assert_eq!(doc.body["n"], 7);
        assert_eq!(doc.parse::<Row>(Collection::Fees).unwrap(), Row { n: 7 });
        assert!(doc.parse::<String>(Collection::Fees).is_err());
    }
}
