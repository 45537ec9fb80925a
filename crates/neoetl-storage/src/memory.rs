//! In-memory document store.
//!
//! All data is lost when the process exits. Used by tests and dry runs.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use neoetl_core::store::{Collection, Document, DocumentStore, StoreError, WriteBatch};

#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<Collection, BTreeMap<String, serde_json::Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every document in `collection`, ordered by id.
    pub fn dump(&self, collection: Collection) -> Vec<Document> {
        self.collections
            .lock()
            .unwrap()
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, body)| Document::new(id.clone(), body.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().unwrap();
        for (collection, doc) in batch.into_writes() {
            collections
                .entry(collection)
                .or_default()
                .insert(doc.id, doc.body);
        }
        Ok(())
    }

    async fn find_one(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .collections
            .lock()
            .unwrap()
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .map(|body| Document::new(id, body.clone())))
    }

    async fn count(&self, collection: Collection) -> Result<u64, StoreError> {
        Ok(self
            .collections
            .lock()
            .unwrap()
            .get(&collection)
            .map_or(0, |docs| docs.len() as u64))
    }

    async fn scan_prefix(
        &self,
        collection: Collection,
        prefix: &str,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.lock().unwrap();
        let Some(docs) = collections.get(&collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .range(prefix.to_string()..)
            .take_while(|(id, _)| id.starts_with(prefix))
            .map(|(id, body)| Document::new(id.clone(), body.clone()))
            .collect())
    }
}
