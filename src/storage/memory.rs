use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StorageError;
use crate::storage::traits::{next_version, Collection, PersistenceAdapter, StoredRecord};

type Table = Vec<(String, StoredRecord)>;

/// In-process adapter, the stand-in for browser local storage.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    tables: RwLock<HashMap<Collection, Table>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryAdapter {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<StoredRecord>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&collection)
            .and_then(|table| table.iter().find(|(key, _)| key == id))
            .map(|(_, record)| record.clone()))
    }

    async fn list(&self, collection: Collection) -> Result<Vec<StoredRecord>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&collection)
            .map(|table| table.iter().map(|(_, record)| record.clone()).collect())
            .unwrap_or_default())
    }

    async fn put(
        &self,
        collection: Collection,
        id: &str,
        body: Value,
        expected_version: Option<u64>,
    ) -> Result<u64, StorageError> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(collection).or_default();
        let slot = table.iter().position(|(key, _)| key == id);
        let current = slot.map(|i| table[i].1.version);
        let version = next_version(collection, id, current, expected_version)?;

        let record = StoredRecord { version, body };
        match slot {
            Some(i) => table[i].1 = record,
            None => table.push((id.to_string(), record)),
        }
        debug!("{} {} stored at version {}", collection, id, version);
        Ok(version)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        if let Some(table) = tables.get_mut(&collection) {
            table.retain(|(key, _)| key != id);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.tables.write().await.clear();
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
