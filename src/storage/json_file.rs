use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::storage::traits::{next_version, Collection, PersistenceAdapter, StoredRecord};

#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    id: String,
    version: u64,
    body: Value,
}

/// One pretty-printed JSON file per collection under `root`.
#[derive(Debug)]
pub struct JsonFileAdapter {
    root: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonFileAdapter {
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        info!("Using JSON store at {}", root.display());
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, collection: Collection) -> PathBuf {
        self.root.join(format!("{}.json", collection.as_str()))
    }

    async fn read_table(&self, collection: Collection) -> Result<Vec<Entry>, StorageError> {
        match tokio::fs::read(self.path_for(collection)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(StorageError::Unavailable(format!(
                "cannot read {}: {}",
                collection, err
            ))),
        }
    }

    async fn write_table(&self, collection: Collection, entries: &[Entry]) -> Result<(), StorageError> {
        let path = self.path_for(collection);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!("Wrote {} entries to {}", entries.len(), path.display());
        Ok(())
    }
}

#[async_trait]
impl PersistenceAdapter for JsonFileAdapter {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<StoredRecord>, StorageError> {
        let entries = self.read_table(collection).await?;
        Ok(entries
            .into_iter()
            .find(|entry| entry.id == id)
            .map(|entry| StoredRecord {
                version: entry.version,
                body: entry.body,
            }))
    }

    async fn list(&self, collection: Collection) -> Result<Vec<StoredRecord>, StorageError> {
        let entries = self.read_table(collection).await?;
        Ok(entries
            .into_iter()
            .map(|entry| StoredRecord {
                version: entry.version,
                body: entry.body,
            })
            .collect())
    }

    async fn put(
        &self,
        collection: Collection,
        id: &str,
        body: Value,
        expected_version: Option<u64>,
    ) -> Result<u64, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_table(collection).await?;
        let slot = entries.iter().position(|entry| entry.id == id);
        let current = slot.map(|i| entries[i].version);
        let version = next_version(collection, id, current, expected_version)?;

        let entry = Entry {
            id: id.to_string(),
            version,
            body,
        };
        match slot {
            Some(i) => entries[i] = entry,
            None => entries.push(entry),
        }

        self.write_table(collection, &entries)
            .await
            .map_err(|err| StorageError::WriteFailed {
                collection,
                id: id.to_string(),
                reason: err.to_string(),
            })?;
        Ok(version)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_table(collection).await?;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        if entries.len() != before {
            self.write_table(collection, &entries).await?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        for collection in Collection::ALL {
            match tokio::fs::remove_file(self.path_for(collection)).await {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "json-file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn records_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        {
            let adapter = JsonFileAdapter::open(dir.path()).await.unwrap();
            adapter
                .put(Collection::Profiles, "p1", json!({"name": "Sam"}), None)
                .await
                .unwrap();
        }

        let adapter = JsonFileAdapter::open(dir.path()).await.unwrap();
        let record = adapter.get(Collection::Profiles, "p1").await.unwrap().unwrap();
        assert_eq!(record.version, 1);
        assert_eq!(record.body["name"], "Sam");
    }

    #[tokio::test]
    async fn clear_removes_every_collection() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = JsonFileAdapter::open(dir.path()).await.unwrap();
        adapter
            .put(Collection::Ratings, "r1", json!({}), None)
            .await
            .unwrap();
        adapter.clear().await.unwrap();
        assert!(adapter.list(Collection::Ratings).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stale_version_is_rejected_on_disk_too() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = JsonFileAdapter::open(dir.path()).await.unwrap();
        adapter
            .put(Collection::Issues, "i1", json!({"status": "open"}), None)
            .await
            .unwrap();
        adapter
            .put(Collection::Issues, "i1", json!({"status": "acknowledged"}), Some(1))
            .await
            .unwrap();
        let stale = adapter
            .put(Collection::Issues, "i1", json!({"status": "resolved"}), Some(1))
            .await;
        assert!(matches!(stale, Err(StorageError::VersionMismatch { .. })));
    }
}
