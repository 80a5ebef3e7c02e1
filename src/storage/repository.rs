use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{AppError, StorageError};
use crate::models::{Conversation, Issue, Match, Profile, Property, Rating};
use crate::storage::traits::{Collection, PersistenceAdapter, StoredRecord};

/// A typed record living in one collection.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;

    fn key(&self) -> String;

    /// Version last read from or written to the adapter; 0 if never stored.
    fn version(&self) -> u64;

    fn set_version(&mut self, version: u64);
}

macro_rules! record {
    ($($ty:ty => $collection:expr),* $(,)?) => {$(
        impl Record for $ty {
            const COLLECTION: Collection = $collection;

            fn key(&self) -> String {
                self.id.to_string()
            }

            fn version(&self) -> u64 {
                self.version
            }

            fn set_version(&mut self, version: u64) {
                self.version = version;
            }
        }
    )*};
}

record!(
    Property => Collection::Properties,
    Match => Collection::Matches,
    Issue => Collection::Issues,
    Conversation => Collection::Conversations,
    Rating => Collection::Ratings,
);

impl Record for Profile {
    const COLLECTION: Collection = Collection::Profiles;

    fn key(&self) -> String {
        self.id().to_string()
    }

    fn version(&self) -> u64 {
        self.identity().version
    }

    fn set_version(&mut self, version: u64) {
        self.identity_mut().version = version;
    }
}

/// Typed access to a `PersistenceAdapter`.
#[derive(Clone, Copy)]
pub struct Repository<'a> {
    adapter: &'a dyn PersistenceAdapter,
}

impl<'a> Repository<'a> {
    pub fn new(adapter: &'a dyn PersistenceAdapter) -> Self {
        Self { adapter }
    }

    pub async fn load<T: Record>(&self, key: impl ToString) -> Result<Option<T>, StorageError> {
        let key = key.to_string();
        match self.adapter.get(T::COLLECTION, &key).await? {
            Some(stored) => Ok(Some(decode(stored)?)),
            None => Ok(None),
        }
    }

    /// Like `load`, but a missing record is a `NotFound` error.
    pub async fn require<T: Record>(&self, key: impl ToString) -> Result<T, AppError> {
        let key = key.to_string();
        self.load(&key)
            .await?
            .ok_or_else(|| AppError::not_found(T::COLLECTION, key))
    }

    pub async fn list<T: Record>(&self) -> Result<Vec<T>, StorageError> {
        self.adapter
            .list(T::COLLECTION)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn list_where<T, P>(&self, predicate: P) -> Result<Vec<T>, StorageError>
    where
        T: Record,
        P: Fn(&T) -> bool,
    {
        let mut records = self.list::<T>().await?;
        records.retain(|record| predicate(record));
        Ok(records)
    }

    /// Writes `record` guarded by its current version, then adopts the new one.
    pub async fn save<T: Record>(&self, record: &mut T) -> Result<(), StorageError> {
        let body = serde_json::to_value(&*record)?;
        let expected = match record.version() {
            0 => None,
            v => Some(v),
        };
        let key = record.key();
        let version = self.adapter.put(T::COLLECTION, &key, body, expected).await?;
        debug!("Saved {} {} (v{})", T::COLLECTION, key, version);
        record.set_version(version);
        Ok(())
    }

    pub async fn remove<T: Record>(&self, key: impl ToString) -> Result<(), StorageError> {
        self.adapter.delete(T::COLLECTION, &key.to_string()).await
    }
}

fn decode<T: Record>(stored: StoredRecord) -> Result<T, StorageError> {
    let mut record: T = serde_json::from_value(stored.body)?;
    record.set_version(stored.version);
    Ok(record)
}
