use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StorageError;

/// Named collections the application persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Properties,
    Profiles,
    Credentials,
    Matches,
    Issues,
    Conversations,
    Ratings,
    Session,
}

impl Collection {
    pub const ALL: [Collection; 8] = [
        Collection::Properties,
        Collection::Profiles,
        Collection::Credentials,
        Collection::Matches,
        Collection::Issues,
        Collection::Conversations,
        Collection::Ratings,
        Collection::Session,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Properties => "properties",
            Collection::Profiles => "profiles",
            Collection::Credentials => "credentials",
            Collection::Matches => "matches",
            Collection::Issues => "issues",
            Collection::Conversations => "conversations",
            Collection::Ratings => "ratings",
            Collection::Session => "session",
        }
    }

    /// Singular name used in error messages.
    pub fn resource_name(self) -> &'static str {
        match self {
            Collection::Properties => "Property",
            Collection::Profiles => "Profile",
            Collection::Credentials => "Account",
            Collection::Matches => "Match",
            Collection::Issues => "Issue",
            Collection::Conversations => "Conversation",
            Collection::Ratings => "Rating",
            Collection::Session => "Session",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A JSON body plus the version it was stored at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub version: u64,
    pub body: Value,
}

/// Key-value persistence over named collections.
///
/// Every record carries a version starting at 1. `put` with
/// `expected_version = None` creates and fails if the id already exists;
/// `Some(v)` updates and fails unless the stored version is `v`.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<StoredRecord>, StorageError>;

    /// All records in insertion order.
    async fn list(&self, collection: Collection) -> Result<Vec<StoredRecord>, StorageError>;

    /// Writes `body` and returns its new version.
    async fn put(
        &self,
        collection: Collection,
        id: &str,
        body: Value,
        expected_version: Option<u64>,
    ) -> Result<u64, StorageError>;

    /// Removing a missing id is not an error.
    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StorageError>;

    /// Drops every collection.
    async fn clear(&self) -> Result<(), StorageError>;

    /// Name of the backing store, for logs
    fn backend_name(&self) -> &'static str;
}

/// Lets a caller keep its own handle on an adapter it hands to a store.
#[async_trait]
impl<T: PersistenceAdapter + ?Sized> PersistenceAdapter for Arc<T> {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<StoredRecord>, StorageError> {
        (**self).get(collection, id).await
    }

    async fn list(&self, collection: Collection) -> Result<Vec<StoredRecord>, StorageError> {
        (**self).list(collection).await
    }

    async fn put(
        &self,
        collection: Collection,
        id: &str,
        body: Value,
        expected_version: Option<u64>,
    ) -> Result<u64, StorageError> {
        (**self).put(collection, id, body, expected_version).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StorageError> {
        (**self).delete(collection, id).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        (**self).clear().await
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
}

/// Shared check for `put` implementations.
pub(crate) fn next_version(
    collection: Collection,
    id: &str,
    current: Option<u64>,
    expected: Option<u64>,
) -> Result<u64, StorageError> {
    match (current, expected) {
        (None, None) => Ok(1),
        (Some(found), Some(expected)) if found == expected => Ok(found + 1),
        (found, expected) => Err(StorageError::VersionMismatch {
            collection,
            id: id.to_string(),
            expected,
            found,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryAdapter;
    use serde_json::json;

    #[tokio::test]
    async fn shared_handle_sees_the_same_records() {
        let adapter = Arc::new(MemoryAdapter::new());
        let shared: Arc<dyn PersistenceAdapter> = adapter.clone();

        let version = shared
            .put(Collection::Ratings, "r1", json!({ "overallScore": 4 }), None)
            .await
            .unwrap();
        assert_eq!(version, 1);
        let stored = adapter.get(Collection::Ratings, "r1").await.unwrap().unwrap();
        assert_eq!(stored.body["overallScore"], 4);
        assert_eq!(shared.backend_name(), adapter.backend_name());
    }

    #[test]
    fn stale_expected_version_is_a_mismatch() {
        assert_eq!(next_version(Collection::Matches, "m1", Some(2), Some(2)).unwrap(), 3);
        assert!(matches!(
            next_version(Collection::Matches, "m1", Some(3), Some(2)),
            Err(StorageError::VersionMismatch { found: Some(3), .. })
        ));
        assert!(next_version(Collection::Matches, "m1", Some(1), None).is_err());
    }
}
