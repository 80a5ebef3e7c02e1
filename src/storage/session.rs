use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StorageError;
use crate::models::{ProfileId, UserType};
use crate::storage::repository::{Record, Repository};
use crate::storage::traits::Collection;

/// Fixed key of the persisted session blob.
pub const SESSION_KEY: &str = "rental-match.session";

/// The logged-in user and role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub profile_id: ProfileId,
    pub user_type: UserType,
    pub started_at: DateTime<Utc>,
    #[serde(skip)]
    pub version: u64,
}

impl Record for Session {
    const COLLECTION: Collection = Collection::Session;

    fn key(&self) -> String {
        SESSION_KEY.to_string()
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

/// Login secret for one email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Normalized email, also the record key.
    pub email: String,
    pub profile_id: ProfileId,
    pub password_hash: String,
    #[serde(skip)]
    pub version: u64,
}

impl Record for Credential {
    const COLLECTION: Collection = Collection::Credentials;

    fn key(&self) -> String {
        self.email.clone()
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

/// Reads and writes the single session blob.
pub struct SessionStore<'a> {
    repo: Repository<'a>,
}

impl<'a> SessionStore<'a> {
    pub fn new(repo: Repository<'a>) -> Self {
        Self { repo }
    }

    /// `None` means logged out.
    pub async fn load(&self) -> Result<Option<Session>, StorageError> {
        self.repo.load(SESSION_KEY).await
    }

    /// Replaces whatever session was stored before.
    pub async fn save(&self, session: &Session) -> Result<Session, StorageError> {
        let mut session = session.clone();
        session.version = self.load().await?.map_or(0, |stored| stored.version);
        self.repo.save(&mut session).await?;
        debug!("Persisted session for {}", session.profile_id);
        Ok(session)
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        self.repo.remove::<Session>(SESSION_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryAdapter;

    #[tokio::test]
    async fn absent_blob_means_logged_out() {
        let adapter = MemoryAdapter::new();
        let sessions = SessionStore::new(Repository::new(&adapter));
        assert!(sessions.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn saving_twice_replaces_the_blob() {
        let adapter = MemoryAdapter::new();
        let sessions = SessionStore::new(Repository::new(&adapter));
        let first = Session {
            profile_id: ProfileId::new(),
            user_type: UserType::Renter,
            started_at: Utc::now(),
            version: 0,
        };
        sessions.save(&first).await.unwrap();

        let second = Session {
            profile_id: ProfileId::new(),
            user_type: UserType::Agency,
            ..first.clone()
        };
        sessions.save(&second).await.unwrap();

        let restored = sessions.load().await.unwrap().unwrap();
        assert_eq!(restored.profile_id, second.profile_id);
        assert_eq!(restored.user_type, UserType::Agency);

        sessions.clear().await.unwrap();
        assert!(sessions.load().await.unwrap().is_none());
    }
}
