use thiserror::Error;

use crate::storage::Collection;

pub type AppResult<T> = Result<T, AppError>;

/// Errors surfaced by store actions.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation errors, {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("{0}")]
    Conflict(String),
    #[error("{resource} with ID {id} was not found")]
    NotFound { resource: &'static str, id: String },
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Persistence error: {0}")]
    Persistence(StorageError),
    #[error("Credential hashing error: {0}")]
    Credentials(#[from] bcrypt::BcryptError),
    #[error("A {0} submission is already in progress")]
    InFlight(String),
}

impl AppError {
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn not_found(collection: Collection, id: impl ToString) -> Self {
        Self::NotFound {
            resource: collection.resource_name(),
            id: id.to_string(),
        }
    }

    /// Field-attributed errors, when this is a validation failure.
    pub fn field_errors(&self) -> Option<&validator::ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::VersionMismatch {
                collection,
                id,
                expected,
                found,
            } => Self::Conflict(format!(
                "{} {id} was modified concurrently (expected version {expected:?}, found {found:?})",
                collection.resource_name()
            )),
            other => Self::Persistence(other),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("No account exists for that email")]
    NotFound,
    #[error("You're not logged in")]
    NotAuthenticated,
    #[error("This account has been deactivated")]
    Deactivated,
    #[error("You're not allowed to do that")]
    Forbidden,
}

/// Failures reported by a persistence adapter.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Store is unavailable: {0}")]
    Unavailable(String),
    #[error("Failed to write {collection} record {id}: {reason}")]
    WriteFailed {
        collection: Collection,
        id: String,
        reason: String,
    },
    #[error("Version mismatch on {collection} record {id}")]
    VersionMismatch {
        collection: Collection,
        id: String,
        expected: Option<u64>,
        found: Option<u64>,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}
