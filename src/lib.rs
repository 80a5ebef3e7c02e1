//! Core of a rental matching platform: renters swipe on listings, landlords
//! and agencies manage them, and matched tenancies carry messages, issues
//! and ratings. Storage sits behind [`storage::PersistenceAdapter`].

pub mod clock;
pub mod config;
pub mod error;
pub mod issues;
pub mod matching;
pub mod messaging;
pub mod models;
pub mod ratings;
pub mod storage;
pub mod store;
pub mod telemetry;
pub mod validation;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use error::{AppError, AppResult, AuthError, ConfigError, StorageError};
pub use matching::{LikeOutcome, MatchPolicy};
pub use store::{AppState, Store};
