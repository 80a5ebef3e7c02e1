pub mod json_file;
pub mod memory;
pub mod repository;
pub mod session;
pub mod traits;

pub use json_file::JsonFileAdapter;
pub use memory::MemoryAdapter;
pub use repository::{Record, Repository};
pub use session::{Credential, Session, SessionStore, SESSION_KEY};
pub use traits::{Collection, PersistenceAdapter, StoredRecord};
