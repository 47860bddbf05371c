//! Persistence for users, the follow graph and tweet content.
//!
//! Every content read that depends on who is asking takes the viewer id and
//! applies the follow-edge condition inside the query itself, so the result
//! set is already the authorization decision.

mod in_memory;
mod sqlite;
mod traits;

pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::Store;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("username already exists")]
    UsernameTaken,

    #[error("{0} does not exist")]
    MissingReference(String),

    #[error("Failed to run migrations: {0}")]
    Migration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage task failed: {0}")]
    TaskFailed(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
