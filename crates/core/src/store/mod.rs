//! Storage errors, fault injection and the SQLite backend shared by the
//! story and asset stores.

mod faults;
mod sqlite;

pub use faults::FaultInjector;
pub use sqlite::SqliteStore;

use thiserror::Error;

/// Error type for story and asset store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The referenced story or asset record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A simulated storage hiccup. The operation did not happen.
    #[error("transient fault during {0}")]
    TransientFault(String),

    /// Backend failure.
    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Whether this error means the entity is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// Whether this error is a transient fault.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::TransientFault(_))
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        StoreError::Database(format!("lock poisoned: {}", e))
    }
}
