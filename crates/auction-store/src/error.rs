//! Error types for the coordination store.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key already exists: {0}")]
    KeyExists(String),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The stored value no longer matches the expected one.
    #[error("compare-and-swap failed for {0}: value changed")]
    ValueMismatch(String),

    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),
}

impl StoreError {
    /// True for the failures that mean another writer got there first.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::KeyExists(_) | StoreError::KeyNotFound(_) | StoreError::ValueMismatch(_)
        )
    }
}
