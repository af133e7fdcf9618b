//! Signet Store -- SQLite persistence and the evidence file vault.
//!
//! Entities are stored as JSON documents in per-kind tables, keyed by id;
//! the activity trail lives in an append-only table keyed by sequence.
//! Version and form-sequence allocation is computed as `max(existing) + 1`
//! inside the owning connection, never from a shared counter.

pub mod store;
pub mod vault;

pub use store::SignetStore;
pub use vault::{EvidenceVault, LocalEvidenceVault, StoredFile};

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Error type for persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// The database file is corrupt.
    #[error("database corrupt: {0}")]
    Corrupt(String),

    /// A stored JSON document could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A vault file operation failed.
    #[error("vault I/O error: {0}")]
    Io(String),

    /// A vault path escapes the vault root or is otherwise malformed.
    #[error("invalid vault path: {0}")]
    InvalidPath(String),
}

impl StoreError {
    /// Wraps a rusqlite error, surfacing corruption as its own variant.
    pub(crate) fn from_sqlite(err: &rusqlite::Error, context: &str) -> Self {
        let msg = err.to_string();
        if msg.contains("corrupt") || msg.contains("CORRUPT") {
            Self::Corrupt(msg)
        } else {
            Self::Database(format!("{context}: {msg}"))
        }
    }
}
