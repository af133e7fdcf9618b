//! The evidence file vault -- blob storage for uploaded evidence.
//!
//! The vault addresses files by paths relative to its root, so the database
//! stays portable across machines. Deletion is best-effort from the caller's
//! perspective: the engine commits the logical state first and treats a
//! failed delete as a reported cleanup failure, not a rollback.

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::StoreError;

// ---------------------------------------------------------------------------
// EvidenceVault
// ---------------------------------------------------------------------------

/// One stored evidence file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Vault-relative path of the stored file.
    pub path: String,
    /// Size in bytes.
    pub size_bytes: u64,
}

/// Blob storage for evidence files, addressable by relative path.
pub trait EvidenceVault {
    /// Stores `bytes` as `dir/file_name`, overwriting any existing file at
    /// that path, and returns the stored path and size.
    fn store(&self, dir: &str, file_name: &str, bytes: &[u8]) -> Result<StoredFile, StoreError>;

    /// Deletes the file at the given vault-relative path.
    fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// Whether a file exists at the given vault-relative path.
    fn contains(&self, path: &str) -> bool;
}

// ---------------------------------------------------------------------------
// LocalEvidenceVault
// ---------------------------------------------------------------------------

/// Filesystem-backed vault rooted at a single directory.
pub struct LocalEvidenceVault {
    root: PathBuf,
}

impl LocalEvidenceVault {
    /// Creates a vault rooted at `root`, creating the directory if needed.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(root)
            .map_err(|e| StoreError::Io(format!("creating vault root '{}': {e}", root.display())))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Resolves a vault-relative path, rejecting anything that could escape
    /// the root (absolute paths, `..` components).
    fn resolve(&self, relative: &str) -> Result<PathBuf, StoreError> {
        let rel = Path::new(relative);
        if rel.components().any(|c| {
            !matches!(c, Component::Normal(part) if !part.is_empty())
        }) {
            return Err(StoreError::InvalidPath(relative.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

impl EvidenceVault for LocalEvidenceVault {
    fn store(&self, dir: &str, file_name: &str, bytes: &[u8]) -> Result<StoredFile, StoreError> {
        let relative = format!("{dir}/{file_name}");
        let target = self.resolve(&relative)?;

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("creating '{}': {e}", parent.display())))?;
        }
        std::fs::write(&target, bytes)
            .map_err(|e| StoreError::Io(format!("writing '{}': {e}", target.display())))?;

        debug!(path = %relative, size = bytes.len(), "evidence file stored");
        Ok(StoredFile {
            path: relative,
            size_bytes: bytes.len() as u64,
        })
    }

    fn delete(&self, path: &str) -> Result<(), StoreError> {
        let target = self.resolve(path)?;
        std::fs::remove_file(&target)
            .map_err(|e| StoreError::Io(format!("deleting '{}': {e}", target.display())))?;
        debug!(path = %path, "evidence file deleted");
        Ok(())
    }

    fn contains(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.is_file()).unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
