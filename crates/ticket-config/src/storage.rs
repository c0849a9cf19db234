//! Derives the on-disk layout shared by the catalog and the attachment store.
//!
//! The data directory holds one flat snapshot per collection; attachments
//! live in their own tree, one sub-directory per event identifier.

use std::fs::DirBuilder;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

const ACCOUNTS_FILE: &str = "users.txt";
const EVENTS_FILE: &str = "events.txt";
const RESERVATIONS_FILE: &str = "reservations.txt";

/// Canonical paths for persisted server state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    data_dir: Utf8PathBuf,
    attachment_dir: Utf8PathBuf,
}

impl StoragePaths {
    /// Builds the layout rooted at the given directories.
    #[must_use]
    pub fn new(data_dir: impl Into<Utf8PathBuf>, attachment_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            attachment_dir: attachment_dir.into(),
        }
    }

    /// Directory holding the snapshot files.
    #[must_use]
    pub fn data_dir(&self) -> &Utf8Path {
        &self.data_dir
    }

    /// Directory holding event attachments.
    #[must_use]
    pub fn attachment_dir(&self) -> &Utf8Path {
        &self.attachment_dir
    }

    /// Snapshot of registered accounts.
    #[must_use]
    pub fn accounts_path(&self) -> Utf8PathBuf {
        self.data_dir.join(ACCOUNTS_FILE)
    }

    /// Snapshot of created events.
    #[must_use]
    pub fn events_path(&self) -> Utf8PathBuf {
        self.data_dir.join(EVENTS_FILE)
    }

    /// Snapshot of accepted reservations.
    #[must_use]
    pub fn reservations_path(&self) -> Utf8PathBuf {
        self.data_dir.join(RESERVATIONS_FILE)
    }

    /// Ensures both directories exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoragePreparationError::CreateDirectory`] when a directory
    /// cannot be created.
    pub fn prepare_filesystem(&self) -> Result<(), StoragePreparationError> {
        create_directory(&self.data_dir)?;
        create_directory(&self.attachment_dir)
    }
}

fn create_directory(path: &Utf8Path) -> Result<(), StoragePreparationError> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }

    if let Err(source) = builder.create(path.as_std_path())
        && source.kind() != io::ErrorKind::AlreadyExists
    {
        return Err(StoragePreparationError::CreateDirectory {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

/// Errors raised when preparing storage directories.
#[derive(Debug, Error)]
pub enum StoragePreparationError {
    /// Failed to create a storage directory.
    #[error("failed to create storage directory '{path}': {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
