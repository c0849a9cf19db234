//! Error types for snapshot persistence and attachment storage.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

use ticket_wire::FrameError;

/// Errors raised while reading or writing one snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot exists but could not be read.
    #[error("failed to read snapshot {path}: {source}")]
    Read {
        /// Snapshot path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The snapshot could not be rewritten.
    #[error("failed to write snapshot {path}: {source}")]
    Write {
        /// Snapshot path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Errors raised by catalog load and save operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Reloading a collection failed.
    #[error("failed to load {collection}: {source}")]
    Load {
        /// Collection name.
        collection: &'static str,
        /// Snapshot failure.
        #[source]
        source: SnapshotError,
    },
    /// Saving a collection failed.
    #[error("failed to save {collection}: {source}")]
    Save {
        /// Collection name.
        collection: &'static str,
        /// Snapshot failure.
        #[source]
        source: SnapshotError,
    },
}

/// Errors raised while storing or opening attachments.
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// The attachment directory could not be created.
    #[error("failed to create attachment directory {path}: {source}")]
    CreateDirectory {
        /// Directory path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The staging file could not be created or flushed.
    #[error("failed to stage attachment: {source}")]
    Stage {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The payload did not arrive in full.
    #[error("attachment transfer failed: {source}")]
    Transfer {
        /// Framing failure.
        #[source]
        source: FrameError,
    },
    /// The staged file could not be moved into place.
    #[error("failed to store attachment at {path}: {source}")]
    Persist {
        /// Destination path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The stored attachment could not be opened.
    #[error("failed to open attachment {path}: {source}")]
    Open {
        /// Attachment path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The stored attachment does not have the recorded size.
    #[error("attachment {path} holds {actual} bytes, expected {expected}")]
    SizeMismatch {
        /// Attachment path.
        path: Utf8PathBuf,
        /// Recorded size.
        expected: u64,
        /// Size on disk.
        actual: u64,
    },
}
