//! On-disk attachment storage, one directory per event.

use std::fs::{self, File};
use std::io::{Read, Write};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::NamedTempFile;

use ticket_wire::PayloadFrame;

use super::errors::AttachmentError;
use super::model::EventId;

/// Attachment files rooted at one directory, stored as `<root>/<eid>/<name>`.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: Utf8PathBuf,
}

/// An uploaded payload that has not yet been assigned to an event.
#[derive(Debug)]
pub struct StagedAttachment {
    file: NamedTempFile,
    size: u64,
}

impl StagedAttachment {
    /// Bytes received.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }
}

impl AttachmentStore {
    /// Store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Where the attachment of `event` named `file_name` lives.
    #[must_use]
    pub fn path_for(&self, event: EventId, file_name: &str) -> Utf8PathBuf {
        self.root.join(event.to_string()).join(file_name)
    }

    /// Receives exactly `frame.len()` bytes from `reader` into a staging file.
    ///
    /// # Errors
    ///
    /// Returns [`AttachmentError::Transfer`] when the payload is cut short and
    /// [`AttachmentError::Stage`] or [`AttachmentError::CreateDirectory`] when
    /// the staging file cannot be prepared.
    pub fn stage<R: Read>(
        &self,
        frame: PayloadFrame,
        reader: &mut R,
    ) -> Result<StagedAttachment, AttachmentError> {
        create_directory(&self.root)?;
        let mut file =
            NamedTempFile::new_in(&self.root).map_err(|source| AttachmentError::Stage { source })?;
        let size = frame
            .copy(reader, file.as_file_mut())
            .map_err(|source| AttachmentError::Transfer { source })?;
        file.as_file_mut()
            .flush()
            .map_err(|source| AttachmentError::Stage { source })?;
        Ok(StagedAttachment { file, size })
    }

    /// Moves a staged payload into place for `event`.
    ///
    /// # Errors
    ///
    /// Returns [`AttachmentError::CreateDirectory`] or
    /// [`AttachmentError::Persist`] when the file cannot be placed.
    pub fn commit(
        &self,
        staged: StagedAttachment,
        event: EventId,
        file_name: &str,
    ) -> Result<Utf8PathBuf, AttachmentError> {
        let path = self.path_for(event, file_name);
        if let Some(directory) = path.parent() {
            create_directory(directory)?;
        }
        staged
            .file
            .persist(&path)
            .map_err(|error| AttachmentError::Persist {
                path: path.clone(),
                source: error.error,
            })?;
        Ok(path)
    }

    /// Opens the attachment of `event`, checking its size against the record.
    ///
    /// # Errors
    ///
    /// Returns [`AttachmentError::Open`] when the file is missing or
    /// unreadable and [`AttachmentError::SizeMismatch`] when its length
    /// differs from `expected_len`.
    pub fn open(
        &self,
        event: EventId,
        file_name: &str,
        expected_len: u64,
    ) -> Result<File, AttachmentError> {
        let path = self.path_for(event, file_name);
        let open_error = |source| AttachmentError::Open {
            path: path.clone(),
            source,
        };
        let file = File::open(&path).map_err(open_error)?;
        let actual = file.metadata().map_err(open_error)?.len();
        if actual != expected_len {
            return Err(AttachmentError::SizeMismatch {
                path,
                expected: expected_len,
                actual,
            });
        }
        Ok(file)
    }
}

fn create_directory(path: &Utf8Path) -> Result<(), AttachmentError> {
    fs::create_dir_all(path).map_err(|source| AttachmentError::CreateDirectory {
        path: path.to_path_buf(),
        source,
    })
}
