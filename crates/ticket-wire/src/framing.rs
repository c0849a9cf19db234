//! Length-framed payload transfer.
//!
//! A frame is a declared byte count followed by exactly that many raw bytes
//! and a single newline terminator. The header carrying the count is encoded
//! by the caller; this module moves the bytes, looping over partial reads and
//! writes until the declared length is transferred.

use std::io::{self, Read, Write};

use crate::errors::FrameError;

const CHUNK_BYTES: usize = 8 * 1024;
const TERMINATOR: u8 = b'\n';

/// A payload of a declared length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadFrame {
    len: u64,
}

impl PayloadFrame {
    /// Describes a payload of `len` bytes.
    #[must_use]
    pub const fn new(len: u64) -> Self {
        Self { len }
    }

    /// Declared payload length in bytes.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Returns true for zero-length payloads.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads the whole payload into memory.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Truncated`] when the source ends early and
    /// [`FrameError::Io`] when a read fails.
    pub fn read_from<R: Read>(&self, reader: &mut R) -> Result<Vec<u8>, FrameError> {
        let mut payload = Vec::new();
        self.copy(reader, &mut payload)?;
        Ok(payload)
    }

    /// Copies exactly the declared number of bytes from `reader` to `writer`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Truncated`] when the source ends early and
    /// [`FrameError::Io`] when a read or write fails.
    pub fn copy<R: Read, W: Write>(&self, reader: &mut R, writer: &mut W) -> Result<u64, FrameError> {
        let mut buffer = [0_u8; CHUNK_BYTES];
        let mut transferred = 0_u64;
        while transferred < self.len {
            let remaining = self.len - transferred;
            let want = usize::try_from(remaining).map_or(CHUNK_BYTES, |left| left.min(CHUNK_BYTES));
            let Some(chunk) = buffer.get_mut(..want) else {
                break;
            };
            let read = read_with_retry(reader, chunk)?;
            if read == 0 {
                return Err(FrameError::Truncated {
                    expected: self.len,
                    transferred,
                });
            }
            if let Some(filled) = chunk.get(..read) {
                writer.write_all(filled)?;
            }
            transferred += read as u64;
        }
        Ok(transferred)
    }

    /// Writes `header`, then the payload read from `source`, then the terminator.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Truncated`] when `source` holds fewer bytes than
    /// declared and [`FrameError::Io`] when writing fails.
    pub fn write_to<W: Write, R: Read>(
        &self,
        writer: &mut W,
        header: &str,
        source: &mut R,
    ) -> Result<(), FrameError> {
        writer.write_all(header.as_bytes())?;
        self.copy(source, writer)?;
        writer.write_all(&[TERMINATOR])?;
        writer.flush()?;
        Ok(())
    }

    /// Consumes the single terminator that follows a payload.
    ///
    /// Returns `true` when a newline was read, `false` at end of stream or
    /// when some other byte followed the payload.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Io`] when the read fails.
    pub fn read_terminator<R: Read>(reader: &mut R) -> Result<bool, FrameError> {
        let mut byte = [0_u8; 1];
        let read = read_with_retry(reader, &mut byte)?;
        Ok(read == 1 && byte == [TERMINATOR])
    }
}

fn read_with_retry<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
}
