//! Whitespace-delimited token reading for the stream channel.
//!
//! The stream header is not newline-terminated before an attachment payload,
//! so the reader must never consume more than one delimiter after a token:
//! whatever follows belongs to the payload. Newlines are ordinary
//! whitespace, so a header may span several lines.

use std::io::{self, Read};

use crate::errors::TokenError;

/// Upper bound on a single token unless configured otherwise.
pub const DEFAULT_TOKEN_LIMIT: usize = 1024;

/// Reads whitespace-separated tokens from any byte source.
///
/// Wrap unbuffered sockets in [`std::io::BufReader`] before handing them to the
/// reader; payload bytes must then be read from [`TokenReader::get_mut`] so
/// nothing buffered is lost.
#[derive(Debug)]
pub struct TokenReader<R> {
    inner: R,
    limit: usize,
}

impl<R: Read> TokenReader<R> {
    /// Builds a reader with [`DEFAULT_TOKEN_LIMIT`].
    #[must_use]
    pub const fn new(inner: R) -> Self {
        Self::with_limit(inner, DEFAULT_TOKEN_LIMIT)
    }

    /// Builds a reader that rejects tokens longer than `limit` bytes.
    #[must_use]
    pub const fn with_limit(inner: R, limit: usize) -> Self {
        Self { inner, limit }
    }

    /// Reads the next token.
    ///
    /// Leading whitespace of any kind and length is skipped. The token ends at
    /// the next whitespace byte, which is consumed, or at end of stream.
    /// Returns `Ok(None)` when the stream ends before a token starts.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::TooLong`] when the token exceeds the limit,
    /// [`TokenError::InvalidUtf8`] for non UTF-8 bytes and
    /// [`TokenError::Io`] when the underlying read fails.
    pub fn next_token(&mut self) -> Result<Option<String>, TokenError> {
        let mut token = Vec::new();
        loop {
            let Some(byte) = self.read_byte()? else {
                return Ok(None);
            };
            if !byte.is_ascii_whitespace() {
                token.push(byte);
                break;
            }
        }

        while let Some(byte) = self.read_byte()? {
            if byte.is_ascii_whitespace() {
                break;
            }
            if token.len() >= self.limit {
                return Err(TokenError::TooLong { limit: self.limit });
            }
            token.push(byte);
        }

        String::from_utf8(token)
            .map(Some)
            .map_err(|_| TokenError::InvalidUtf8)
    }

    /// Mutable access to the underlying source, e.g. to read a payload.
    pub const fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    fn read_byte(&mut self) -> Result<Option<u8>, TokenError> {
        let mut byte = [0_u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    let [value] = byte;
                    return Ok(Some(value));
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return Err(TokenError::Io(error)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;

    use super::*;

    fn collect(input: &[u8]) -> Vec<String> {
        let mut reader = TokenReader::new(Cursor::new(input.to_vec()));
        let mut tokens = Vec::new();
        while let Some(token) = reader.next_token().expect("token") {
            tokens.push(token);
        }
        tokens
    }

    #[rstest]
    #[case::single_spaces(b"CLS 123456 abcdef12 001\n", &["CLS", "123456", "abcdef12", "001"])]
    #[case::mixed_runs(b"  RID\t\t123456 \r abcdef12   001 10", &["RID", "123456", "abcdef12", "001", "10"])]
    #[case::spans_lines(b"RID 123456 abcdef12\n001 1\n", &["RID", "123456", "abcdef12", "001", "1"])]
    #[case::newline_after_blanks(b"RID 123456 \r\n\nabcdef12", &["RID", "123456", "abcdef12"])]
    #[case::empty(b"", &[])]
    #[case::only_whitespace(b" \n\t ", &[])]
    fn splits_on_whitespace_runs(#[case] input: &[u8], #[case] expected: &[&str]) {
        assert_eq!(collect(input), expected);
    }

    #[test]
    fn leaves_payload_after_single_delimiter() {
        let mut reader = TokenReader::new(Cursor::new(b"5 \nabcd\n".to_vec()));
        assert_eq!(reader.next_token().expect("token").as_deref(), Some("5"));
        let mut rest = Vec::new();
        reader.get_mut().read_to_end(&mut rest).expect("rest");
        assert_eq!(rest, b"\nabcd\n");
    }

    #[test]
    fn rejects_oversized_tokens() {
        let mut reader = TokenReader::with_limit(Cursor::new(b"abcdefgh".to_vec()), 4);
        assert!(matches!(
            reader.next_token(),
            Err(TokenError::TooLong { limit: 4 })
        ));
    }

    #[test]
    fn rejects_invalid_utf8() {
        let mut reader = TokenReader::new(Cursor::new(vec![0xff, 0xfe, b' ']));
        assert!(matches!(reader.next_token(), Err(TokenError::InvalidUtf8)));
    }
}
