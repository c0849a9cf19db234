//! Error types for token reading, payload framing and request decoding.

use std::io;

use thiserror::Error;

use crate::request::StreamOpcode;

/// Errors surfaced while reading a single whitespace-delimited token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token grew beyond the configured limit before a delimiter arrived.
    #[error("token exceeds {limit} bytes")]
    TooLong {
        /// Configured limit in bytes.
        limit: usize,
    },
    /// The token bytes were not valid UTF-8.
    #[error("token is not valid UTF-8")]
    InvalidUtf8,
    /// Reading from the underlying channel failed.
    #[error("failed to read token: {0}")]
    Io(#[from] io::Error),
}

/// Errors surfaced while transferring a length-framed payload.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The channel reached end of stream before the declared length arrived.
    #[error("payload truncated: expected {expected} bytes, transferred {transferred}")]
    Truncated {
        /// Declared payload length.
        expected: u64,
        /// Bytes transferred before end of stream.
        transferred: u64,
    },
    /// Reading or writing failed.
    #[error("payload transfer failed: {0}")]
    Io(#[from] io::Error),
}

/// Errors surfaced while decoding requests or replies.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The request carried no tokens at all.
    #[error("empty request")]
    Empty,
    /// The request bytes were not valid UTF-8.
    #[error("request is not valid UTF-8")]
    InvalidUtf8,
    /// The opcode is not part of the channel's vocabulary.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    /// A stream command ended before one of its arguments.
    #[error("{opcode} is missing argument '{argument}'")]
    MissingArgument {
        /// Command being decoded.
        opcode: StreamOpcode,
        /// Name of the first missing argument.
        argument: &'static str,
    },
    /// Reading a stream command argument failed.
    #[error("{opcode} argument could not be read: {source}")]
    Token {
        /// Command being decoded.
        opcode: StreamOpcode,
        /// Underlying token error.
        #[source]
        source: TokenError,
    },
    /// Reading the opcode itself failed.
    #[error("command could not be read: {0}")]
    Opcode(#[source] TokenError),
    /// A reply line did not start with a known reply code.
    #[error("unknown reply '{0}'")]
    UnknownReply(String),
    /// A reply line carried a status outside the protocol vocabulary.
    #[error("unknown status '{0}'")]
    UnknownStatus(String),
}

impl DecodeError {
    /// Stream opcode the error belongs to, when the opcode was recognised.
    #[must_use]
    pub const fn opcode(&self) -> Option<StreamOpcode> {
        match self {
            Self::MissingArgument { opcode, .. } | Self::Token { opcode, .. } => Some(*opcode),
            _ => None,
        }
    }
}
