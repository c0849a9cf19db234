//! Wire protocol for the ticketed-event server.
//!
//! Two channels share one vocabulary of three-letter opcodes:
//!
//! - the datagram channel carries one newline-terminated line per request and
//!   per reply (see [`DatagramRequest`]);
//! - the stream channel carries a whitespace-separated header which, for
//!   commands that move an attachment, is followed by exactly the declared
//!   number of raw bytes and one trailing newline (see [`StreamRequest`] and
//!   [`PayloadFrame`]).
//!
//! Everything here is transport-agnostic: decoders read from any
//! [`std::io::Read`] and encoders produce strings or write to any
//! [`std::io::Write`]. Semantic validation of the decoded tokens (identifier
//! syntax, numeric ranges) belongs to the server.

mod errors;
mod framing;
mod reply;
mod request;
mod token;

pub use errors::{DecodeError, FrameError, TokenError};
pub use framing::PayloadFrame;
pub use reply::{Reply, ReplyCode, Status};
pub use request::{
    CreateHeader, Credentials, DatagramOpcode, DatagramRequest, StreamOpcode, StreamRequest,
};
pub use token::{DEFAULT_TOKEN_LIMIT, TokenReader};

/// Largest datagram the server reads in one receive call.
pub const MAX_DATAGRAM_BYTES: usize = 1024;
