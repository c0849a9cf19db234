//! Routes decoded requests to their handlers and writes the replies.

use std::io::{BufReader, Read, Write};
use std::sync::Arc;

use ticket_wire::{DatagramRequest, DecodeError, Reply, StreamRequest, TokenReader};
use tracing::debug;

use super::errors::StreamError;
use super::stream::{StreamContext, StreamResponse};
use super::{DISPATCH_TARGET, DispatchError, datagram, failure_reply, stream};
use crate::catalog::Catalog;
use crate::lifecycle::Clock;

/// Owns the catalog and serves one request at a time.
pub struct Dispatcher {
    catalog: Catalog,
    clock: Arc<dyn Clock>,
    max_attachment_bytes: u64,
}

impl Dispatcher {
    /// Builds a dispatcher over an already loaded catalog.
    #[must_use]
    pub fn new(catalog: Catalog, clock: Arc<dyn Clock>, max_attachment_bytes: u64) -> Self {
        Self {
            catalog,
            clock,
            max_attachment_bytes,
        }
    }

    /// The catalog as of the last request.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Serves one datagram. Returns `None` when the datagram is not a
    /// recognised command, in which case nothing is sent back.
    pub fn handle_datagram(&mut self, datagram: &[u8]) -> Option<Reply> {
        let request = match DatagramRequest::decode(datagram) {
            Ok(request) => request,
            Err(error) => {
                debug!(
                    target: DISPATCH_TARGET,
                    bytes = datagram.len(),
                    reason = %error,
                    "dropping datagram"
                );
                return None;
            }
        };
        debug!(
            target: DISPATCH_TARGET,
            command = %request.opcode,
            uid = %request.credentials.uid,
            "datagram received"
        );
        let reply = datagram::handle(&mut self.catalog, &request, self.clock.now());
        debug!(target: DISPATCH_TARGET, reply = %reply, "datagram reply");
        Some(reply)
    }

    /// Serves the single request carried by one stream connection.
    ///
    /// Reads the header from `reader`, consumes any attachment payload, then
    /// writes the reply (and any downloaded attachment) to `writer`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError`] when the reply cannot be written. Catalog
    /// changes already made for the request are kept.
    pub fn serve_stream<R, W>(&mut self, reader: R, writer: &mut W) -> Result<(), StreamError>
    where
        R: Read,
        W: Write,
    {
        let mut tokens = TokenReader::new(BufReader::new(reader));
        let response = match StreamRequest::decode(&mut tokens) {
            Ok(request) => {
                debug!(
                    target: DISPATCH_TARGET,
                    command = %request.opcode(),
                    "stream request received"
                );
                let context = StreamContext {
                    now: self.clock.now(),
                    max_attachment_bytes: self.max_attachment_bytes,
                };
                stream::handle(&mut self.catalog, &request, tokens.get_mut(), &context)
            }
            Err(DecodeError::Empty) => {
                debug!(target: DISPATCH_TARGET, "connection closed before a command");
                return Ok(());
            }
            Err(error) => StreamResponse::Line(undecodable(&error)),
        };
        deliver(response, writer)
    }
}

fn undecodable(error: &DecodeError) -> Reply {
    match error.opcode() {
        Some(opcode) => failure_reply(
            opcode.reply_code(),
            &DispatchError::syntax(error.to_string()),
        ),
        None => {
            debug!(target: DISPATCH_TARGET, reason = %error, "unrecognised stream request");
            Reply::error()
        }
    }
}

fn deliver<W: Write>(response: StreamResponse, writer: &mut W) -> Result<(), StreamError> {
    match response {
        StreamResponse::Line(reply) => {
            debug!(target: DISPATCH_TARGET, reply = %reply, "stream reply");
            writer.write_all(reply.to_line().as_bytes())?;
            writer.flush()?;
        }
        StreamResponse::Download {
            header,
            frame,
            mut file,
        } => {
            debug!(
                target: DISPATCH_TARGET,
                reply = %header,
                bytes = frame.len(),
                "stream reply with attachment"
            );
            frame.write_to(writer, &header.to_payload_header(), &mut file)?;
        }
    }
    Ok(())
}
