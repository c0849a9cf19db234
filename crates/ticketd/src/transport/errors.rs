//! Error types for socket binding and the session loop.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use ticket_config::EndpointError;

/// Errors surfaced while binding or serving the sockets.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The configured endpoint did not resolve.
    #[error("failed to resolve listening address: {source}")]
    Resolve {
        /// Resolution failure.
        #[source]
        source: EndpointError,
    },
    /// Binding the datagram socket failed.
    #[error("failed to bind UDP socket at {addr}: {source}")]
    BindDatagram {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Binding the stream listener failed.
    #[error("failed to bind TCP listener at {addr}: {source}")]
    BindStream {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Reading a bound socket's address failed.
    #[error("failed to read local address: {source}")]
    LocalAddr {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Waiting for readiness failed.
    #[error("failed to wait for socket readiness: {source}")]
    Poll {
        /// Underlying errno.
        #[source]
        source: nix::Error,
    },
}
