//! Binding of the datagram socket and the stream listener.

use std::net::{SocketAddr, TcpListener, UdpSocket};

use tracing::info;

use ticket_config::ServerEndpoint;

use super::TRANSPORT_TARGET;
use super::errors::ListenerError;

/// The two sockets the server listens on.
#[derive(Debug)]
pub struct BoundSockets {
    pub(crate) datagram: UdpSocket,
    pub(crate) stream: TcpListener,
}

impl BoundSockets {
    /// Binds both sockets to the resolved endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when the endpoint does not resolve or either
    /// socket cannot be bound.
    pub fn bind(endpoint: &ServerEndpoint) -> Result<Self, ListenerError> {
        let addr = endpoint
            .resolve()
            .map_err(|source| ListenerError::Resolve { source })?;
        let datagram =
            UdpSocket::bind(addr).map_err(|source| ListenerError::BindDatagram { addr, source })?;
        let stream =
            TcpListener::bind(addr).map_err(|source| ListenerError::BindStream { addr, source })?;
        let sockets = Self { datagram, stream };
        info!(
            target: TRANSPORT_TARGET,
            datagram = %sockets.datagram_addr()?,
            stream = %sockets.stream_addr()?,
            "sockets bound"
        );
        Ok(sockets)
    }

    /// Local address of the datagram socket.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::LocalAddr`] when the address cannot be read.
    pub fn datagram_addr(&self) -> Result<SocketAddr, ListenerError> {
        self.datagram
            .local_addr()
            .map_err(|source| ListenerError::LocalAddr { source })
    }

    /// Local address of the stream listener.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::LocalAddr`] when the address cannot be read.
    pub fn stream_addr(&self) -> Result<SocketAddr, ListenerError> {
        self.stream
            .local_addr()
            .map_err(|source| ListenerError::LocalAddr { source })
    }
}
