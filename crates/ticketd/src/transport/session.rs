//! The single-threaded session loop.
//!
//! One `poll` call waits, without a timeout, on the datagram socket, the
//! stream listener and the shutdown pipe. A readable datagram socket yields
//! one datagram and at most one reply. A readable listener yields one
//! connection, which is served to completion and closed before the loop
//! waits again. Requests are therefore never interleaved.

use std::io::{self, Read, Write};
use std::net::{TcpListener, UdpSocket};
use std::os::fd::AsFd;
use std::os::raw::c_int;
use std::os::unix::net::UnixStream;

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use tracing::{debug, info, warn};

use ticket_wire::MAX_DATAGRAM_BYTES;

use super::errors::ListenerError;
use super::listener::BoundSockets;
use crate::dispatch::Dispatcher;

const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Read end of the shutdown notification channel.
#[derive(Debug)]
pub struct ShutdownPipe {
    reader: UnixStream,
}

/// Write end of the shutdown notification channel.
#[derive(Debug)]
pub struct ShutdownTrigger {
    writer: UnixStream,
}

impl ShutdownPipe {
    /// Creates a connected pipe and trigger.
    ///
    /// # Errors
    ///
    /// Returns the IO error raised while creating the socket pair.
    pub fn pair() -> io::Result<(Self, ShutdownTrigger)> {
        let (reader, writer) = UnixStream::pair()?;
        reader.set_nonblocking(true)?;
        Ok((Self { reader }, ShutdownTrigger { writer }))
    }

    /// Creates a pipe that becomes readable when any of `signals` arrives.
    ///
    /// # Errors
    ///
    /// Returns the IO error raised while creating the pipe or installing a
    /// handler.
    pub fn for_signals(signals: &[c_int]) -> io::Result<Self> {
        let (pipe, trigger) = Self::pair()?;
        for &signal in signals {
            signal_hook::low_level::pipe::register(signal, trigger.writer.try_clone()?)?;
        }
        Ok(pipe)
    }

    fn drain(&mut self) {
        let mut buffer = [0_u8; 64];
        loop {
            match self.reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(_) => {}
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(_) => break,
            }
        }
    }
}

impl ShutdownTrigger {
    /// Asks the session loop to stop after the request in progress.
    ///
    /// # Errors
    ///
    /// Returns the IO error raised while writing to the pipe.
    pub fn fire(&self) -> io::Result<()> {
        (&self.writer).write_all(&[1])
    }
}

#[derive(Debug, Clone, Copy)]
struct Readiness {
    datagram: bool,
    stream: bool,
    shutdown: bool,
}

/// Serves both channels until shutdown is requested.
pub struct SessionLoop {
    sockets: BoundSockets,
    dispatcher: Dispatcher,
    shutdown: ShutdownPipe,
}

impl SessionLoop {
    /// Assembles a loop over bound sockets.
    #[must_use]
    pub const fn new(sockets: BoundSockets, dispatcher: Dispatcher, shutdown: ShutdownPipe) -> Self {
        Self {
            sockets,
            dispatcher,
            shutdown,
        }
    }

    /// Runs until the shutdown pipe becomes readable.
    ///
    /// Failures of individual requests are logged and never end the loop.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::Poll`] when waiting for readiness fails.
    pub fn run(mut self) -> Result<Dispatcher, ListenerError> {
        info!(target: SESSION_TARGET, "session loop started");
        loop {
            let readiness = self.wait()?;
            if readiness.shutdown {
                self.shutdown.drain();
                info!(target: SESSION_TARGET, "shutdown requested");
                return Ok(self.dispatcher);
            }
            if readiness.datagram {
                serve_datagram(&self.sockets.datagram, &mut self.dispatcher);
            }
            if readiness.stream {
                serve_connection(&self.sockets.stream, &mut self.dispatcher);
            }
        }
    }

    fn wait(&self) -> Result<Readiness, ListenerError> {
        loop {
            let mut fds = [
                PollFd::new(self.sockets.datagram.as_fd(), PollFlags::POLLIN),
                PollFd::new(self.sockets.stream.as_fd(), PollFlags::POLLIN),
                PollFd::new(self.shutdown.reader.as_fd(), PollFlags::POLLIN),
            ];
            match poll(&mut fds, PollTimeout::NONE) {
                Ok(_) => {}
                Err(Errno::EINTR) => continue,
                Err(source) => return Err(ListenerError::Poll { source }),
            }
            let [datagram, stream, shutdown] = fds.map(|fd| is_ready(&fd));
            return Ok(Readiness {
                datagram,
                stream,
                shutdown,
            });
        }
    }
}

fn is_ready(fd: &PollFd<'_>) -> bool {
    fd.revents().is_some_and(|events| {
        events.intersects(PollFlags::POLLIN | PollFlags::POLLERR | PollFlags::POLLHUP)
    })
}

fn serve_datagram(socket: &UdpSocket, dispatcher: &mut Dispatcher) {
    let mut buffer = [0_u8; MAX_DATAGRAM_BYTES];
    let (len, peer) = match socket.recv_from(&mut buffer) {
        Ok(received) => received,
        Err(error) => {
            warn!(target: SESSION_TARGET, error = %error, "failed to receive datagram");
            return;
        }
    };
    let Some(datagram) = buffer.get(..len) else {
        return;
    };
    debug!(target: SESSION_TARGET, peer = %peer, bytes = len, "datagram received");
    let Some(reply) = dispatcher.handle_datagram(datagram) else {
        return;
    };
    if let Err(error) = socket.send_to(reply.to_line().as_bytes(), peer) {
        warn!(target: SESSION_TARGET, peer = %peer, error = %error, "failed to send reply");
    }
}

fn serve_connection(listener: &TcpListener, dispatcher: &mut Dispatcher) {
    let (stream, peer) = match listener.accept() {
        Ok(accepted) => accepted,
        Err(error) => {
            warn!(target: SESSION_TARGET, error = %error, "failed to accept connection");
            return;
        }
    };
    debug!(target: SESSION_TARGET, peer = %peer, "connection accepted");
    let mut writer = &stream;
    if let Err(error) = dispatcher.serve_stream(&stream, &mut writer) {
        warn!(target: SESSION_TARGET, peer = %peer, error = %error, "failed to reply");
    }
    debug!(target: SESSION_TARGET, peer = %peer, "connection closed");
}
