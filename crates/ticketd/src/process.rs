//! Process entry: bootstrap, bind, serve, and stop on a termination signal.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use thiserror::Error;
use tracing::info;

use crate::bootstrap::{BootstrapError, ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::lifecycle::{Clock, SystemClock};
use crate::transport::{BoundSockets, ListenerError, SessionLoop, ShutdownPipe};

const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Errors that end the server process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Termination signal handlers could not be installed.
    #[error("failed to install signal handlers: {source}")]
    Signals {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Bootstrap failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// Binding or serving the channels failed.
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Runs the server with the system configuration until a termination signal.
///
/// # Errors
///
/// Returns a [`LaunchError`] when the server cannot start or its loop fails.
pub fn run_server() -> Result<(), LaunchError> {
    let shutdown = ShutdownPipe::for_signals(&[SIGTERM, SIGINT, SIGQUIT, SIGHUP])
        .map_err(|source| LaunchError::Signals { source })?;
    run_server_with(
        &SystemConfigLoader,
        Arc::new(StructuredHealthReporter::new()),
        Arc::new(SystemClock),
        shutdown,
    )
}

/// Runs the server with explicit collaborators until `shutdown` fires.
///
/// # Errors
///
/// Returns a [`LaunchError`] when the server cannot start or its loop fails.
pub fn run_server_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    clock: Arc<dyn Clock>,
    shutdown: ShutdownPipe,
) -> Result<(), LaunchError> {
    let server = bootstrap_with(loader, reporter)?;
    let health = server.reporter();
    let (config, dispatcher) = server.into_dispatcher(clock);

    let sockets = BoundSockets::bind(&config.endpoint())?;
    health.listening(sockets.datagram_addr()?, sockets.stream_addr()?);

    SessionLoop::new(sockets, dispatcher, shutdown).run()?;
    health.server_stopped();
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}

/// Maps the outcome of a server run onto the process exit status, writing a
/// fatal error to `stderr`.
#[must_use]
pub fn exit_status<W: Write>(outcome: Result<(), LaunchError>, stderr: &mut W) -> ExitCode {
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            writeln!(stderr, "ticketd: {error}").ok();
            ExitCode::FAILURE
        }
    }
}
