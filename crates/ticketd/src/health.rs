//! Lifecycle milestones of the server process.

use std::net::SocketAddr;
use std::sync::Arc;

use ticket_config::Config;

use crate::bootstrap::BootstrapError;
use crate::catalog::CatalogCounts;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Receives each lifecycle milestone as it happens.
pub trait HealthReporter: Send + Sync {
    /// Startup has begun; nothing has been loaded yet.
    fn bootstrap_starting(&self);

    /// The catalog is loaded and the server is ready to bind.
    fn bootstrap_succeeded(&self, config: &Config);

    /// A startup stage failed and the server will not run.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// The snapshots were read; `counts` describes what they held.
    fn catalog_loaded(&self, counts: CatalogCounts);

    /// Both channels are bound and requests are being served.
    fn listening(&self, datagram: SocketAddr, stream: SocketAddr);

    /// The session loop returned after a shutdown request.
    fn server_stopped(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn catalog_loaded(&self, counts: CatalogCounts) {
        (**self).catalog_loaded(counts);
    }

    fn listening(&self, datagram: SocketAddr, stream: SocketAddr) {
        (**self).listening(datagram, stream);
    }

    fn server_stopped(&self) {
        (**self).server_stopped();
    }
}

/// Reporter logging each milestone under the `health` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Logging reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting server bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            endpoint = %config.endpoint(),
            data_dir = %config.data_dir,
            attachment_dir = %config.attachment_dir,
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "server bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "server bootstrap failed"
        );
    }

    fn catalog_loaded(&self, counts: CatalogCounts) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "catalog_loaded",
            accounts = counts.accounts,
            events = counts.events,
            reservations = counts.reservations,
            "catalog loaded"
        );
    }

    fn listening(&self, datagram: SocketAddr, stream: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listening",
            datagram = %datagram,
            stream = %stream,
            "accepting requests"
        );
    }

    fn server_stopped(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_stopped",
            "server stopped"
        );
    }
}
