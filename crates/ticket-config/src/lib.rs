//! Shared configuration for the ticketed-event server.
//!
//! Values are layered by [`ortho_config`]: built-in defaults, then an optional
//! configuration file, then `TICKETD_*` environment variables, then command
//! line flags. The daemon consumes the resolved [`Config`] through the helper
//! accessors defined here rather than reading fields directly, so derived
//! values (the effective log filter, the bind endpoint, storage paths) are
//! computed in one place.

mod defaults;
mod endpoint;
mod logging;
mod storage;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_MAX_ATTACHMENT_BYTES, DEFAULT_PORT,
    default_attachment_dir, default_data_dir, default_host, default_log_filter,
    default_log_filter_string, default_log_format,
};
pub use endpoint::{EndpointError, ServerEndpoint};
pub use logging::{LogFormat, LogFormatParseError, VERBOSE_LOG_FILTER, effective_log_filter};
pub use storage::{StoragePaths, StoragePreparationError};

/// Resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "TICKETD")]
pub struct Config {
    /// Address both the datagram socket and the stream listener bind to.
    #[ortho_config(default = defaults::default_host())]
    pub host: String,
    /// Port shared by the datagram socket and the stream listener.
    #[ortho_config(default = defaults::DEFAULT_PORT)]
    pub port: u16,
    /// Directory holding the account, event and reservation snapshots.
    #[ortho_config(default = defaults::default_data_dir())]
    pub data_dir: Utf8PathBuf,
    /// Directory holding event attachments.
    #[ortho_config(default = defaults::default_attachment_dir())]
    pub attachment_dir: Utf8PathBuf,
    /// Largest attachment accepted by event creation, in bytes.
    #[ortho_config(default = defaults::DEFAULT_MAX_ATTACHMENT_BYTES)]
    pub max_attachment_bytes: u64,
    /// Raises logging to debug level when the filter is left at its default.
    #[ortho_config(default = false)]
    pub verbose: bool,
    /// `tracing` filter expression.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format for structured logs.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_PORT,
            data_dir: default_data_dir(),
            attachment_dir: default_attachment_dir(),
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
            verbose: false,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Endpoint shared by both server channels.
    #[must_use]
    pub fn endpoint(&self) -> ServerEndpoint {
        ServerEndpoint::new(self.host.clone(), self.port)
    }

    /// Snapshot and attachment locations derived from the configured directories.
    #[must_use]
    pub fn storage(&self) -> StoragePaths {
        StoragePaths::new(self.data_dir.clone(), self.attachment_dir.clone())
    }

    /// Filter expression handed to the telemetry subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        effective_log_filter(&self.log_filter, self.verbose)
    }

    /// Configured log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Largest attachment accepted by event creation, in bytes.
    #[must_use]
    pub const fn max_attachment_bytes(&self) -> u64 {
        self.max_attachment_bytes
    }
}
