use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Default bind address for both channels.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default port shared by the datagram socket and the stream listener.
pub const DEFAULT_PORT: u16 = 58000;

/// Largest attachment accepted unless configured otherwise.
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 10_000_000;

/// Default log filter expression used by the server.
pub const DEFAULT_LOG_FILTER: &str = "info";

const DEFAULT_DATA_DIR: &str = "data";
const ATTACHMENT_SUBDIR: &str = "attachments";

/// Owned default bind address.
#[must_use]
pub fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

/// Default directory for snapshot files.
#[must_use]
pub fn default_data_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_DATA_DIR)
}

/// Default directory for event attachments, nested under the data directory.
#[must_use]
pub fn default_attachment_dir() -> Utf8PathBuf {
    default_data_dir().join(ATTACHMENT_SUBDIR)
}

/// Default log filter expression used by the server.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the server.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
