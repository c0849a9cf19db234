use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::defaults::DEFAULT_LOG_FILTER;

/// Filter used when verbose output is requested without an explicit filter.
pub const VERBOSE_LOG_FILTER: &str = "debug";

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Structured JSON suitable for ingestion by logging stacks.
    #[default]
    Json,
    /// Human-readable single line output.
    Compact,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

/// Resolves the filter expression after applying the verbose switch.
///
/// An explicitly configured filter always wins; `verbose` only upgrades the
/// default `info` filter.
#[must_use]
pub fn effective_log_filter(filter: &str, verbose: bool) -> &str {
    if verbose && filter == DEFAULT_LOG_FILTER {
        VERBOSE_LOG_FILTER
    } else {
        filter
    }
}
