//! Ticketed-event reservation server.
//!
//! The server keeps a catalog of accounts, events and seat reservations and
//! answers two request channels bound to the same address: a datagram channel
//! for short account and listing queries, and a stream channel for commands
//! that create, close, reserve or transfer event attachments. Both channels
//! are served by one thread, one request at a time, so the catalog and its
//! snapshot files never see concurrent mutation.
//!
//! Startup follows a fixed sequence: load the layered configuration, install
//! structured telemetry, create the storage directories, read the snapshots,
//! bind both channels, then serve until a termination signal arrives. Each
//! stage is surfaced through a [`HealthReporter`].

mod bootstrap;
pub mod catalog;
pub mod dispatch;
mod health;
pub mod ledger;
pub mod lifecycle;
mod process;
mod telemetry;
pub mod transport;
pub mod validation;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Server, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, exit_status, run_server, run_server_with};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
