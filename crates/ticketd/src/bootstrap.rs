//! Startup sequence: configuration, logging, storage and the catalog.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use ticket_config::{Config, StoragePreparationError};

use crate::catalog::{Catalog, CatalogError};
use crate::dispatch::Dispatcher;
use crate::health::HealthReporter;
use crate::lifecycle::Clock;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Source of the server configuration.
pub trait ConfigLoader: Send + Sync {
    /// Loads the server configuration.
    ///
    /// # Errors
    ///
    /// Returns the layered loader's error when any source is malformed.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader reading the command line, environment and configuration files.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning a configuration resolved elsewhere.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// The startup stage that failed.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// A configuration source was malformed.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Loader failure.
        #[source]
        source: Arc<OrthoError>,
    },
    /// The log subscriber could not be installed.
    #[error("failed to install logging: {source}")]
    Telemetry {
        /// Subscriber failure.
        #[source]
        source: TelemetryError,
    },
    /// The data or attachment directory could not be created.
    #[error("failed to prepare storage: {source}")]
    Storage {
        /// Filesystem error reported while creating the directories.
        #[source]
        source: StoragePreparationError,
    },
    /// A snapshot could not be read at startup.
    #[error("failed to load catalog: {source}")]
    Catalog {
        /// Underlying catalog error.
        #[source]
        source: CatalogError,
    },
}

/// A configured server with its catalog loaded and no sockets bound yet.
pub struct Server {
    config: Config,
    catalog: Catalog,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Server {
    /// Resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Catalog as read from the snapshots.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Log subscriber serving the process.
    #[must_use]
    pub const fn telemetry(&self) -> &TelemetryHandle {
        &self.telemetry
    }

    /// Reporter the server was bootstrapped with.
    #[must_use]
    pub fn reporter(&self) -> Arc<dyn HealthReporter> {
        Arc::clone(&self.reporter)
    }

    /// Hands the catalog to a dispatcher driven by `clock`.
    #[must_use]
    pub fn into_dispatcher(self, clock: Arc<dyn Clock>) -> (Config, Dispatcher) {
        let max_attachment_bytes = self.config.max_attachment_bytes();
        let dispatcher = Dispatcher::new(self.catalog, clock, max_attachment_bytes);
        (self.config, dispatcher)
    }
}

/// Runs the startup sequence with `loader` and `reporter`.
///
/// Every failure is reported to `reporter` before it is returned.
///
/// # Errors
///
/// Returns a [`BootstrapError`] naming the stage that failed.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Server, BootstrapError> {
    reporter.bootstrap_starting();
    match prepare(loader, reporter.as_ref()) {
        Ok((config, catalog, telemetry)) => {
            reporter.bootstrap_succeeded(&config);
            Ok(Server {
                config,
                catalog,
                telemetry,
                reporter,
            })
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn prepare(
    loader: &dyn ConfigLoader,
    reporter: &dyn HealthReporter,
) -> Result<(Config, Catalog, TelemetryHandle), BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    let storage = config.storage();
    storage
        .prepare_filesystem()
        .map_err(|source| BootstrapError::Storage { source })?;

    let mut catalog = Catalog::new(storage);
    catalog
        .reload_all()
        .map_err(|source| BootstrapError::Catalog { source })?;
    reporter.catalog_loaded(catalog.counts());
    Ok((config, catalog, telemetry))
}
