//! Endpoint bootstrap orchestration.

use std::io::{Read, Write};

use thiserror::Error;
use tracing::{error, info};

use lumen_config::{Config, ConfigError};
use lumen_lsp::{ServeError, ServeOptions, Termination, serve};

use crate::telemetry::{self, TelemetryError, TelemetryHandle};

const BOOTSTRAP_TARGET: &str = "lumend::bootstrap";

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader {
    /// Loads the endpoint configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when arguments or environment values are
    /// rejected.
    fn load(&self) -> Result<Config, ConfigError>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Config::load()
    }
}

/// Loader returning a fixed configuration.
#[derive(Debug, Default, Clone)]
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
    fn load(&self) -> Result<Config, ConfigError> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
}

/// A configured endpoint ready to serve one connection.
#[derive(Debug)]
pub struct Endpoint {
    config: Config,
    telemetry: TelemetryHandle,
}

impl Endpoint {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Serves a single connection over `input` and `output`.
    ///
    /// # Errors
    ///
    /// Returns the [`ServeError`] that ended the connection.
    pub fn run<R, W>(&self, input: R, output: W) -> Result<Termination, ServeError>
    where
        R: Read,
        W: Write,
    {
        info!(target: BOOTSTRAP_TARGET, "started");
        let outcome = serve(input, output, ServeOptions::from_config(&self.config));
        match &outcome {
            Ok(termination) => info!(
                target: BOOTSTRAP_TARGET,
                ?termination,
                exit_code = termination.exit_code(),
                "connection finished"
            ),
            Err(failure) => error!(target: BOOTSTRAP_TARGET, error = %failure, "connection failed"),
        }
        outcome
    }
}

/// Loads configuration and installs telemetry.
///
/// # Errors
///
/// Returns [`BootstrapError`] naming the stage that failed.
pub fn bootstrap_with(loader: &dyn ConfigLoader) -> Result<Endpoint, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;

    info!(
        target: BOOTSTRAP_TARGET,
        log_format = %config.log_format(),
        malformed_messages = %config.malformed_messages(),
        unknown_methods = %config.unknown_methods(),
        "configuration loaded"
    );
    Ok(Endpoint { config, telemetry })
}
