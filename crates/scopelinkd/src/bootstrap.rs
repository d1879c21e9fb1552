//! Loading configuration and installing telemetry before a server starts.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use scopelink_config::{Config, Endpoint, ServerRole};

use crate::health::HealthReporter;
use crate::instruments::InstrumentSettings;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Source of the server configuration.
pub trait ConfigLoader: Send + Sync {
    /// Produces the merged configuration.
    ///
    /// # Errors
    ///
    /// Fails when a flag, variable, or file layer is malformed.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Reads flags, `SCOPELINK_*` variables, and `.scopelink.toml`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Hands out a configuration built in code.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Serves `config` on every load.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Reasons a server could not be prepared.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// A configuration layer was rejected.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// The tracing subscriber could not be installed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Telemetry error.
        #[source]
        source: TelemetryError,
    },
}

/// A configured server that has not yet bound its endpoint.
#[derive(Debug)]
pub struct Bootstrapped {
    config: Config,
    telemetry: TelemetryHandle,
}

impl Bootstrapped {
    /// The merged configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Server hosted by this process.
    #[must_use]
    pub const fn role(&self) -> ServerRole {
        self.config.role
    }

    /// Endpoint the server will bind.
    #[must_use]
    pub fn listen_endpoint(&self) -> Endpoint {
        self.config.listen_endpoint()
    }

    /// Image bound and simulated latency for instrument handlers.
    #[must_use]
    pub fn instrument_settings(&self) -> InstrumentSettings {
        InstrumentSettings::from_config(&self.config)
    }

    /// Proof that the tracing subscriber is installed.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }
}

/// Loads configuration and installs telemetry, reporting each step.
///
/// # Errors
///
/// Fails when configuration cannot be loaded or telemetry cannot be
/// installed. `reporter` sees the failure before it is returned.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: &dyn HealthReporter,
) -> Result<Bootstrapped, BootstrapError> {
    reporter.bootstrap_starting();
    let prepared = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })
        .and_then(|config| {
            telemetry::initialise(&config)
                .map(|telemetry| Bootstrapped { config, telemetry })
                .map_err(|source| BootstrapError::Telemetry { source })
        });
    match &prepared {
        Ok(server) => reporter.bootstrap_succeeded(server.config()),
        Err(error) => reporter.bootstrap_failed(error),
    }
    prepared
}
