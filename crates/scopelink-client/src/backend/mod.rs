//! Interchangeable ways of executing a command.
//!
//! Every backend answers [`CommandBackend::send_command`] with the same
//! [`CommandResponse`] shapes, so callers pick one at start-up and never
//! branch on it again.

mod direct;
mod routed;
mod simulator;

use scopelink_config::{BackendMode, Config};
use scopelink_wire::{Args, CommandResponse};
use tracing::{info, warn};

pub use self::direct::DirectProxy;
pub use self::routed::RoutedBackend;
pub use self::simulator::Simulator;

use crate::CLIENT_TARGET;
use crate::errors::{AppError, ClientError};

/// Executes commands against some set of instrument servers.
pub trait CommandBackend {
    /// Short label used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Sends one command and returns its response.
    ///
    /// # Errors
    ///
    /// Fails when the exchange could not be completed.
    fn send_command(
        &mut self,
        destination: &str,
        command: &str,
        args: Option<Args>,
    ) -> Result<CommandResponse, ClientError>;
}

/// Picks the backend named by `config.backend`.
///
/// `auto` tries the routed client, then the direct proxy, then the
/// simulator, logging each fallback. The choice is made once.
pub(crate) fn select_backend(config: &Config) -> Result<Box<dyn CommandBackend>, AppError> {
    let backend: Box<dyn CommandBackend> = match config.backend {
        BackendMode::Routed => Box::new(RoutedBackend::connect(config).map_err(AppError::NoBackend)?),
        BackendMode::Direct => Box::new(DirectProxy::connect(config).map_err(AppError::NoBackend)?),
        BackendMode::Simulator => Box::new(Simulator::from_config(config)?),
        BackendMode::Auto => auto_select(config)?,
    };
    info!(target: CLIENT_TARGET, backend = backend.name(), "backend selected");
    Ok(backend)
}

fn auto_select(config: &Config) -> Result<Box<dyn CommandBackend>, AppError> {
    match RoutedBackend::connect(config) {
        Ok(backend) => return Ok(Box::new(backend)),
        Err(error) => warn!(
            target: CLIENT_TARGET,
            central = %config.central,
            %error,
            "central router unavailable, trying direct proxy"
        ),
    }
    match DirectProxy::connect(config) {
        Ok(backend) => return Ok(Box::new(backend)),
        Err(error) => warn!(
            target: CLIENT_TARGET,
            direct_uri = %config.direct_uri,
            %error,
            "direct proxy unavailable, falling back to simulator"
        ),
    }
    Ok(Box::new(Simulator::from_config(config)?))
}
