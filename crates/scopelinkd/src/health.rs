//! Lifecycle events for a running server.
//!
//! The launcher reports each stage to a [`HealthReporter`]. The default
//! reporter writes one structured event per stage under the
//! `scopelinkd::health` target, tagged with `event` so log pipelines can
//! follow a server from bootstrap to shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use scopelink_config::{Config, ServerRole};
use tracing::{error, info};

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Receives server lifecycle events.
pub trait HealthReporter: Send + Sync {
    /// Configuration is about to be loaded.
    fn bootstrap_starting(&self);

    /// Configuration loaded and telemetry installed.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Bootstrap stopped at `error`.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// The `role` server accepts connections on `addr`.
    fn listener_ready(&self, role: ServerRole, addr: SocketAddr);

    /// The `role` server closed its listener and connections.
    fn listener_stopped(&self, role: ServerRole);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
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

    fn listener_ready(&self, role: ServerRole, addr: SocketAddr) {
        (**self).listener_ready(role, addr);
    }

    fn listener_stopped(&self, role: ServerRole) {
        (**self).listener_stopped(role);
    }
}

/// Reporter that logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Creates the reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        info!(target: HEALTH_TARGET, event = "bootstrap_starting", "loading configuration");
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            role = %config.role,
            endpoint = %config.listen_endpoint(),
            routes = config.routes.entries().len(),
            max_image_dimension = config.max_image_dimension,
            log_format = %config.log_format(),
            "configuration loaded"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        error!(target: HEALTH_TARGET, event = "bootstrap_failed", %error, "bootstrap failed");
    }

    fn listener_ready(&self, role: ServerRole, addr: SocketAddr) {
        info!(
            target: HEALTH_TARGET,
            event = "listener_ready",
            %role,
            destination = role.destination(),
            %addr,
            "accepting connections"
        );
    }

    fn listener_stopped(&self, role: ServerRole) {
        info!(target: HEALTH_TARGET, event = "listener_stopped", %role, "server stopped");
    }
}
