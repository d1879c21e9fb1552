//! Shared configuration for the scopelink servers and client.
//!
//! [`Config`] is loaded through `ortho_config`, so every field can be set from
//! `--kebab-case` flags, `SCOPELINK_*` environment variables, a
//! `.scopelink.toml` file (or `--config-path`), or the built-in defaults, in
//! that order of precedence.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod endpoint;
mod logging;
mod role;
mod routes;

pub use defaults::{
    DEFAULT_AS_PORT, DEFAULT_CALL_TIMEOUT_MS, DEFAULT_CENTRAL_PORT, DEFAULT_CEOS_PORT,
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_LISTEN_HOST, DEFAULT_LOG_FILTER,
    DEFAULT_MAX_IMAGE_DIMENSION, DEFAULT_TEM_PORT, default_backend_mode, default_central_endpoint,
    default_direct_endpoint, default_listen_host, default_log_filter, default_log_filter_string,
    default_log_format, default_role, default_routes,
};
pub use endpoint::{Endpoint, EndpointParseError};
pub use logging::LogFormat;
pub use role::{BackendMode, ServerRole};
pub use routes::{RouteSpecParseError, RouteTableSpec};

/// Layered configuration shared by `scopelinkd` and the `scopelink` client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "SCOPELINK")]
pub struct Config {
    /// Server hosted by `scopelinkd`.
    #[ortho_config(default = default_role())]
    pub role: ServerRole,
    /// Interface `scopelinkd` binds to.
    #[ortho_config(default = default_listen_host())]
    pub listen_host: String,
    /// Port `scopelinkd` binds to; the role's well-known port when unset.
    pub port: Option<u16>,
    /// Central router the routed client talks to.
    #[ortho_config(default = default_central_endpoint())]
    pub central: Endpoint,
    /// Routing table pushed to (or seeded into) the central router.
    #[ortho_config(default = default_routes())]
    pub routes: RouteTableSpec,
    /// Backend selection strategy for the client.
    #[ortho_config(default = default_backend_mode())]
    pub backend: BackendMode,
    /// Server object the direct proxy backend connects to.
    #[ortho_config(default = default_direct_endpoint())]
    pub direct_uri: Endpoint,
    /// Prefix applied to command names by the direct proxy (for example `AS`).
    pub direct_namespace: Option<String>,
    /// Milliseconds a call may wait for its response.
    #[ortho_config(default = DEFAULT_CALL_TIMEOUT_MS)]
    pub call_timeout_ms: u64,
    /// Milliseconds a connection attempt may take.
    #[ortho_config(default = DEFAULT_CONNECT_TIMEOUT_MS)]
    pub connect_timeout_ms: u64,
    /// Largest image edge, in pixels.
    #[ortho_config(default = DEFAULT_MAX_IMAGE_DIMENSION)]
    pub max_image_dimension: u32,
    /// Artificial delay applied by simulated hardware handlers.
    #[ortho_config(default = 0)]
    pub command_latency_ms: u64,
    /// Tracing filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Tracing output format.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            role: default_role(),
            listen_host: default_listen_host(),
            port: None,
            central: default_central_endpoint(),
            routes: default_routes(),
            backend: default_backend_mode(),
            direct_uri: default_direct_endpoint(),
            direct_namespace: None,
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            max_image_dimension: DEFAULT_MAX_IMAGE_DIMENSION,
            command_latency_ms: 0,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Endpoint `scopelinkd` listens on for its configured role.
    #[must_use]
    pub fn listen_endpoint(&self) -> Endpoint {
        Endpoint::new(
            self.listen_host.clone(),
            self.port.unwrap_or_else(|| self.role.default_port()),
        )
    }

    /// Per-call response deadline.
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Connection establishment deadline.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Simulated hardware delay.
    #[must_use]
    pub const fn command_latency(&self) -> Duration {
        Duration::from_millis(self.command_latency_ms)
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Tracing output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
