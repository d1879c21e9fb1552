use crate::endpoint::Endpoint;
use crate::logging::LogFormat;
use crate::role::{BackendMode, ServerRole};
use crate::routes::RouteTableSpec;

/// Port the central router listens on.
pub const DEFAULT_CENTRAL_PORT: u16 = 9000;

/// Port the AutoScript twin listens on.
pub const DEFAULT_AS_PORT: u16 = 9001;

/// Port the aberration corrector twin listens on.
pub const DEFAULT_CEOS_PORT: u16 = 9003;

/// Port the microscope object listens on for direct proxies.
pub const DEFAULT_TEM_PORT: u16 = 9093;

/// Host servers bind to by default.
pub const DEFAULT_LISTEN_HOST: &str = "127.0.0.1";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Largest image edge, in pixels, a server will produce or a codec accept.
pub const DEFAULT_MAX_IMAGE_DIMENSION: u32 = 4096;

/// Milliseconds a client waits for a complete response frame.
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 10_000;

/// Milliseconds a client waits for a TCP connection to establish.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2_000;

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Owned listen host.
#[must_use]
pub fn default_listen_host() -> String {
    DEFAULT_LISTEN_HOST.to_owned()
}

/// Default server role for `scopelinkd`.
#[must_use]
pub const fn default_role() -> ServerRole {
    ServerRole::Central
}

/// Default backend selection for the client.
#[must_use]
pub const fn default_backend_mode() -> BackendMode {
    BackendMode::Auto
}

/// Endpoint of the central router on the loopback interface.
#[must_use]
pub fn default_central_endpoint() -> Endpoint {
    Endpoint::new(DEFAULT_LISTEN_HOST, DEFAULT_CENTRAL_PORT)
}

/// Endpoint of the microscope object used by the direct proxy backend.
#[must_use]
pub fn default_direct_endpoint() -> Endpoint {
    Endpoint::new(DEFAULT_LISTEN_HOST, DEFAULT_TEM_PORT)
}

/// Routes to the loopback instrument twins.
#[must_use]
pub fn default_routes() -> RouteTableSpec {
    RouteTableSpec::new(vec![
        (
            ServerRole::As.destination().to_owned(),
            Endpoint::new(DEFAULT_LISTEN_HOST, DEFAULT_AS_PORT),
        ),
        (
            ServerRole::Ceos.destination().to_owned(),
            Endpoint::new(DEFAULT_LISTEN_HOST, DEFAULT_CEOS_PORT),
        ),
    ])
}
