//! Instrument servers and the central router for scopelink.
//!
//! A `scopelinkd` process hosts one server, chosen by the configured role:
//! the central router ("Central") or one of the simulated instruments ("AS",
//! "Ceos", "TEM"). Every server speaks the framed protocol from
//! [`scopelink_wire`] over TCP, handling each connection on its own thread.
//!
//! The crate is also a library so that tests and the client's simulator
//! backend can host servers and dispatchers in-process:
//!
//! - [`dispatch`] resolves command names to handlers over a shared state
//!   record guarded by one lock;
//! - [`instruments`] defines the simulated hardware profiles;
//! - [`router`] holds the routing table and forwards frames downstream;
//! - [`serve`] binds an endpoint and returns a [`ServerHandle`].
//!
//! Bootstrap follows a fixed sequence: load configuration, install
//! telemetry, build the role's service, bind, then wait for a shutdown
//! signal. [`HealthReporter`] hooks observe each step.

mod bootstrap;
pub mod dispatch;
mod health;
pub mod instruments;
mod process;
pub mod router;
mod server;
pub mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, Bootstrapped, ConfigLoader, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_server, run_server_with,
};
pub use server::{
    ServerHandle, build_service, frame_limits, serve, serve_with_limits, service_for_role,
};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::ListenerError;

#[cfg(test)]
mod tests;
