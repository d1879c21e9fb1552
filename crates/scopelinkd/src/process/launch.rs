//! Runs one server for the configured role until a shutdown signal arrives.

use tracing::info;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::server::{build_service, frame_limits, serve_with_limits};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Runs the server using the production collaborators.
///
/// # Errors
///
/// Fails when bootstrap, binding, or signal installation fails.
pub fn run_server() -> Result<(), LaunchError> {
    run_server_with(
        &SystemConfigLoader,
        &StructuredHealthReporter::new(),
        &SystemShutdownSignal::new(),
    )
}

/// Runs the server with injected collaborators.
///
/// # Errors
///
/// As [`run_server`].
pub fn run_server_with(
    loader: &dyn ConfigLoader,
    reporter: &dyn HealthReporter,
    shutdown: &dyn ShutdownSignal,
) -> Result<(), LaunchError> {
    let prepared = bootstrap_with(loader, reporter)?;
    let role = prepared.role();
    let endpoint = prepared.listen_endpoint();
    info!(target: PROCESS_TARGET, %role, %endpoint, "starting server");

    let service = build_service(prepared.config())?;
    let handle = serve_with_limits(&endpoint, service, frame_limits(prepared.config()))?;
    reporter.listener_ready(role, handle.local_addr());

    let waited = shutdown.wait();
    handle.stop()?;
    reporter.listener_stopped(role);
    waited?;
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}
