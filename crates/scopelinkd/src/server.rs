//! Starting servers on TCP endpoints.
//!
//! [`serve`] binds the endpoint, starts the accept loop, and returns a
//! [`ServerHandle`]. [`build_service`] picks the service for a configured
//! role.

use std::net::SocketAddr;
use std::sync::Arc;

use scopelink_config::{Config, Endpoint, ServerRole};
use scopelink_wire::FrameLimits;

use crate::dispatch::{CommandService, RegistryError};
use crate::instruments::{InstrumentSettings, autoscript, ceos, tem};
use crate::router::{CentralRouter, ForwardSettings, RoutingTable};
use crate::transport::{FrameConnectionHandler, ListenerError, ListenerHandle, SocketListener};

/// Handle to a running server.
pub struct ServerHandle {
    local_addr: SocketAddr,
    listener: ListenerHandle,
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

impl ServerHandle {
    /// Address the server is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Bound address as an [`Endpoint`], resolving an ephemeral port.
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::from(self.local_addr)
    }

    /// Stops accepting connections and closes open ones.
    pub fn shutdown(&self) {
        self.listener.shutdown();
    }

    /// Waits for the accept loop to exit.
    ///
    /// # Errors
    ///
    /// Fails when the accept loop panicked.
    pub fn join(self) -> Result<(), ListenerError> {
        self.listener.join()
    }

    /// Shuts down and waits for the accept loop.
    ///
    /// # Errors
    ///
    /// As [`ServerHandle::join`].
    pub fn stop(self) -> Result<(), ListenerError> {
        self.shutdown();
        self.join()
    }
}

/// Serves `service` on `endpoint` with the default frame limit.
///
/// # Errors
///
/// Fails when the endpoint cannot be resolved or bound.
pub fn serve(
    endpoint: &Endpoint,
    service: Arc<dyn CommandService>,
) -> Result<ServerHandle, ListenerError> {
    serve_with_limits(endpoint, service, FrameLimits::default())
}

/// Serves `service` on `endpoint`, rejecting frames above `limits`.
///
/// # Errors
///
/// Fails when the endpoint cannot be resolved or bound.
pub fn serve_with_limits(
    endpoint: &Endpoint,
    service: Arc<dyn CommandService>,
    limits: FrameLimits,
) -> Result<ServerHandle, ListenerError> {
    let listener = SocketListener::bind(endpoint)?;
    let local_addr = listener.local_addr();
    let handler = Arc::new(FrameConnectionHandler::new(service, limits));
    let listener = listener.start(handler)?;
    Ok(ServerHandle {
        local_addr,
        listener,
    })
}

/// Builds the service for `role`.
///
/// # Errors
///
/// Fails when a command registry cannot be built.
pub fn service_for_role(
    role: ServerRole,
    config: &Config,
) -> Result<Arc<dyn CommandService>, RegistryError> {
    let settings = InstrumentSettings::from_config(config);
    Ok(match role {
        ServerRole::Central => Arc::new(CentralRouter::new(
            RoutingTable::from_spec(&config.routes),
            ForwardSettings::from_config(config),
        )?),
        ServerRole::As => Arc::new(autoscript::dispatcher(settings)?),
        ServerRole::Ceos => Arc::new(ceos::dispatcher(settings)?),
        ServerRole::Tem => Arc::new(tem::dispatcher(settings)?),
    })
}

/// Builds the service for the configured role.
///
/// # Errors
///
/// As [`service_for_role`].
pub fn build_service(config: &Config) -> Result<Arc<dyn CommandService>, RegistryError> {
    service_for_role(config.role, config)
}

/// Frame limit implied by the configured image bound.
#[must_use]
pub fn frame_limits(config: &Config) -> FrameLimits {
    FrameLimits::for_max_image_dimension(config.max_image_dimension)
}
