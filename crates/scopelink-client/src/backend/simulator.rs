use scopelink_config::{Config, ServerRole};
use scopelink_wire::{Args, CommandResponse, Destination, ErrorKind};
use scopelinkd::dispatch::{Dispatcher, RegistryError};
use scopelinkd::instruments::autoscript::{self, MicroscopeState};
use scopelinkd::instruments::ceos::{self, CorrectorState};
use scopelinkd::instruments::tem::{self, TemState};
use scopelinkd::instruments::InstrumentSettings;
use scopelinkd::router::{self, RoutingTable};

use crate::errors::ClientError;

use super::CommandBackend;

/// Backend that runs every instrument profile in-process.
///
/// No sockets are involved: each destination maps to its own dispatcher,
/// so state persists across calls exactly as it would on a real server.
/// "AS" and "Ceos" answer only while the simulated routing table names
/// them, so `set_routing_table` behaves as it does on the router. "TEM" is
/// the direct-proxy object and is always reachable.
#[derive(Debug, Clone)]
pub struct Simulator {
    central: Dispatcher<RoutingTable>,
    microscope: Dispatcher<MicroscopeState>,
    corrector: Dispatcher<CorrectorState>,
    tem: Dispatcher<TemState>,
}

impl Simulator {
    /// Builds the in-process profiles with `routes` as the initial table.
    ///
    /// # Errors
    ///
    /// Fails if a profile's registry cannot be built.
    pub fn new(settings: InstrumentSettings, routes: RoutingTable) -> Result<Self, RegistryError> {
        Ok(Self {
            central: Dispatcher::new(ServerRole::Central.destination(), router::registry()?, routes),
            microscope: autoscript::dispatcher(settings)?,
            corrector: ceos::dispatcher(settings)?,
            tem: tem::dispatcher(settings)?,
        })
    }

    /// Builds the profiles using the configured image bound, latency and
    /// routes.
    ///
    /// # Errors
    ///
    /// As [`Simulator::new`].
    pub fn from_config(config: &Config) -> Result<Self, RegistryError> {
        Self::new(
            InstrumentSettings::from_config(config),
            RoutingTable::from_spec(&config.routes),
        )
    }

    fn routed(&self, name: &Destination, command: &str, args: &Args) -> CommandResponse {
        match self.central.with_state(|table| table.lookup(name).is_some()) {
            Err(error) => error.to_response(),
            Ok(false) => router::unknown_destination(name),
            Ok(true) => match ServerRole::for_destination(name.as_str()) {
                Some(ServerRole::As) => self.microscope.dispatch(command, args),
                Some(ServerRole::Ceos) => self.corrector.dispatch(command, args),
                _ => CommandResponse::error(
                    ErrorKind::Connection,
                    format!("no simulated server for destination '{name}'"),
                ),
            },
        }
    }
}

impl CommandBackend for Simulator {
    fn name(&self) -> &'static str {
        "simulator"
    }

    fn send_command(
        &mut self,
        destination: &str,
        command: &str,
        args: Option<Args>,
    ) -> Result<CommandResponse, ClientError> {
        let name = Destination::new(destination).map_err(|source| ClientError::Protocol {
            destination: destination.to_owned(),
            source,
        })?;
        let args = args.unwrap_or_default();
        let response = match ServerRole::for_destination(name.as_str()) {
            Some(ServerRole::Central) => self.central.dispatch(command, &args),
            Some(ServerRole::Tem) => self.tem.dispatch(command, &args),
            _ => self.routed(&name, command, &args),
        };
        Ok(response)
    }
}
