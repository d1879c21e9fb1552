//! Central router serving the reserved "Central" destination.
//!
//! Requests addressed to "Central" run against the router's own registry
//! (`set_routing_table`, `get_routing_table`, `list_commands`). Every other
//! request is looked up in the routing table and its frame is forwarded
//! verbatim; the downstream response frame is relayed unmodified.
//!
//! Downstream connections belong to the upstream connection's session. A
//! link is reused while the destination's endpoint stays the same and is
//! dropped after any failure, so the next request reconnects.

mod forward;
mod table;

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use scopelink_wire::{Args, CENTRAL, CommandRequest, CommandResponse, Destination, ErrorKind, Frame};

use crate::dispatch::{
    CommandRegistry, CommandService, CommandSession, DispatchError, Dispatcher, HandlerError,
    RegistryError, Reply,
};

pub use self::forward::{ForwardError, ForwardSettings};
pub use self::table::{RoutingTable, TableUpdate};

use self::forward::DownstreamLink;

/// Tracing target for router operations.
pub(crate) const ROUTER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::router");

/// Builds the registry of the router's own commands.
///
/// # Errors
///
/// Fails only if two handlers collide on a name.
pub fn registry() -> Result<CommandRegistry<RoutingTable>, RegistryError> {
    let mut registry = CommandRegistry::new();
    registry.register("set_routing_table", set_routing_table)?;
    registry.register("get_routing_table", get_routing_table)?;
    Ok(registry)
}

fn set_routing_table(table: &mut RoutingTable, args: &Args) -> Result<CommandResponse, HandlerError> {
    let TableUpdate {
        table: replacement,
        ignored,
    } = RoutingTable::from_args(args)?;
    *table = replacement;
    debug!(target: ROUTER_TARGET, size = table.len(), "routing table replaced");
    let mut body = describe(table);
    if !ignored.is_empty() {
        body.insert("ignored".into(), Value::from(ignored));
    }
    Ok(CommandResponse::Structured(body))
}

fn get_routing_table(table: &mut RoutingTable, _args: &Args) -> Result<CommandResponse, HandlerError> {
    Ok(CommandResponse::Structured(describe(table)))
}

/// Error response for a destination with no route.
#[must_use]
pub fn unknown_destination(destination: &Destination) -> CommandResponse {
    CommandResponse::error(
        ErrorKind::UnknownDestination,
        format!("no route for destination '{destination}'"),
    )
}

fn describe(table: &RoutingTable) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("size".into(), Value::from(table.len()));
    body.insert("routes".into(), Value::Object(table.to_json()));
    body
}

/// The central router service.
#[derive(Debug, Clone)]
pub struct CentralRouter {
    control: Dispatcher<RoutingTable>,
    settings: ForwardSettings,
}

impl CentralRouter {
    /// Creates a router starting from `initial`.
    ///
    /// # Errors
    ///
    /// Fails only if the router's own registry cannot be built.
    pub fn new(initial: RoutingTable, settings: ForwardSettings) -> Result<Self, RegistryError> {
        Ok(Self {
            control: Dispatcher::new(CENTRAL, registry()?, initial),
            settings,
        })
    }

    /// Snapshot of the current routing table.
    ///
    /// # Errors
    ///
    /// Fails when the table lock is poisoned.
    pub fn routing_table(&self) -> Result<RoutingTable, DispatchError> {
        self.control.with_state(RoutingTable::clone)
    }

    /// Forwarding timeouts and limits.
    #[must_use]
    pub const fn settings(&self) -> &ForwardSettings {
        &self.settings
    }
}

impl CommandService for CentralRouter {
    fn open_session(&self) -> Box<dyn CommandSession> {
        Box::new(RouterSession {
            control: self.control.clone(),
            settings: self.settings,
            links: HashMap::new(),
        })
    }
}

/// Router state for one upstream connection.
struct RouterSession {
    control: Dispatcher<RoutingTable>,
    settings: ForwardSettings,
    links: HashMap<Destination, DownstreamLink>,
}

impl RouterSession {
    fn forward(&mut self, request: &CommandRequest, frame: &Frame) -> Reply {
        let destination = &request.destination;
        let endpoint = match self
            .control
            .with_state(|table| table.lookup(destination).cloned())
        {
            Ok(Some(endpoint)) => endpoint,
            Ok(None) => {
                debug!(target: ROUTER_TARGET, %destination, "no route for destination");
                return Reply::Response(unknown_destination(destination));
            }
            Err(error) => return Reply::Response(error.to_response()),
        };

        if self
            .links
            .get(destination)
            .is_some_and(|link| link.endpoint() != &endpoint)
        {
            debug!(target: ROUTER_TARGET, %destination, %endpoint, "route changed, reconnecting");
            self.links.remove(destination);
        }

        let result = match self.links.remove(destination) {
            Some(link) => Ok(link),
            None => DownstreamLink::open(destination, &endpoint, &self.settings),
        }
        .and_then(|mut link| {
            link.exchange(destination, frame, &self.settings)
                .map(|response| (link, response))
        });

        match result {
            Ok((link, response)) => {
                self.links.insert(destination.clone(), link);
                debug!(
                    target: ROUTER_TARGET,
                    %destination,
                    command = %request.command,
                    "response relayed"
                );
                Reply::Relayed(response)
            }
            Err(error) => {
                warn!(
                    target: ROUTER_TARGET,
                    %destination,
                    command = %request.command,
                    %error,
                    "forward failed"
                );
                Reply::Response(error.to_response())
            }
        }
    }
}

impl CommandSession for RouterSession {
    fn handle(&mut self, request: &CommandRequest, frame: &Frame) -> Reply {
        if request.destination.is_central() {
            return Reply::Response(self.control.dispatch(&request.command, &request.args));
        }
        self.forward(request, frame)
    }
}
