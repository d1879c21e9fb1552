//! Routed client: one connection per destination, all entering through the
//! central router unless direct routing is switched on.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use scopelink_config::{Endpoint, RouteTableSpec};
use scopelink_wire::{Args, CommandRequest, CommandResponse, Destination};
use scopelinkd::router::RoutingTable;
use serde_json::json;
use tracing::{debug, warn};

use crate::CLIENT_TARGET;
use crate::errors::ClientError;
use crate::link::{ClientSettings, Link};

/// Command the router uses to replace its routing table.
pub const SET_ROUTING_TABLE: &str = "set_routing_table";

/// Encodes configured routes as `set_routing_table` arguments.
#[must_use]
pub fn routes_to_args(routes: &RouteTableSpec) -> Args {
    routes
        .entries()
        .iter()
        .map(|(name, endpoint)| (name.clone(), json!([endpoint.host(), endpoint.port()])))
        .collect()
}

/// Blocking client that sends commands through an entry point.
///
/// Each destination gets its own connection, opened on first use and reused
/// until a transport failure invalidates it. Calls are strictly sequential:
/// a request is written and its response awaited before the call returns.
///
/// When direct routing is enabled, destinations named in the last routing
/// table accepted by the router are contacted at their own endpoints instead
/// of through the entry point.
#[derive(Debug)]
pub struct RoutedClient {
    entry: Endpoint,
    settings: ClientSettings,
    direct_routing: bool,
    routes: RoutingTable,
    links: HashMap<Destination, Link>,
}

impl RoutedClient {
    /// Connects to the entry point at `host:port` with default settings.
    ///
    /// # Errors
    ///
    /// Fails with [`ClientError::Connect`] when the entry point is unreachable.
    pub fn connect(host: &str, port: u16) -> Result<Self, ClientError> {
        Self::connect_with(Endpoint::new(host, port), ClientSettings::default())
    }

    /// Connects to `entry` using `settings`.
    ///
    /// # Errors
    ///
    /// Fails with [`ClientError::Connect`] when the entry point is unreachable.
    pub fn connect_with(entry: Endpoint, settings: ClientSettings) -> Result<Self, ClientError> {
        let link = Link::open(&entry, &settings)?;
        debug!(target: CLIENT_TARGET, %entry, "connected to entry point");
        let mut links = HashMap::new();
        links.insert(Destination::central(), link);
        Ok(Self {
            entry,
            settings,
            direct_routing: false,
            routes: RoutingTable::new(),
            links,
        })
    }

    /// Contacts routed destinations at their own endpoints.
    #[must_use]
    pub const fn with_direct_routing(mut self, enabled: bool) -> Self {
        self.direct_routing = enabled;
        self
    }

    /// The entry point every unrouted destination goes through.
    #[must_use]
    pub const fn entry_point(&self) -> &Endpoint {
        &self.entry
    }

    /// The routing table last accepted by the router through this client.
    #[must_use]
    pub const fn routing_table(&self) -> &RoutingTable {
        &self.routes
    }

    /// Returns true when a connection for `destination` is open.
    #[must_use]
    pub fn has_link(&self, destination: &str) -> bool {
        Destination::new(destination).is_ok_and(|name| self.links.contains_key(&name))
    }

    /// Sends one command and waits for its response.
    ///
    /// Server-side failures come back as [`CommandResponse::Error`]; only
    /// failures to complete the exchange are returned as errors. A failed
    /// exchange closes the destination's connection so that the next call
    /// reconnects. Nothing is retried.
    ///
    /// # Errors
    ///
    /// Fails when the connection cannot be opened, the call times out, the
    /// connection breaks, or the reply is not a valid response frame.
    pub fn send_command(
        &mut self,
        destination: &str,
        command: &str,
        args: Option<Args>,
    ) -> Result<CommandResponse, ClientError> {
        let destination =
            Destination::new(destination).map_err(|source| ClientError::Protocol {
                destination: destination.to_owned(),
                source,
            })?;
        let args = args.unwrap_or_default();
        let table_update = (destination.is_central() && command == SET_ROUTING_TABLE)
            .then(|| RoutingTable::from_args(&args).ok())
            .flatten();
        let request = CommandRequest::new(destination.clone(), command).with_args(args);

        let result = self.exchange(&destination, request);
        match &result {
            Ok(response) if !response.is_error() => {
                if let Some(update) = table_update {
                    debug!(
                        target: CLIENT_TARGET,
                        size = update.table.len(),
                        "cached routing table"
                    );
                    self.routes = update.table;
                }
            }
            Ok(_) => {}
            Err(error) => {
                warn!(
                    target: CLIENT_TARGET,
                    %destination,
                    command,
                    %error,
                    "call failed, closing connection"
                );
                self.links.remove(&destination);
            }
        }
        result
    }

    /// Closes every open connection.
    pub fn disconnect(&mut self) {
        self.links.clear();
    }

    fn endpoint_for(&self, destination: &Destination) -> Endpoint {
        if self.direct_routing
            && !destination.is_central()
            && let Some(endpoint) = self.routes.lookup(destination)
        {
            return endpoint.clone();
        }
        self.entry.clone()
    }

    fn exchange(
        &mut self,
        destination: &Destination,
        request: CommandRequest,
    ) -> Result<CommandResponse, ClientError> {
        let endpoint = self.endpoint_for(destination);
        let link = match self.links.entry(destination.clone()) {
            Entry::Occupied(entry) if entry.get().endpoint() == &endpoint => entry.into_mut(),
            Entry::Occupied(mut entry) => {
                entry.insert(Link::open(&endpoint, &self.settings)?);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(Link::open(&endpoint, &self.settings)?),
        };
        link.call(request, &self.settings)
    }
}
