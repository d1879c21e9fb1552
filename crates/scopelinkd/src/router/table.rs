//! Destination to endpoint mapping held by the central router.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde_json::{Map, Value};

use scopelink_config::{Endpoint, RouteTableSpec};
use scopelink_wire::{Args, Destination};

use crate::dispatch::HandlerError;

/// Routing table keyed by destination.
///
/// The reserved "Central" destination is never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    routes: BTreeMap<Destination, Endpoint>,
}

/// A parsed `set_routing_table` argument mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableUpdate {
    /// The replacement table.
    pub table: RoutingTable,
    /// Submitted names that were dropped because they are reserved.
    pub ignored: Vec<String>,
}

impl RoutingTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from configured routes, skipping reserved names.
    #[must_use]
    pub fn from_spec(spec: &RouteTableSpec) -> Self {
        let routes = spec
            .entries()
            .iter()
            .filter_map(|(name, endpoint)| {
                let destination = Destination::new(name.as_str()).ok()?;
                (!destination.is_central()).then(|| (destination, endpoint.clone()))
            })
            .collect();
        Self { routes }
    }

    /// Parses the argument mapping of a `set_routing_table` request.
    ///
    /// Each value may be `[host, port]`, `{"host": .., "port": ..}`,
    /// `"tcp://host:port"`, or `"host:port"`.
    ///
    /// # Errors
    ///
    /// Fails when a name is not a valid destination or a value is not an
    /// endpoint.
    pub fn from_args(args: &Args) -> Result<TableUpdate, HandlerError> {
        let mut routes = BTreeMap::new();
        let mut ignored = Vec::new();
        for (name, value) in args {
            let destination = Destination::new(name.as_str())
                .map_err(|error| HandlerError::invalid(name, error.to_string()))?;
            if destination.is_central() {
                ignored.push(name.clone());
                continue;
            }
            routes.insert(destination, endpoint_from_value(name, value)?);
        }
        Ok(TableUpdate {
            table: Self { routes },
            ignored,
        })
    }

    /// Endpoint registered for `destination`.
    #[must_use]
    pub fn lookup(&self, destination: &Destination) -> Option<&Endpoint> {
        self.routes.get(destination)
    }

    /// Number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true when no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterates routes in destination order.
    pub fn iter(&self) -> impl Iterator<Item = (&Destination, &Endpoint)> {
        self.routes.iter()
    }

    /// Routes as `{"AS": ["127.0.0.1", 9001], ...}`.
    #[must_use]
    pub fn to_json(&self) -> Map<String, Value> {
        self.routes
            .iter()
            .map(|(destination, endpoint)| {
                (
                    destination.to_string(),
                    Value::from(vec![
                        Value::from(endpoint.host()),
                        Value::from(endpoint.port()),
                    ]),
                )
            })
            .collect()
    }
}

fn endpoint_from_value(name: &str, value: &Value) -> Result<Endpoint, HandlerError> {
    let invalid = |reason: String| HandlerError::invalid(name, reason);
    match value {
        Value::String(text) => {
            Endpoint::from_str(text).map_err(|error| invalid(error.to_string()))
        }
        Value::Array(parts) => match parts.as_slice() {
            [host, port] => endpoint_from_parts(host, port).map_err(invalid),
            _ => Err(invalid(String::from("expected [host, port]"))),
        },
        Value::Object(fields) => match (fields.get("host"), fields.get("port")) {
            (Some(host), Some(port)) => endpoint_from_parts(host, port).map_err(invalid),
            _ => Err(invalid(String::from("expected host and port fields"))),
        },
        _ => Err(invalid(format!("expected an endpoint, got {value}"))),
    }
}

fn endpoint_from_parts(host: &Value, port: &Value) -> Result<Endpoint, String> {
    let host = host
        .as_str()
        .filter(|host| !host.trim().is_empty())
        .ok_or_else(|| String::from("host must be a non-empty string"))?;
    let port = match port {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }
    .and_then(|port| u16::try_from(port).ok())
    .ok_or_else(|| format!("port must be between 0 and 65535, got {port}"))?;
    Ok(Endpoint::new(host, port))
}
