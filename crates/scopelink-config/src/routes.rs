use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::endpoint::{Endpoint, EndpointParseError};

/// Destination to endpoint pairs as written in configuration.
///
/// The textual form is a comma separated list of `NAME=endpoint` entries, for
/// example `AS=tcp://127.0.0.1:9001,Ceos=tcp://127.0.0.1:9003`. Order is
/// preserved; later duplicates override earlier ones when applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTableSpec {
    entries: Vec<(String, Endpoint)>,
}

impl RouteTableSpec {
    /// Builds a spec from explicit entries.
    #[must_use]
    pub fn new(entries: Vec<(String, Endpoint)>) -> Self {
        Self { entries }
    }

    /// Returns the configured entries in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[(String, Endpoint)] {
        &self.entries
    }

    /// Looks up the endpoint configured for `name`.
    #[must_use]
    pub fn endpoint_for(&self, name: &str) -> Option<&Endpoint> {
        self.entries
            .iter()
            .rev()
            .find(|(entry, _)| entry == name)
            .map(|(_, endpoint)| endpoint)
    }

    /// Returns true when no routes are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for RouteTableSpec {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, endpoint) in &self.entries {
            if !first {
                formatter.write_str(",")?;
            }
            first = false;
            write!(formatter, "{name}={endpoint}")?;
        }
        Ok(())
    }
}

impl FromStr for RouteTableSpec {
    type Err = RouteSpecParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut entries = Vec::new();
        for item in input.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            let (name, endpoint) = item
                .split_once('=')
                .ok_or_else(|| RouteSpecParseError::MissingSeparator(item.to_owned()))?;
            let name = name.trim();
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                return Err(RouteSpecParseError::InvalidName(name.to_owned()));
            }
            let endpoint = endpoint
                .parse::<Endpoint>()
                .map_err(|source| RouteSpecParseError::Endpoint {
                    name: name.to_owned(),
                    source,
                })?;
            entries.push((name.to_owned(), endpoint));
        }
        Ok(Self { entries })
    }
}

impl Serialize for RouteTableSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RouteTableSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors encountered while parsing a [`RouteTableSpec`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouteSpecParseError {
    /// An entry lacked the `=` separator.
    #[error("route entry '{0}' must look like NAME=tcp://host:port")]
    MissingSeparator(String),
    /// The destination name was blank or contained whitespace.
    #[error("invalid destination name '{0}'")]
    InvalidName(String),
    /// The endpoint half of an entry failed to parse.
    #[error("invalid endpoint for '{name}': {source}")]
    Endpoint {
        /// Destination the endpoint belonged to.
        name: String,
        /// Underlying parse failure.
        #[source]
        source: EndpointParseError,
    },
}
