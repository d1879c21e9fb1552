//! Symbolic server names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Name reserved for the central router.
pub const CENTRAL: &str = "Central";

/// Short symbolic name addressing one instrument server (`AS`, `Ceos`, ...).
///
/// Names are non-empty and contain no whitespace. Comparison is
/// case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Destination(String);

impl Destination {
    /// Validates and wraps a destination name.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidDestination`] for blank names or names
    /// containing whitespace.
    pub fn new(name: impl Into<String>) -> Result<Self, ProtocolError> {
        let name = name.into();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(ProtocolError::InvalidDestination(name));
        }
        Ok(Self(name))
    }

    /// The reserved router destination.
    #[must_use]
    pub fn central() -> Self {
        Self(CENTRAL.to_owned())
    }

    /// Returns true for the reserved router destination.
    #[must_use]
    pub fn is_central(&self) -> bool {
        self.0 == CENTRAL
    }

    /// Borrowed name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl FromStr for Destination {
    type Err = ProtocolError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::new(input)
    }
}

impl TryFrom<String> for Destination {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Destination> for String {
    fn from(value: Destination) -> Self {
        value.0
    }
}

impl AsRef<str> for Destination {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
