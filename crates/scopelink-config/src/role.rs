use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::defaults::{DEFAULT_AS_PORT, DEFAULT_CENTRAL_PORT, DEFAULT_CEOS_PORT, DEFAULT_TEM_PORT};

/// Which server a `scopelinkd` process hosts.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ServerRole {
    /// The central router.
    #[default]
    Central,
    /// The AutoScript microscope twin.
    As,
    /// The aberration corrector twin.
    Ceos,
    /// The transmission microscope object served to direct proxies.
    Tem,
}

impl ServerRole {
    /// Every role, in port order.
    pub const ALL: [Self; 4] = [Self::Central, Self::As, Self::Ceos, Self::Tem];

    /// Destination name the role answers to on the wire.
    #[must_use]
    pub const fn destination(self) -> &'static str {
        match self {
            Self::Central => "Central",
            Self::As => "AS",
            Self::Ceos => "Ceos",
            Self::Tem => "TEM",
        }
    }

    /// Port used when configuration does not name one.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Central => DEFAULT_CENTRAL_PORT,
            Self::As => DEFAULT_AS_PORT,
            Self::Ceos => DEFAULT_CEOS_PORT,
            Self::Tem => DEFAULT_TEM_PORT,
        }
    }

    /// Finds the role serving `destination`, if any.
    #[must_use]
    pub fn for_destination(destination: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.destination() == destination)
    }
}

/// How the client reaches instrument servers.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BackendMode {
    /// Try routed, then direct, then fall back to the simulator.
    #[default]
    Auto,
    /// Use the central router only.
    Routed,
    /// Talk to one server object by URI.
    Direct,
    /// Run the instrument twins in-process.
    Simulator,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("central", ServerRole::Central)]
    #[case("AS", ServerRole::As)]
    #[case("ceos", ServerRole::Ceos)]
    #[case("TEM", ServerRole::Tem)]
    fn roles_parse_case_insensitively(#[case] input: &str, #[case] expected: ServerRole) {
        assert_eq!(input.parse::<ServerRole>().ok(), Some(expected));
    }

    #[test]
    fn destinations_map_back_to_roles() {
        for role in ServerRole::ALL {
            assert_eq!(ServerRole::for_destination(role.destination()), Some(role));
        }
        assert_eq!(ServerRole::for_destination("as"), None);
    }
}
