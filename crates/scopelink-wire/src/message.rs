//! Request and response types carried inside frames.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString, IntoStaticStr};

use crate::array::ArrayPayload;
use crate::destination::Destination;

/// Argument mapping attached to a command.
pub type Args = Map<String, Value>;

/// A named command addressed to one destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Server the command is meant for.
    pub destination: Destination,
    /// Command name, matched case-sensitively.
    pub command: String,
    /// Named arguments; absent means empty.
    #[serde(default)]
    pub args: Args,
}

impl CommandRequest {
    /// Builds a request with no arguments.
    #[must_use]
    pub fn new(destination: Destination, command: impl Into<String>) -> Self {
        Self {
            destination,
            command: command.into(),
            args: Args::new(),
        }
    }

    /// Replaces the argument mapping.
    #[must_use]
    pub fn with_args(mut self, args: Args) -> Self {
        self.args = args;
        self
    }
}

/// Category of an error response.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The peer sent bytes that violate the framing protocol.
    Protocol,
    /// No handler is registered under the command name.
    UnknownCommand,
    /// The router has no route for the destination.
    UnknownDestination,
    /// A handler failed while executing.
    Handler,
    /// A downstream connection could not be established or broke.
    Connection,
    /// A downstream call did not answer in time.
    Timeout,
}

/// The outcome of one command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResponse {
    /// Human-readable confirmation or status text.
    Text(String),
    /// A JSON object of named values.
    Structured(Map<String, Value>),
    /// A shaped numeric block such as an image or coordinate vector.
    Array(ArrayPayload),
    /// A failure reported by the server.
    Error {
        /// Failure category.
        kind: ErrorKind,
        /// Description naming the offending command, destination, or fault.
        message: String,
    },
}

impl CommandResponse {
    /// Builds a text response.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Builds an error response.
    #[must_use]
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            message: message.into(),
        }
    }

    /// Returns the error kind for error responses.
    #[must_use]
    pub const fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Error { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Returns true for error responses.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Short variant label for logs.
    #[must_use]
    pub const fn variant_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Structured(_) => "structured",
            Self::Array(_) => "array",
            Self::Error { .. } => "error",
        }
    }
}

/// JSON shape of an error payload.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ErrorBody {
    pub(crate) kind: ErrorKind,
    pub(crate) message: String,
}

/// Either direction of traffic on a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Client to server.
    Request(CommandRequest),
    /// Server to client.
    Response(CommandResponse),
}

impl From<CommandRequest> for Message {
    fn from(value: CommandRequest) -> Self {
        Self::Request(value)
    }
}

impl From<CommandResponse> for Message {
    fn from(value: CommandResponse) -> Self {
        Self::Response(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_args_default_to_empty() {
        let request: CommandRequest =
            serde_json::from_str(r#"{"destination":"AS","command":"get_stage"}"#)
                .expect("request parses");
        assert!(request.args.is_empty());
        assert_eq!(request.destination.as_str(), "AS");
    }

    #[test]
    fn error_kinds_use_snake_case() {
        assert_eq!(ErrorKind::UnknownDestination.to_string(), "unknown_destination");
        let json = serde_json::to_string(&ErrorKind::UnknownCommand).expect("serialise");
        assert_eq!(json, "\"unknown_command\"");
    }
}
