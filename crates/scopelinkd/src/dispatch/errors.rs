//! Error types for command registration and dispatch.
//!
//! Registration errors surface while a server builds its registry. Dispatch
//! errors never escape a connection: each one maps to an Error response with a
//! fixed [`ErrorKind`].

use thiserror::Error;

use scopelink_wire::{ArrayError, CommandResponse, ErrorKind};

/// Failures reported by command handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A required argument was not supplied.
    #[error("missing argument '{0}'")]
    MissingArgument(String),

    /// An argument was supplied with an unusable value.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    /// The simulated hardware refused the operation.
    #[error("{0}")]
    Rejected(String),

    /// A numeric payload could not be built.
    #[error(transparent)]
    Array(#[from] ArrayError),
}

impl HandlerError {
    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while building a command registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A handler was registered under a name that is already taken.
    #[error("command '{0}' is already registered")]
    DuplicateName(String),

    /// An alias name is already bound to a different handler.
    #[error("alias '{alias}' is already bound to '{existing}'")]
    ConflictingAlias { alias: String, existing: String },

    /// An alias referred to a handler that does not exist.
    #[error("no handler is registered as '{0}'")]
    UnknownHandler(String),
}

/// Failures produced while dispatching one request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No handler is registered under the command name.
    #[error("unknown command '{command}' for destination '{destination}'")]
    UnknownCommand { destination: String, command: String },

    /// The handler returned an error.
    #[error("command '{command}' failed: {source}")]
    Handler {
        command: String,
        #[source]
        source: HandlerError,
    },

    /// The handler panicked.
    #[error("command '{command}' panicked: {message}")]
    Panicked { command: String, message: String },

    /// Internal error (e.g., lock poisoned).
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl DispatchError {
    /// Error kind carried by the response for this failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownCommand { .. } => ErrorKind::UnknownCommand,
            Self::Handler { .. } | Self::Panicked { .. } | Self::Internal { .. } => {
                ErrorKind::Handler
            }
        }
    }

    /// Converts the failure into an Error response.
    #[must_use]
    pub fn to_response(&self) -> CommandResponse {
        CommandResponse::error(self.kind(), self.to_string())
    }
}
