//! Error types for the client library and the command-line runtime.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use scopelink_config::Endpoint;
use scopelink_wire::ProtocolError;
use scopelinkd::dispatch::RegistryError;
use thiserror::Error;

/// Failures reported by [`crate::RoutedClient`] and the command backends.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The TCP connection could not be established.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        /// Address the client tried to reach.
        endpoint: Endpoint,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// No complete response arrived within the call timeout.
    #[error("no response from '{destination}' within {timeout:?}")]
    Timeout {
        /// Destination of the call.
        destination: String,
        /// Deadline that passed.
        timeout: Duration,
    },
    /// The connection failed while sending or receiving.
    #[error("transport failure talking to '{destination}': {source}")]
    Transport {
        /// Destination of the call.
        destination: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// The request could not be encoded or the reply violated the protocol.
    #[error("protocol violation for '{destination}': {source}")]
    Protocol {
        /// Destination of the call.
        destination: String,
        /// Underlying codec error.
        #[source]
        source: ProtocolError,
    },
    /// The peer answered with a request frame instead of a response.
    #[error("expected a response from '{destination}', received a request")]
    UnexpectedMessage {
        /// Destination of the call.
        destination: String,
    },
    /// The peer closed the connection before a full response arrived.
    #[error("connection for '{destination}' closed before a response arrived")]
    Closed {
        /// Destination of the call.
        destination: String,
    },
}

impl ClientError {
    /// Returns true when the failure came from reaching the peer at all.
    #[must_use]
    pub const fn is_unreachable(&self) -> bool {
        matches!(self, Self::Connect { .. })
    }
}

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("the destination must be provided")]
    MissingDestination,
    #[error("the command name must be provided")]
    MissingCommand,
    #[error("invalid argument '{0}': expected key=value")]
    MalformedArgument(String),
    #[error("no backend is available: {0}")]
    NoBackend(ClientError),
    #[error("failed to start the simulator: {0}")]
    Simulator(#[from] RegistryError),
    #[error("command failed: {0}")]
    Command(#[from] ClientError),
    #[error("failed to write output: {0}")]
    Output(io::Error),
}
