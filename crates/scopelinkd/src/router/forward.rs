//! Downstream connections used to forward requests.

use std::io;
use std::net::TcpStream;
use std::time::{Duration, Instant};

use thiserror::Error;

use scopelink_config::{Config, Endpoint};
use scopelink_wire::{
    CommandResponse, Destination, ErrorKind, Frame, FrameLimits, FrameReadError, FrameReader,
    FrameTag, write_frame,
};

/// Timeouts and frame limits applied to downstream calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardSettings {
    /// Limit on establishing a downstream connection.
    pub connect_timeout: Duration,
    /// Deadline for writing a request and receiving its whole response.
    pub call_timeout: Duration,
    /// Frame size limit for relayed responses.
    pub limits: FrameLimits,
}

impl ForwardSettings {
    /// Reads timeouts and the image bound from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            call_timeout: config.call_timeout(),
            limits: FrameLimits::for_max_image_dimension(config.max_image_dimension),
        }
    }
}

impl Default for ForwardSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Failures while forwarding to a downstream server.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The endpoint host did not resolve.
    #[error("cannot resolve {endpoint} for destination '{destination}': {source}")]
    Resolve {
        destination: Destination,
        endpoint: Endpoint,
        #[source]
        source: io::Error,
    },

    /// The downstream server refused or dropped the connection attempt.
    #[error("cannot connect to '{destination}' at {endpoint}: {source}")]
    Connect {
        destination: Destination,
        endpoint: Endpoint,
        #[source]
        source: io::Error,
    },

    /// The downstream server did not answer in time.
    #[error("destination '{destination}' at {endpoint} did not answer within {timeout:?}")]
    Timeout {
        destination: Destination,
        endpoint: Endpoint,
        timeout: Duration,
    },

    /// The downstream connection failed mid-call.
    #[error("connection to '{destination}' failed: {source}")]
    Io {
        destination: Destination,
        #[source]
        source: io::Error,
    },

    /// The downstream server closed before answering.
    #[error("destination '{destination}' closed the connection before answering")]
    Closed { destination: Destination },

    /// The downstream server sent bytes that are not a valid response frame.
    #[error("destination '{destination}' sent an invalid response: {reason}")]
    InvalidResponse {
        destination: Destination,
        reason: String,
    },
}

impl ForwardError {
    /// Error kind carried by the response for this failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout { .. } => ErrorKind::Timeout,
            _ => ErrorKind::Connection,
        }
    }

    /// Converts the failure into an Error response.
    #[must_use]
    pub fn to_response(&self) -> CommandResponse {
        CommandResponse::error(self.kind(), self.to_string())
    }
}

/// One open connection to a downstream server.
#[derive(Debug)]
pub(crate) struct DownstreamLink {
    endpoint: Endpoint,
    reader: FrameReader<TcpStream>,
    writer: TcpStream,
}

impl DownstreamLink {
    pub(crate) fn open(
        destination: &Destination,
        endpoint: &Endpoint,
        settings: &ForwardSettings,
    ) -> Result<Self, ForwardError> {
        let addr = endpoint.resolve().map_err(|source| ForwardError::Resolve {
            destination: destination.clone(),
            endpoint: endpoint.clone(),
            source,
        })?;
        let stream = TcpStream::connect_timeout(&addr, settings.connect_timeout).map_err(|source| {
            if is_timeout(&source) {
                ForwardError::Timeout {
                    destination: destination.clone(),
                    endpoint: endpoint.clone(),
                    timeout: settings.connect_timeout,
                }
            } else {
                ForwardError::Connect {
                    destination: destination.clone(),
                    endpoint: endpoint.clone(),
                    source,
                }
            }
        })?;
        let writer = stream
            .set_nodelay(true)
            .and_then(|()| stream.try_clone())
            .map_err(|source| ForwardError::Io {
                destination: destination.clone(),
                source,
            })?;
        Ok(Self {
            endpoint: endpoint.clone(),
            reader: FrameReader::new(stream, settings.limits),
            writer,
        })
    }

    pub(crate) const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Sends `request` and waits for the response frame.
    ///
    /// The call timeout is a deadline for the whole exchange, so a slow
    /// trickle of bytes still times out.
    pub(crate) fn exchange(
        &mut self,
        destination: &Destination,
        request: &Frame,
        settings: &ForwardSettings,
    ) -> Result<Frame, ForwardError> {
        let deadline = Instant::now() + settings.call_timeout;
        let timeout = || ForwardError::Timeout {
            destination: destination.clone(),
            endpoint: self.endpoint.clone(),
            timeout: settings.call_timeout,
        };
        let written = self
            .writer
            .set_write_timeout(Some(settings.call_timeout))
            .and_then(|()| write_frame(&mut self.writer, request));
        if let Err(source) = written {
            return Err(if is_timeout(&source) {
                timeout()
            } else {
                ForwardError::Io {
                    destination: destination.clone(),
                    source,
                }
            });
        }
        match self.reader.read_frame_before(deadline) {
            Ok(Some(frame)) if frame.tag() == FrameTag::Request => {
                Err(ForwardError::InvalidResponse {
                    destination: destination.clone(),
                    reason: String::from("received a request frame"),
                })
            }
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => Err(ForwardError::Closed {
                destination: destination.clone(),
            }),
            Err(error) if error.is_timeout() => Err(timeout()),
            Err(FrameReadError::Io(source)) => Err(ForwardError::Io {
                destination: destination.clone(),
                source,
            }),
            Err(FrameReadError::Truncated { .. }) => Err(ForwardError::Closed {
                destination: destination.clone(),
            }),
            Err(error) => Err(ForwardError::InvalidResponse {
                destination: destination.clone(),
                reason: error.to_string(),
            }),
        }
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}
