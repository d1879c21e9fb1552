//! One blocking request/response connection to a server.

use std::io;
use std::net::TcpStream;
use std::time::{Duration, Instant};

use scopelink_config::{Config, Endpoint};
use scopelink_wire::{
    CommandRequest, CommandResponse, FrameLimits, FrameReadError, FrameReader, Message,
    write_frame,
};

use crate::errors::ClientError;

/// Timeouts and frame limits applied to client calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSettings {
    /// Limit on establishing a connection.
    pub connect_timeout: Duration,
    /// Deadline for writing a request and receiving its whole response.
    pub call_timeout: Duration,
    /// Frame size limit for responses.
    pub limits: FrameLimits,
}

impl ClientSettings {
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

impl Default for ClientSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Debug)]
pub(crate) struct Link {
    endpoint: Endpoint,
    reader: FrameReader<TcpStream>,
    writer: TcpStream,
}

impl Link {
    pub(crate) fn open(endpoint: &Endpoint, settings: &ClientSettings) -> Result<Self, ClientError> {
        let connect_error = |source| ClientError::Connect {
            endpoint: endpoint.clone(),
            source,
        };
        let addr = endpoint.resolve().map_err(connect_error)?;
        let stream =
            TcpStream::connect_timeout(&addr, settings.connect_timeout).map_err(connect_error)?;
        configure(&stream).map_err(connect_error)?;
        let writer = stream.try_clone().map_err(connect_error)?;
        Ok(Self {
            endpoint: endpoint.clone(),
            reader: FrameReader::new(stream, settings.limits),
            writer,
        })
    }

    pub(crate) const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Writes one request and blocks for its response.
    ///
    /// `settings.call_timeout` bounds the whole exchange, not each read.
    pub(crate) fn call(
        &mut self,
        request: CommandRequest,
        settings: &ClientSettings,
    ) -> Result<CommandResponse, ClientError> {
        let deadline = Instant::now() + settings.call_timeout;
        let destination = request.destination.to_string();
        let frame = Message::Request(request)
            .to_frame()
            .map_err(|source| ClientError::Protocol {
                destination: destination.clone(),
                source,
            })?;
        let written = self
            .writer
            .set_write_timeout(Some(settings.call_timeout))
            .and_then(|()| write_frame(&mut self.writer, &frame));
        if let Err(source) = written {
            return Err(if is_timeout(&source) {
                ClientError::Timeout {
                    destination,
                    timeout: settings.call_timeout,
                }
            } else {
                ClientError::Transport {
                    destination,
                    source,
                }
            });
        }
        match self.reader.read_message_before(deadline) {
            Ok(Some(Message::Response(response))) => Ok(response),
            Ok(Some(Message::Request(_))) => Err(ClientError::UnexpectedMessage { destination }),
            Ok(None) | Err(FrameReadError::Truncated { .. }) => {
                Err(ClientError::Closed { destination })
            }
            Err(error) if error.is_timeout() => Err(ClientError::Timeout {
                destination,
                timeout: settings.call_timeout,
            }),
            Err(FrameReadError::Io(source)) => Err(ClientError::Transport {
                destination,
                source,
            }),
            Err(FrameReadError::Protocol(source)) => Err(ClientError::Protocol {
                destination,
                source,
            }),
        }
    }
}

fn configure(stream: &TcpStream) -> io::Result<()> {
    stream.set_nodelay(true)
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}
