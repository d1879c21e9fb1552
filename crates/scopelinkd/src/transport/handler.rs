//! Connection handler that reads request frames and writes responses.
//!
//! Each connection gets its own [`CommandSession`]. Frames are processed
//! strictly in order: a request is handled to completion and its response
//! written before the next frame is read.

use std::net::TcpStream;
use std::sync::Arc;

use tracing::{debug, warn};

use scopelink_wire::{
    CommandResponse, ErrorKind, FrameLimits, FrameReadError, FrameReader, Message, write_frame,
    write_message,
};

use crate::dispatch::{CommandService, Reply};

use super::LISTENER_TARGET;

/// Handles an accepted connection.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Serves the stream until the peer closes or a fault ends it.
    fn handle(&self, stream: TcpStream);
}

/// Serves framed requests against a [`CommandService`].
pub(crate) struct FrameConnectionHandler {
    service: Arc<dyn CommandService>,
    limits: FrameLimits,
}

impl FrameConnectionHandler {
    pub(crate) fn new(service: Arc<dyn CommandService>, limits: FrameLimits) -> Self {
        Self { service, limits }
    }

    fn serve(&self, stream: TcpStream) {
        let peer = stream
            .peer_addr()
            .map_or_else(|_| String::from("unknown"), |addr| addr.to_string());
        let mut writer = match stream.try_clone() {
            Ok(writer) => writer,
            Err(error) => {
                warn!(target: LISTENER_TARGET, %peer, %error, "failed to clone connection");
                return;
            }
        };
        let mut reader = FrameReader::new(stream, self.limits);
        let mut session = self.service.open_session();

        loop {
            let frame = match reader.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    debug!(target: LISTENER_TARGET, %peer, "client closed connection");
                    return;
                }
                Err(FrameReadError::Io(error)) => {
                    debug!(target: LISTENER_TARGET, %peer, %error, "connection read failed");
                    return;
                }
                Err(error) => {
                    reject(&mut writer, &peer, &error.to_string());
                    return;
                }
            };

            let request = match Message::from_frame(&frame) {
                Ok(Message::Request(request)) => request,
                Ok(Message::Response(response)) => {
                    let reason = format!(
                        "expected a request frame, received a {} response",
                        response.variant_name()
                    );
                    reject(&mut writer, &peer, &reason);
                    return;
                }
                Err(error) => {
                    reject(&mut writer, &peer, &error.to_string());
                    return;
                }
            };

            debug!(
                target: LISTENER_TARGET,
                %peer,
                destination = %request.destination,
                command = %request.command,
                "request received"
            );

            let written = match session.handle(&request, &frame) {
                Reply::Response(response) => {
                    write_message(&mut writer, &Message::Response(response))
                }
                Reply::Relayed(frame) => write_frame(&mut writer, &frame),
            };
            if let Err(error) = written {
                debug!(target: LISTENER_TARGET, %peer, %error, "failed to write response");
                return;
            }
        }
    }
}

impl ConnectionHandler for FrameConnectionHandler {
    fn handle(&self, stream: TcpStream) {
        self.serve(stream);
    }
}

/// Reports a protocol violation to the peer before the connection closes.
fn reject(writer: &mut TcpStream, peer: &str, reason: &str) {
    warn!(target: LISTENER_TARGET, %peer, reason, "malformed frame, closing connection");
    let response = CommandResponse::error(ErrorKind::Protocol, reason);
    if let Err(error) = write_message(writer, &Message::Response(response)) {
        debug!(target: LISTENER_TARGET, %peer, %error, "peer did not accept protocol error");
    }
}
