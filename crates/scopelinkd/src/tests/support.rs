//! Shared helpers for server tests.

use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use scopelink_config::Endpoint;
use scopelink_wire::{
    Args, CommandRequest, CommandResponse, Destination, FrameLimits, FrameReader, Message,
    write_message,
};

use crate::dispatch::CommandService;
use crate::server::{ServerHandle, serve};

/// Starts `service` on an ephemeral loopback port.
pub(crate) fn start(service: Arc<dyn CommandService>) -> ServerHandle {
    serve(&Endpoint::new("127.0.0.1", 0), service).expect("serve on ephemeral port")
}

/// Converts a JSON object literal into command arguments.
pub(crate) fn args(value: Value) -> Args {
    match value {
        Value::Object(map) => map,
        Value::Null => Args::new(),
        other => panic!("arguments must be an object, got {other}"),
    }
}

/// Blocking frame client used to drive servers in tests.
pub(crate) struct TestClient {
    reader: FrameReader<TcpStream>,
    writer: TcpStream,
}

impl TestClient {
    pub(crate) fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).expect("connect to test server");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("set read timeout");
        let writer = stream.try_clone().expect("clone stream");
        Self {
            reader: FrameReader::new(stream, FrameLimits::default()),
            writer,
        }
    }

    pub(crate) fn call(
        &mut self,
        destination: &str,
        command: &str,
        arguments: Value,
    ) -> CommandResponse {
        let request = CommandRequest::new(
            Destination::new(destination).expect("destination"),
            command,
        )
        .with_args(args(arguments));
        write_message(&mut self.writer, &Message::Request(request)).expect("write request");
        self.read_response().expect("response before close")
    }

    pub(crate) fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).expect("write raw bytes");
        self.writer.flush().expect("flush");
    }

    pub(crate) fn read_response(&mut self) -> Option<CommandResponse> {
        match self.reader.read_message().expect("read response") {
            Some(Message::Response(response)) => Some(response),
            Some(Message::Request(request)) => panic!("server sent a request: {request:?}"),
            None => None,
        }
    }

    /// Returns true once the server has closed the connection.
    pub(crate) fn is_closed(&mut self) -> bool {
        matches!(self.reader.read_frame(), Ok(None) | Err(_))
    }
}

pub(crate) fn text(response: &CommandResponse) -> &str {
    match response {
        CommandResponse::Text(text) => text,
        other => panic!("expected text, got {other:?}"),
    }
}

pub(crate) fn error_message(response: &CommandResponse) -> &str {
    match response {
        CommandResponse::Error { message, .. } => message,
        other => panic!("expected error, got {other:?}"),
    }
}
