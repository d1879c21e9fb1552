//! TCP listener for instrument servers and the central router.
//!
//! The transport module binds to a configured endpoint, accepts connections in
//! a background thread, and hands each connection to its own worker thread.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod listener_tests;

pub use self::errors::ListenerError;
pub(crate) use self::handler::{ConnectionHandler, FrameConnectionHandler};
pub(crate) use self::listener::{ListenerHandle, SocketListener};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
