//! Command dispatch for instrument servers and the central router.
//!
//! A server is a [`CommandService`]: each accepted connection opens a
//! [`CommandSession`] which turns one decoded request into one [`Reply`].
//! Instrument servers use a [`Dispatcher`] over their hardware record; the
//! router wraps a dispatcher for its own commands and forwards the rest.
//!
//! ## Registration
//!
//! Handlers are registered by name into a [`CommandRegistry`] before the
//! server starts. Aliases map a second name onto the same handler:
//!
//! ```text
//! move_stage     -> handler #4
//! AS_move_stage  -> handler #4
//! ```

mod args;
mod dispatcher;
mod errors;
mod registry;

use scopelink_wire::{CommandRequest, CommandResponse, Frame};

pub use self::args::ArgReader;
pub use self::dispatcher::{Dispatcher, LIST_COMMANDS};
pub use self::errors::{DispatchError, HandlerError, RegistryError};
pub use self::registry::{CommandRegistry, Handler, HandlerId};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Outcome of handling one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A response produced locally.
    Response(CommandResponse),
    /// A response frame received from a downstream server, sent on verbatim.
    Relayed(Frame),
}

/// A server that can serve connections.
pub trait CommandService: Send + Sync + 'static {
    /// Opens the per-connection session.
    fn open_session(&self) -> Box<dyn CommandSession>;
}

/// Per-connection request handling.
pub trait CommandSession: Send {
    /// Handles one request. `frame` is the request exactly as received.
    fn handle(&mut self, request: &CommandRequest, frame: &Frame) -> Reply;
}
