//! Executes commands against a server's shared state.
//!
//! One mutex guards the state for the duration of a handler call. Handlers run
//! against a working copy; the copy replaces the shared record only when the
//! handler succeeds, so a failed or panicking handler leaves the last good
//! state in place.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use scopelink_wire::{Args, CommandRequest, CommandResponse, Frame};

use super::errors::DispatchError;
use super::registry::CommandRegistry;
use super::{CommandService, CommandSession, DISPATCH_TARGET, Reply};

/// Built-in command answered by every dispatcher.
pub const LIST_COMMANDS: &str = "list_commands";

struct Shared<S> {
    destination: String,
    registry: CommandRegistry<S>,
    state: Mutex<S>,
}

/// Shared command dispatcher for one server.
///
/// Cloning is cheap; clones share the registry and the state.
pub struct Dispatcher<S> {
    inner: Arc<Shared<S>>,
}

impl<S> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> std::fmt::Debug for Dispatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("destination", &self.inner.destination)
            .field("registry", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

impl<S: Clone + Send + 'static> Dispatcher<S> {
    /// Creates a dispatcher serving `destination` with `state` as the initial
    /// record.
    pub fn new(destination: impl Into<String>, registry: CommandRegistry<S>, state: S) -> Self {
        Self {
            inner: Arc::new(Shared {
                destination: destination.into(),
                registry,
                state: Mutex::new(state),
            }),
        }
    }

    /// Destination label used in logs and error messages.
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.inner.destination
    }

    /// Runs `command`, converting every failure into an Error response.
    pub fn dispatch(&self, command: &str, args: &Args) -> CommandResponse {
        match self.try_dispatch(command, args) {
            Ok(response) => response,
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    destination = %self.inner.destination,
                    command,
                    %error,
                    "command failed"
                );
                error.to_response()
            }
        }
    }

    /// Runs `command` and reports failures as [`DispatchError`].
    ///
    /// # Errors
    ///
    /// Fails for unknown commands, handler errors, handler panics, and a
    /// poisoned state lock.
    pub fn try_dispatch(&self, command: &str, args: &Args) -> Result<CommandResponse, DispatchError> {
        let Some((_, handler)) = self.inner.registry.resolve(command) else {
            if command == LIST_COMMANDS {
                return Ok(self.list_commands());
            }
            return Err(DispatchError::UnknownCommand {
                destination: self.inner.destination.clone(),
                command: command.to_owned(),
            });
        };

        let mut guard = self.inner.state.lock().map_err(|_| DispatchError::Internal {
            message: format!("state lock for '{}' is poisoned", self.inner.destination),
        })?;
        let mut working = guard.clone();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(&mut working, args)));
        match outcome {
            Ok(Ok(response)) => {
                *guard = working;
                debug!(
                    target: DISPATCH_TARGET,
                    destination = %self.inner.destination,
                    command,
                    response = response.variant_name(),
                    "command completed"
                );
                Ok(response)
            }
            Ok(Err(source)) => Err(DispatchError::Handler {
                command: command.to_owned(),
                source,
            }),
            Err(payload) => Err(DispatchError::Panicked {
                command: command.to_owned(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    /// Reads the current state.
    ///
    /// # Errors
    ///
    /// Fails when the state lock is poisoned.
    pub fn with_state<R>(&self, read: impl FnOnce(&S) -> R) -> Result<R, DispatchError> {
        let guard = self.inner.state.lock().map_err(|_| DispatchError::Internal {
            message: format!("state lock for '{}' is poisoned", self.inner.destination),
        })?;
        Ok(read(&guard))
    }

    /// Sorted names answered by this dispatcher, built-ins included.
    #[must_use]
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .registry
            .command_names()
            .into_iter()
            .map(str::to_owned)
            .collect();
        if !self.inner.registry.contains(LIST_COMMANDS) {
            names.push(LIST_COMMANDS.to_owned());
            names.sort_unstable();
        }
        names
    }

    fn list_commands(&self) -> CommandResponse {
        let mut body = Map::new();
        body.insert(
            "destination".into(),
            Value::from(self.inner.destination.clone()),
        );
        body.insert("commands".into(), Value::from(self.command_names()));
        CommandResponse::Structured(body)
    }
}

impl<S: Clone + Send + 'static> CommandService for Dispatcher<S> {
    fn open_session(&self) -> Box<dyn CommandSession> {
        Box::new(self.clone())
    }
}

impl<S: Clone + Send + 'static> CommandSession for Dispatcher<S> {
    fn handle(&mut self, request: &CommandRequest, _frame: &Frame) -> Reply {
        Reply::Response(self.dispatch(&request.command, &request.args))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| String::from("handler panicked"))
}
