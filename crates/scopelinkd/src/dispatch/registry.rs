//! Name to handler mapping built once when a server starts.
//!
//! Every handler receives a stable [`HandlerId`]. Aliases are additional names
//! pointing at the same id, so `move_stage` and `AS_move_stage` run the same
//! code.

use std::collections::HashMap;
use std::fmt;

use scopelink_wire::{Args, CommandResponse};

use super::errors::{HandlerError, RegistryError};

/// Boxed command handler operating on server state `S`.
pub type Handler<S> =
    Box<dyn Fn(&mut S, &Args) -> Result<CommandResponse, HandlerError> + Send + Sync>;

/// Stable index of a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(usize);

struct Entry<S> {
    name: String,
    handler: Handler<S>,
}

/// Registry of command handlers for one server.
pub struct CommandRegistry<S> {
    entries: Vec<Entry<S>>,
    names: HashMap<String, HandlerId>,
}

impl<S> Default for CommandRegistry<S> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            names: HashMap::new(),
        }
    }
}

impl<S> fmt::Debug for CommandRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.command_names())
            .finish()
    }
}

impl<S> CommandRegistry<S> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateName`] when `name` is already bound.
    pub fn register<F>(&mut self, name: &str, handler: F) -> Result<HandlerId, RegistryError>
    where
        F: Fn(&mut S, &Args) -> Result<CommandResponse, HandlerError> + Send + Sync + 'static,
    {
        if self.names.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_owned()));
        }
        let id = HandlerId(self.entries.len());
        self.entries.push(Entry {
            name: name.to_owned(),
            handler: Box::new(handler),
        });
        self.names.insert(name.to_owned(), id);
        Ok(id)
    }

    /// Binds `alias` to the handler registered as `target`.
    ///
    /// Repeating an alias for the same handler is accepted.
    ///
    /// # Errors
    ///
    /// Fails when `target` is unknown or `alias` already names another
    /// handler.
    pub fn alias(&mut self, alias: &str, target: &str) -> Result<(), RegistryError> {
        let id = *self
            .names
            .get(target)
            .ok_or_else(|| RegistryError::UnknownHandler(target.to_owned()))?;
        match self.names.get(alias) {
            Some(existing) if *existing == id => Ok(()),
            Some(existing) => Err(RegistryError::ConflictingAlias {
                alias: alias.to_owned(),
                existing: self.primary_name(*existing).unwrap_or_default().to_owned(),
            }),
            None => {
                self.names.insert(alias.to_owned(), id);
                Ok(())
            }
        }
    }

    /// Registers `handler` as `name` and aliases it as `{prefix}{name}`.
    ///
    /// # Errors
    ///
    /// As [`CommandRegistry::register`] and [`CommandRegistry::alias`].
    pub fn register_prefixed<F>(
        &mut self,
        prefix: &str,
        name: &str,
        handler: F,
    ) -> Result<HandlerId, RegistryError>
    where
        F: Fn(&mut S, &Args) -> Result<CommandResponse, HandlerError> + Send + Sync + 'static,
    {
        let id = self.register(name, handler)?;
        self.alias(&format!("{prefix}{name}"), name)?;
        Ok(id)
    }

    /// Looks up the handler bound to `name`.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<(HandlerId, &Handler<S>)> {
        let id = *self.names.get(name)?;
        self.entries.get(id.0).map(|entry| (id, &entry.handler))
    }

    /// Name the handler was first registered under.
    #[must_use]
    pub fn primary_name(&self, id: HandlerId) -> Option<&str> {
        self.entries.get(id.0).map(|entry| entry.name.as_str())
    }

    /// Returns true when `name` is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Every bound name, aliases included, in sorted order.
    #[must_use]
    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
