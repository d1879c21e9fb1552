use scopelink_config::{Config, Endpoint};
use scopelink_wire::{Args, CommandRequest, CommandResponse, Destination};
use tracing::warn;

use crate::CLIENT_TARGET;
use crate::errors::ClientError;
use crate::link::{ClientSettings, Link};

use super::CommandBackend;

/// Backend that calls methods on one server object by name.
///
/// The proxy keeps a single connection to `direct_uri`. When a namespace is
/// configured, command names are sent as `{namespace}_{command}` unless they
/// already carry the prefix.
#[derive(Debug)]
pub struct DirectProxy {
    endpoint: Endpoint,
    namespace: Option<String>,
    settings: ClientSettings,
    link: Option<Link>,
}

impl DirectProxy {
    /// Connects to the server object named by `config.direct_uri`.
    ///
    /// # Errors
    ///
    /// Fails when the server is unreachable.
    pub fn connect(config: &Config) -> Result<Self, ClientError> {
        Self::connect_to(
            config.direct_uri.clone(),
            config.direct_namespace.clone(),
            ClientSettings::from_config(config),
        )
    }

    /// Connects to `endpoint`, prefixing commands with `namespace`.
    ///
    /// # Errors
    ///
    /// Fails when the server is unreachable.
    pub fn connect_to(
        endpoint: Endpoint,
        namespace: Option<String>,
        settings: ClientSettings,
    ) -> Result<Self, ClientError> {
        let link = Link::open(&endpoint, &settings)?;
        Ok(Self {
            endpoint,
            namespace: namespace.filter(|prefix| !prefix.is_empty()),
            settings,
            link: Some(link),
        })
    }

    /// Command name as sent on the wire.
    #[must_use]
    pub fn method_name(&self, command: &str) -> String {
        match &self.namespace {
            Some(prefix)
                if !command
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('_')) =>
            {
                format!("{prefix}_{command}")
            }
            _ => command.to_owned(),
        }
    }
}

impl CommandBackend for DirectProxy {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn send_command(
        &mut self,
        destination: &str,
        command: &str,
        args: Option<Args>,
    ) -> Result<CommandResponse, ClientError> {
        let name = Destination::new(destination).map_err(|source| ClientError::Protocol {
            destination: destination.to_owned(),
            source,
        })?;
        let request =
            CommandRequest::new(name, self.method_name(command)).with_args(args.unwrap_or_default());
        let mut link = match self.link.take() {
            Some(link) => link,
            None => Link::open(&self.endpoint, &self.settings)?,
        };
        let result = link.call(request, &self.settings);
        match &result {
            Ok(_) => self.link = Some(link),
            Err(error) => warn!(
                target: CLIENT_TARGET,
                endpoint = %self.endpoint,
                command,
                %error,
                "direct call failed, closing connection"
            ),
        }
        result
    }
}
