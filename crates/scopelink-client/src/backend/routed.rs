use scopelink_config::Config;
use scopelink_wire::{Args, CommandResponse};

use crate::client::RoutedClient;
use crate::errors::ClientError;
use crate::link::ClientSettings;

use super::CommandBackend;

/// Backend that sends every command through the central router.
#[derive(Debug)]
pub struct RoutedBackend {
    client: RoutedClient,
}

impl RoutedBackend {
    /// Connects to the router named by `config.central`.
    ///
    /// # Errors
    ///
    /// Fails when the router is unreachable.
    pub fn connect(config: &Config) -> Result<Self, ClientError> {
        let client =
            RoutedClient::connect_with(config.central.clone(), ClientSettings::from_config(config))?;
        Ok(Self { client })
    }
}

impl CommandBackend for RoutedBackend {
    fn name(&self) -> &'static str {
        "routed"
    }

    fn send_command(
        &mut self,
        destination: &str,
        command: &str,
        args: Option<Args>,
    ) -> Result<CommandResponse, ClientError> {
        self.client.send_command(destination, command, args)
    }
}
