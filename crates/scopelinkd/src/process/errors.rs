use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::dispatch::RegistryError;
use crate::transport::ListenerError;

use super::shutdown::ShutdownError;

/// Reasons a server process exits abnormally.
///
/// The variant names the stage that failed: bootstrap, command table
/// construction, the TCP listener, or the signal wait.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("bootstrap: {source}")]
    Bootstrap {
        #[from]
        source: BootstrapError,
    },
    #[error("command table: {source}")]
    Registry {
        #[from]
        source: RegistryError,
    },
    #[error("listener: {source}")]
    Listener {
        #[from]
        source: ListenerError,
    },
    #[error("signal handling: {source}")]
    Shutdown {
        #[from]
        source: ShutdownError,
    },
}

impl LaunchError {
    /// Process exit status for this failure.
    ///
    /// Configuration problems exit with 78 (`EX_CONFIG`); everything that
    /// happens once configuration is valid exits with 1.
    #[must_use]
    pub const fn exit_status(&self) -> u8 {
        match self {
            Self::Bootstrap { .. } => 78,
            Self::Registry { .. } | Self::Listener { .. } | Self::Shutdown { .. } => 1,
        }
    }
}
