//! Simulated instrument profiles.
//!
//! Each profile owns one state record and a registry of handlers over it:
//! [`autoscript`] for the scanning microscope ("AS"), [`ceos`] for the
//! aberration corrector ("Ceos"), and [`tem`] for the transmission microscope
//! object served to the direct proxy ("TEM").

pub mod autoscript;
pub mod ceos;
mod noise;
pub mod tem;

use std::thread;
use std::time::Duration;

use scopelink_config::{Config, DEFAULT_MAX_IMAGE_DIMENSION};

use crate::dispatch::HandlerError;

/// Limits and timing shared by every simulated handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrumentSettings {
    max_image_dimension: u32,
    command_latency: Duration,
}

impl Default for InstrumentSettings {
    fn default() -> Self {
        Self {
            max_image_dimension: DEFAULT_MAX_IMAGE_DIMENSION,
            command_latency: Duration::ZERO,
        }
    }
}

impl InstrumentSettings {
    /// Builds settings from explicit values.
    #[must_use]
    pub const fn new(max_image_dimension: u32, command_latency: Duration) -> Self {
        Self {
            max_image_dimension,
            command_latency,
        }
    }

    /// Reads the image bound and simulated latency from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_image_dimension, config.command_latency())
    }

    /// Largest accepted image edge.
    #[must_use]
    pub const fn max_image_dimension(&self) -> u32 {
        self.max_image_dimension
    }

    /// Simulated hardware delay applied by slow commands.
    #[must_use]
    pub const fn command_latency(&self) -> Duration {
        self.command_latency
    }

    pub(crate) fn pause(&self) {
        if !self.command_latency.is_zero() {
            thread::sleep(self.command_latency);
        }
    }

    /// Validates an image edge length.
    pub(crate) fn image_edge(&self, name: &str, requested: u64) -> Result<usize, HandlerError> {
        if requested == 0 || requested > u64::from(self.max_image_dimension) {
            return Err(HandlerError::invalid(
                name,
                format!(
                    "image size {requested} must be between 1 and {}",
                    self.max_image_dimension
                ),
            ));
        }
        usize::try_from(requested)
            .map_err(|_| HandlerError::invalid(name, "image size does not fit in memory"))
    }
}
