//! Aberration corrector twin served as destination "Ceos".

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use scopelink_wire::{Args, CommandResponse};

use crate::dispatch::{ArgReader, CommandRegistry, Dispatcher, HandlerError, RegistryError};

use super::{InstrumentSettings, noise};

/// Destination name served by this profile.
pub const DESTINATION: &str = "Ceos";
/// Prefix of the alias registered for every command.
pub const ALIAS_PREFIX: &str = "Ceos_";

const DEFAULT_TABLEAU_SIZE: u64 = 128;
const TABLEAU_TYPES: [&str; 3] = ["Fast", "Standard", "Enhanced"];

/// Residual aberrations in metres, keyed by coefficient name.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectorState {
    /// Residual coefficient values.
    pub aberrations: BTreeMap<String, f64>,
    /// Number of tableaus acquired so far.
    pub tableaus_acquired: u64,
}

impl Default for CorrectorState {
    fn default() -> Self {
        let aberrations = [
            ("C1", 1.2e-9),
            ("A1", 3.5e-9),
            ("B2", 45.0e-9),
            ("A2", 30.0e-9),
            ("C3", 1.1e-6),
            ("S3", 0.8e-6),
            ("A3", 0.6e-6),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value))
        .collect();
        Self {
            aberrations,
            tableaus_acquired: 0,
        }
    }
}

impl CorrectorState {
    fn aberrations_json(&self) -> Map<String, Value> {
        self.aberrations
            .iter()
            .map(|(name, value)| (name.clone(), Value::from(*value)))
            .collect()
    }

    /// Sum of absolute residuals, used to shape the simulated tableau.
    fn total_residual(&self) -> f64 {
        self.aberrations.values().map(|value| value.abs()).sum()
    }
}

/// Builds the Ceos command registry.
///
/// # Errors
///
/// Fails only if two handlers collide on a name.
pub fn registry(settings: InstrumentSettings) -> Result<CommandRegistry<CorrectorState>, RegistryError> {
    let mut registry = CommandRegistry::new();
    registry.register_prefixed(ALIAS_PREFIX, "get_status", get_status)?;
    registry.register_prefixed(ALIAS_PREFIX, "get_aberrations", get_aberrations)?;
    registry.register_prefixed(ALIAS_PREFIX, "correct_aberration", correct_aberration)?;
    registry.register_prefixed(ALIAS_PREFIX, "acquire_tableau", move |state, args| {
        acquire_tableau(settings, state, args)
    })?;
    Ok(registry)
}

/// Builds a dispatcher over a fresh corrector record.
///
/// # Errors
///
/// As [`registry`].
pub fn dispatcher(settings: InstrumentSettings) -> Result<Dispatcher<CorrectorState>, RegistryError> {
    Ok(Dispatcher::new(
        DESTINATION,
        registry(settings)?,
        CorrectorState::default(),
    ))
}

fn get_status(state: &mut CorrectorState, _args: &Args) -> Result<CommandResponse, HandlerError> {
    Ok(CommandResponse::text(format!(
        "Corrector is Ready ({} tableaus acquired)",
        state.tableaus_acquired
    )))
}

fn get_aberrations(
    state: &mut CorrectorState,
    _args: &Args,
) -> Result<CommandResponse, HandlerError> {
    Ok(CommandResponse::Structured(state.aberrations_json()))
}

fn correct_aberration(
    state: &mut CorrectorState,
    args: &Args,
) -> Result<CommandResponse, HandlerError> {
    let reader = ArgReader::new(args);
    let name = reader.str("name")?;
    let value = reader.f64("value")?;
    let residual = state.aberrations.get_mut(name).ok_or_else(|| {
        HandlerError::Rejected(format!("unknown aberration coefficient '{name}'"))
    })?;
    *residual -= value;
    Ok(CommandResponse::text(format!(
        "Corrected {name} by {value:?}, residual {:?}",
        *residual
    )))
}

fn acquire_tableau(
    settings: InstrumentSettings,
    state: &mut CorrectorState,
    args: &Args,
) -> Result<CommandResponse, HandlerError> {
    let reader = ArgReader::new(args);
    let tab_type = reader.opt_str("tabType")?.unwrap_or("Fast");
    if !TABLEAU_TYPES.contains(&tab_type) {
        return Err(HandlerError::invalid(
            "tabType",
            format!("expected one of {}", TABLEAU_TYPES.join(", ")),
        ));
    }
    let angle = reader.opt_f64("angle")?.unwrap_or(18.0);
    if !(0.0..=90.0).contains(&angle) {
        return Err(HandlerError::invalid("angle", "must be between 0 and 90 mrad"));
    }
    let size = reader.opt_u64("size")?.unwrap_or(DEFAULT_TABLEAU_SIZE);
    let edge = settings.image_edge("size", size)?;
    settings.pause();
    let spread = (0.05 + state.total_residual() * 1e5).min(0.5) as f32;
    let tableau = noise::f32_tableau(edge, spread)?;
    state.tableaus_acquired += 1;
    Ok(CommandResponse::Array(tableau))
}
