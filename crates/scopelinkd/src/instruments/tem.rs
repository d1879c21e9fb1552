//! Transmission microscope object reached through the direct proxy as "TEM".

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use scopelink_wire::{Args, ArrayPayload, CommandResponse};

use crate::dispatch::{ArgReader, CommandRegistry, Dispatcher, HandlerError, RegistryError};

use super::{InstrumentSettings, noise};

/// Destination name served by this profile.
pub const DESTINATION: &str = "TEM";

const DEFAULT_DETECTOR_SIZE: u64 = 512;
const STAGE_AXES: [&str; 5] = ["x", "y", "z", "a", "b"];

/// Camera settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detector {
    /// Square image edge in pixels.
    pub size: u64,
    /// Exposure time in seconds.
    pub exposure: f64,
}

/// Hardware record of the transmission microscope.
#[derive(Debug, Clone, PartialEq)]
pub struct TemState {
    /// Cameras by device name.
    pub detectors: BTreeMap<String, Detector>,
    /// Current magnification.
    pub magnification: f64,
    /// Stage coordinates `[x, y, z, a, b]`.
    pub stage: [f64; 5],
    /// Other microscope parameters set by name.
    pub parameters: BTreeMap<String, Value>,
    /// True after a client called `close`.
    pub closed: bool,
}

impl Default for TemState {
    fn default() -> Self {
        let camera = Detector {
            size: DEFAULT_DETECTOR_SIZE,
            exposure: 0.1,
        };
        Self {
            detectors: BTreeMap::from([
                (String::from("wobbler_camera"), camera),
                (String::from("ceta_camera"), camera),
            ]),
            magnification: 1000.0,
            stage: [0.0; 5],
            parameters: BTreeMap::new(),
            closed: false,
        }
    }
}

/// Builds the TEM command registry.
///
/// # Errors
///
/// Fails only if two handlers collide on a name.
pub fn registry(settings: InstrumentSettings) -> Result<CommandRegistry<TemState>, RegistryError> {
    let mut registry = CommandRegistry::new();
    registry.register("get_instrument_status", get_instrument_status)?;
    registry.register("get_stage", get_stage)?;
    registry.register("set_stage", move |state, args| {
        settings.pause();
        set_stage(state, args)
    })?;
    registry.register("acquire_image", move |state, args| {
        acquire_image(settings, state, args)
    })?;
    registry.register("set_microscope_status", set_microscope_status)?;
    registry.register("get_detectors", get_detectors)?;
    registry.register("close", close)?;
    Ok(registry)
}

/// Builds a dispatcher over a fresh TEM record.
///
/// # Errors
///
/// As [`registry`].
pub fn dispatcher(settings: InstrumentSettings) -> Result<Dispatcher<TemState>, RegistryError> {
    Ok(Dispatcher::new(
        DESTINATION,
        registry(settings)?,
        TemState::default(),
    ))
}

fn acknowledged() -> CommandResponse {
    let mut body = Map::new();
    body.insert("result".into(), Value::from(1));
    CommandResponse::Structured(body)
}

fn get_instrument_status(
    state: &mut TemState,
    _args: &Args,
) -> Result<CommandResponse, HandlerError> {
    let mut body = Map::new();
    body.insert("vacuum".into(), Value::from("Ready"));
    body.insert("column_valve".into(), Value::from("Open"));
    body.insert("beam_current".into(), Value::from(1.0e-9));
    body.insert("magnification".into(), Value::from(state.magnification));
    Ok(CommandResponse::Structured(body))
}

fn get_stage(state: &mut TemState, _args: &Args) -> Result<CommandResponse, HandlerError> {
    Ok(CommandResponse::Array(ArrayPayload::from_f64(
        vec![state.stage.len()],
        &state.stage,
    )?))
}

/// Accepts either `{"stage_positions": {...}}` or the axes at top level.
fn set_stage(state: &mut TemState, args: &Args) -> Result<CommandResponse, HandlerError> {
    let reader = ArgReader::new(args);
    let relative = reader.opt_bool("relative")?.unwrap_or(true);
    let positions = reader.opt_object("stage_positions")?.unwrap_or(args);
    let axes = ArgReader::new(positions);
    for (index, axis) in STAGE_AXES.iter().enumerate() {
        let Some(value) = axes.opt_f64(axis)? else {
            continue;
        };
        let slot = state
            .stage
            .get_mut(index)
            .ok_or_else(|| HandlerError::invalid(axis, "no such stage axis"))?;
        if relative {
            *slot += value;
        } else {
            *slot = value;
        }
    }
    Ok(acknowledged())
}

fn acquire_image(
    settings: InstrumentSettings,
    state: &mut TemState,
    args: &Args,
) -> Result<CommandResponse, HandlerError> {
    let reader = ArgReader::new(args);
    let device = reader.str("device_name")?;
    let size = state
        .detectors
        .get(device)
        .map_or(DEFAULT_DETECTOR_SIZE, |detector| detector.size);
    let edge = settings.image_edge("device_name", size)?;
    settings.pause();
    Ok(CommandResponse::Array(noise::u16_image(edge)?))
}

fn set_microscope_status(
    state: &mut TemState,
    args: &Args,
) -> Result<CommandResponse, HandlerError> {
    let reader = ArgReader::new(args);
    let parameter = reader.str("parameter")?;
    if parameter == "magnification" {
        let value = reader.f64("value")?;
        if value <= 0.0 {
            return Err(HandlerError::invalid("value", "magnification must be positive"));
        }
        state.magnification = value;
    } else {
        let value = args.get("value").cloned().unwrap_or(Value::Null);
        state.parameters.insert(parameter.to_owned(), value);
    }
    Ok(acknowledged())
}

fn get_detectors(state: &mut TemState, _args: &Args) -> Result<CommandResponse, HandlerError> {
    let names: Vec<Value> = state.detectors.keys().cloned().map(Value::from).collect();
    let mut body = Map::new();
    body.insert("detectors".into(), Value::from(names));
    Ok(CommandResponse::Structured(body))
}

fn close(state: &mut TemState, _args: &Args) -> Result<CommandResponse, HandlerError> {
    state.closed = true;
    Ok(acknowledged())
}
