//! Scanning microscope twin served as destination "AS".

use std::fmt;

use scopelink_wire::{Args, ArrayPayload, CommandResponse};

use crate::dispatch::{ArgReader, CommandRegistry, Dispatcher, HandlerError, RegistryError};

use super::{InstrumentSettings, noise};

/// Destination name served by this profile.
pub const DESTINATION: &str = "AS";
/// Prefix of the alias registered for every command.
pub const ALIAS_PREFIX: &str = "AS_";

const DEFAULT_IMAGE_SIZE: u64 = 512;
const DEFAULT_MAGNIFICATION: f64 = 1000.0;

/// Readiness of the simulated microscope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MicroscopeStatus {
    /// No session has been opened yet.
    #[default]
    Offline,
    /// Connected and idle.
    Ready,
    /// Acquiring an image.
    Busy,
}

impl fmt::Display for MicroscopeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Offline => "Offline",
            Self::Ready => "Ready",
            Self::Busy => "Busy",
        })
    }
}

/// Beam blanker and deflector state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BeamState {
    /// True while the beam is blanked.
    pub blanked: bool,
    /// Fractional field-of-view position of a parked beam.
    pub position: Option<(f64, f64)>,
}

/// Hardware record of the scanning microscope.
#[derive(Debug, Clone, PartialEq)]
pub struct MicroscopeState {
    /// Connection status.
    pub status: MicroscopeStatus,
    /// Current magnification.
    pub magnification: f64,
    /// Stage coordinates `[x, y, z]`.
    pub stage: [f64; 3],
    /// Screen current in picoamperes, once set.
    pub screen_current_pa: Option<f64>,
    /// True after the screen current was calibrated.
    pub screen_calibrated: bool,
    /// Beam state.
    pub beam: BeamState,
    /// Detector used by the last scan.
    pub last_detector: Option<String>,
}

impl Default for MicroscopeState {
    fn default() -> Self {
        Self {
            status: MicroscopeStatus::Offline,
            magnification: DEFAULT_MAGNIFICATION,
            stage: [0.0; 3],
            screen_current_pa: None,
            screen_calibrated: false,
            beam: BeamState::default(),
            last_detector: None,
        }
    }
}

/// Builds the AS command registry.
///
/// # Errors
///
/// Fails only if two handlers collide on a name.
pub fn registry(settings: InstrumentSettings) -> Result<CommandRegistry<MicroscopeState>, RegistryError> {
    let mut registry = CommandRegistry::new();
    registry.register_prefixed(ALIAS_PREFIX, "connect_AS", connect)?;
    registry.register_prefixed(ALIAS_PREFIX, "get_scanned_image", move |state, args| {
        scanned_image(settings, state, args)
    })?;
    registry.register_prefixed(ALIAS_PREFIX, "get_stage", get_stage)?;
    registry.register_prefixed(ALIAS_PREFIX, "get_status", get_status)?;
    registry.register_prefixed(ALIAS_PREFIX, "set_magnification", set_magnification)?;
    registry.register_prefixed(ALIAS_PREFIX, "move_stage", move |state, args| {
        settings.pause();
        move_stage(state, args)
    })?;
    registry.register_prefixed(
        ALIAS_PREFIX,
        "calibrate_screen_current",
        calibrate_screen_current,
    )?;
    registry.register_prefixed(ALIAS_PREFIX, "set_screen_current", set_screen_current)?;
    registry.register_prefixed(ALIAS_PREFIX, "place_beam", place_beam)?;
    registry.register_prefixed(ALIAS_PREFIX, "blank_beam", blank_beam)?;
    registry.register_prefixed(ALIAS_PREFIX, "unblank_beam", unblank_beam)?;
    Ok(registry)
}

/// Builds a dispatcher over a fresh microscope record.
///
/// # Errors
///
/// As [`registry`].
pub fn dispatcher(settings: InstrumentSettings) -> Result<Dispatcher<MicroscopeState>, RegistryError> {
    Ok(Dispatcher::new(
        DESTINATION,
        registry(settings)?,
        MicroscopeState::default(),
    ))
}

fn connect(state: &mut MicroscopeState, _args: &Args) -> Result<CommandResponse, HandlerError> {
    state.status = MicroscopeStatus::Ready;
    Ok(CommandResponse::text("Connected to microscope"))
}

fn scanned_image(
    settings: InstrumentSettings,
    state: &mut MicroscopeState,
    args: &Args,
) -> Result<CommandResponse, HandlerError> {
    let reader = ArgReader::new(args);
    let size = reader.opt_u64("size")?.unwrap_or(DEFAULT_IMAGE_SIZE);
    let edge = settings.image_edge("size", size)?;
    let dwell_time = reader.opt_f64("dwell_time")?.unwrap_or(1e-6);
    if dwell_time <= 0.0 {
        return Err(HandlerError::invalid("dwell_time", "must be positive"));
    }
    state.status = MicroscopeStatus::Busy;
    state.last_detector = reader.opt_str("scanning_detector")?.map(str::to_owned);
    settings.pause();
    let image = noise::u8_image(edge)?;
    state.status = MicroscopeStatus::Ready;
    Ok(CommandResponse::Array(image))
}

fn get_stage(state: &mut MicroscopeState, _args: &Args) -> Result<CommandResponse, HandlerError> {
    Ok(CommandResponse::Array(ArrayPayload::from_f64(
        vec![state.stage.len()],
        &state.stage,
    )?))
}

fn get_status(state: &mut MicroscopeState, _args: &Args) -> Result<CommandResponse, HandlerError> {
    Ok(CommandResponse::text(format!("Microscope is {}", state.status)))
}

fn set_magnification(
    state: &mut MicroscopeState,
    args: &Args,
) -> Result<CommandResponse, HandlerError> {
    let mag = ArgReader::new(args)
        .first_f64(&["mag", "value"])?
        .unwrap_or(DEFAULT_MAGNIFICATION);
    if mag <= 0.0 {
        return Err(HandlerError::invalid("mag", "magnification must be positive"));
    }
    state.magnification = mag;
    Ok(CommandResponse::text(format!("Magnification set to {mag:?}")))
}

fn move_stage(state: &mut MicroscopeState, args: &Args) -> Result<CommandResponse, HandlerError> {
    let reader = ArgReader::new(args);
    let x = reader.opt_f64("x")?.unwrap_or(0.0);
    let y = reader.opt_f64("y")?.unwrap_or(0.0);
    state.stage[0] = x;
    state.stage[1] = y;
    Ok(CommandResponse::text(format!("Stage moved to {x:?}, {y:?}")))
}

fn calibrate_screen_current(
    state: &mut MicroscopeState,
    _args: &Args,
) -> Result<CommandResponse, HandlerError> {
    state.screen_calibrated = true;
    Ok(CommandResponse::text("Screen current calibrated"))
}

fn set_screen_current(
    state: &mut MicroscopeState,
    args: &Args,
) -> Result<CommandResponse, HandlerError> {
    let current = ArgReader::new(args).first_f64(&["current", "value"])?.ok_or_else(|| {
        HandlerError::MissingArgument(String::from("current"))
    })?;
    if current < 0.0 {
        return Err(HandlerError::invalid("current", "must not be negative"));
    }
    state.screen_current_pa = Some(current);
    Ok(CommandResponse::text(format!("Screen current set to {current:?} pA")))
}

fn place_beam(state: &mut MicroscopeState, args: &Args) -> Result<CommandResponse, HandlerError> {
    let reader = ArgReader::new(args);
    let x = reader.f64("x")?;
    let y = reader.f64("y")?;
    for (name, value) in [("x", x), ("y", y)] {
        if !(0.0..=1.0).contains(&value) {
            return Err(HandlerError::invalid(
                name,
                format!("{value:?} is outside the field of view (0.0 to 1.0)"),
            ));
        }
    }
    state.beam.position = Some((x, y));
    Ok(CommandResponse::text(format!("Beam placed at {x:?}, {y:?}")))
}

fn blank_beam(state: &mut MicroscopeState, _args: &Args) -> Result<CommandResponse, HandlerError> {
    state.beam.blanked = true;
    Ok(CommandResponse::text("Beam blanked"))
}

fn unblank_beam(state: &mut MicroscopeState, args: &Args) -> Result<CommandResponse, HandlerError> {
    match ArgReader::new(args).opt_f64("duration")? {
        Some(duration) if duration <= 0.0 => {
            Err(HandlerError::invalid("duration", "must be positive"))
        }
        // A timed exposure leaves the blanker engaged afterwards.
        Some(duration) => {
            state.beam.blanked = true;
            Ok(CommandResponse::text(format!(
                "Beam unblanked for {duration:?}s"
            )))
        }
        None => {
            state.beam.blanked = false;
            Ok(CommandResponse::text("Beam unblanked"))
        }
    }
}
