//! Human-readable rendering of command responses.

use std::fmt::Write as _;
use std::io::{self, Write};

use scopelink_wire::{ArrayPayload, CommandResponse};

/// Writes a successful response to `out`.
///
/// Text is printed as-is, structured payloads as indented JSON, and arrays as
/// a one-line summary of their shape and value range. Error responses are
/// rendered by [`render_error`] instead.
///
/// # Errors
///
/// Fails when `out` rejects the write.
pub fn render_response<W: Write>(out: &mut W, response: &CommandResponse) -> io::Result<()> {
    match response {
        CommandResponse::Text(text) => writeln!(out, "{text}"),
        CommandResponse::Structured(body) => {
            serde_json::to_writer_pretty(&mut *out, body).map_err(io::Error::other)?;
            writeln!(out)
        }
        CommandResponse::Array(array) => writeln!(out, "{}", summarise_array(array)),
        CommandResponse::Error { .. } => render_error(out, response),
    }
}

/// Writes an error response as `kind: message`.
///
/// # Errors
///
/// Fails when `out` rejects the write.
pub fn render_error<W: Write>(out: &mut W, response: &CommandResponse) -> io::Result<()> {
    match response {
        CommandResponse::Error { kind, message } => writeln!(out, "{kind}: {message}"),
        other => writeln!(out, "unexpected {} response", other.variant_name()),
    }
}

/// One-line description of an array payload.
#[must_use]
pub fn summarise_array(array: &ArrayPayload) -> String {
    let mut summary = format!(
        "{} array {:?} ({} elements",
        array.element_type().name(),
        array.shape(),
        array.len()
    );
    let values = array.to_f64_vec();
    if values.len() <= 8 {
        let _ = write!(summary, ": {values:?}");
    } else {
        let (min, max, sum) = values.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), value| (min.min(*value), max.max(*value), sum + value),
        );
        let mean = sum / values.len() as f64;
        let _ = write!(summary, ", min {min}, max {max}, mean {mean:.3}");
    }
    summary.push(')');
    summary
}
