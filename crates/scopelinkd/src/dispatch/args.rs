//! Typed access to command arguments.
//!
//! Clients send numbers either as JSON numbers or as numeric strings (the
//! command line passes `x=100` through unchanged), so readers accept both.
//! A JSON `null` counts as absent.

use serde_json::{Map, Value};

use scopelink_wire::Args;

use super::errors::HandlerError;

/// Borrowing reader over a request's arguments.
#[derive(Debug, Clone, Copy)]
pub struct ArgReader<'a> {
    args: &'a Args,
}

impl<'a> ArgReader<'a> {
    /// Wraps `args`.
    #[must_use]
    pub const fn new(args: &'a Args) -> Self {
        Self { args }
    }

    fn value(&self, name: &str) -> Option<&'a Value> {
        self.args.get(name).filter(|value| !value.is_null())
    }

    /// Reads a required floating point argument.
    ///
    /// # Errors
    ///
    /// Fails when the argument is missing or not numeric.
    pub fn f64(&self, name: &str) -> Result<f64, HandlerError> {
        self.opt_f64(name)?
            .ok_or_else(|| HandlerError::MissingArgument(name.to_owned()))
    }

    /// Reads an optional floating point argument.
    ///
    /// # Errors
    ///
    /// Fails when the argument is present but not numeric.
    pub fn opt_f64(&self, name: &str) -> Result<Option<f64>, HandlerError> {
        self.value(name).map(|value| as_f64(name, value)).transpose()
    }

    /// Reads the first present argument among `names`.
    ///
    /// # Errors
    ///
    /// Fails when that argument is not numeric.
    pub fn first_f64(&self, names: &[&str]) -> Result<Option<f64>, HandlerError> {
        names
            .iter()
            .find_map(|name| self.value(name).map(|value| as_f64(name, value)))
            .transpose()
    }

    /// Reads an optional non-negative integer argument.
    ///
    /// # Errors
    ///
    /// Fails when the argument is present but not a whole non-negative number.
    pub fn opt_u64(&self, name: &str) -> Result<Option<u64>, HandlerError> {
        self.value(name).map(|value| as_u64(name, value)).transpose()
    }

    /// Reads a required string argument.
    ///
    /// # Errors
    ///
    /// Fails when the argument is missing or not a string.
    pub fn str(&self, name: &str) -> Result<&'a str, HandlerError> {
        self.opt_str(name)?
            .ok_or_else(|| HandlerError::MissingArgument(name.to_owned()))
    }

    /// Reads an optional string argument.
    ///
    /// # Errors
    ///
    /// Fails when the argument is present but not a string.
    pub fn opt_str(&self, name: &str) -> Result<Option<&'a str>, HandlerError> {
        self.value(name)
            .map(|value| {
                value
                    .as_str()
                    .ok_or_else(|| HandlerError::invalid(name, "expected a string"))
            })
            .transpose()
    }

    /// Reads an optional boolean argument.
    ///
    /// # Errors
    ///
    /// Fails when the argument is present but not a boolean.
    pub fn opt_bool(&self, name: &str) -> Result<Option<bool>, HandlerError> {
        self.value(name)
            .map(|value| match value {
                Value::Bool(flag) => Ok(*flag),
                Value::String(text) => text
                    .parse::<bool>()
                    .map_err(|_| HandlerError::invalid(name, "expected true or false")),
                _ => Err(HandlerError::invalid(name, "expected true or false")),
            })
            .transpose()
    }

    /// Reads an optional JSON object argument.
    ///
    /// # Errors
    ///
    /// Fails when the argument is present but not an object.
    pub fn opt_object(&self, name: &str) -> Result<Option<&'a Map<String, Value>>, HandlerError> {
        self.value(name)
            .map(|value| {
                value
                    .as_object()
                    .ok_or_else(|| HandlerError::invalid(name, "expected an object"))
            })
            .transpose()
    }
}

fn as_f64(name: &str, value: &Value) -> Result<f64, HandlerError> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number
        .filter(|number| number.is_finite())
        .ok_or_else(|| HandlerError::invalid(name, format!("expected a number, got {value}")))
}

fn as_u64(name: &str, value: &Value) -> Result<u64, HandlerError> {
    let number = match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    };
    number.ok_or_else(|| {
        HandlerError::invalid(name, format!("expected a whole number, got {value}"))
    })
}
