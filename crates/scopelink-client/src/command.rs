//! Turns parsed command-line arguments into a command call.

use scopelink_wire::Args;
use serde_json::Value;

use crate::cli::Cli;
use crate::errors::AppError;

#[derive(Debug, PartialEq)]
pub(crate) struct CommandInvocation {
    pub(crate) destination: String,
    pub(crate) command: String,
    pub(crate) args: Args,
    pub(crate) push_routes: bool,
}

impl TryFrom<Cli> for CommandInvocation {
    type Error = AppError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let destination = required(cli.destination, AppError::MissingDestination)?;
        let command = required(cli.command, AppError::MissingCommand)?;
        let args = cli
            .arguments
            .iter()
            .map(|argument| parse_argument(argument))
            .collect::<Result<Args, AppError>>()?;
        Ok(Self {
            destination,
            command,
            args,
            push_routes: cli.push_routes,
        })
    }
}

fn required(value: Option<String>, missing: AppError) -> Result<String, AppError> {
    match value.map(|text| text.trim().to_owned()) {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(missing),
    }
}

/// Parses `key=value`, reading the value as JSON and falling back to a string.
pub(crate) fn parse_argument(argument: &str) -> Result<(String, Value), AppError> {
    let Some((key, raw)) = argument.split_once('=') else {
        return Err(AppError::MalformedArgument(argument.to_owned()));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(AppError::MalformedArgument(argument.to_owned()));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()));
    Ok((key.to_owned(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case::float("x=100.0", "x", json!(100.0))]
    #[case::integer("size=64", "size", json!(64))]
    #[case::boolean("relative=false", "relative", json!(false))]
    #[case::bare_word("name=C1", "name", json!("C1"))]
    #[case::quoted("device_name=\"ceta_camera\"", "device_name", json!("ceta_camera"))]
    #[case::object("stage_positions={\"x\":1}", "stage_positions", json!({"x": 1}))]
    #[case::empty_value("note=", "note", json!(""))]
    #[case::equals_in_value("expr=a=b", "expr", json!("a=b"))]
    fn arguments_parse_as_json_then_text(
        #[case] argument: &str,
        #[case] key: &str,
        #[case] value: Value,
    ) {
        assert_eq!(
            parse_argument(argument).expect("argument parses"),
            (key.to_owned(), value)
        );
    }

    #[rstest]
    #[case::no_equals("x")]
    #[case::no_key("=1")]
    fn malformed_arguments_are_rejected(#[case] argument: &str) {
        assert!(matches!(
            parse_argument(argument),
            Err(AppError::MalformedArgument(_))
        ));
    }

    #[rstest]
    fn missing_command_is_reported() {
        let cli = Cli {
            push_routes: false,
            destination: Some("AS".into()),
            command: None,
            arguments: Vec::new(),
        };
        assert!(matches!(
            CommandInvocation::try_from(cli),
            Err(AppError::MissingCommand)
        ));
    }
}
