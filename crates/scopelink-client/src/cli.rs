//! Command-line argument definitions for `scopelink`.

use clap::Parser;

/// Sends one command to a microscope server and prints the response.
///
/// Configuration flags such as `--backend` or `--central` must come before
/// the destination.
#[derive(Parser, Debug)]
#[command(name = "scopelink", version)]
pub(crate) struct Cli {
    /// Replaces the router's table with the configured routes before the call.
    #[arg(long)]
    pub(crate) push_routes: bool,
    /// Server to address (for example `AS`, `Ceos`, `TEM`, or `Central`).
    #[arg(value_name = "DESTINATION")]
    pub(crate) destination: Option<String>,
    /// Command to run (for example `move_stage`).
    #[arg(value_name = "COMMAND")]
    pub(crate) command: Option<String>,
    /// Command arguments; values are read as JSON when they parse as JSON.
    #[arg(
        value_name = "KEY=VALUE",
        num_args = 0..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub(crate) arguments: Vec<String>,
}
