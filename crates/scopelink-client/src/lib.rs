//! Client library and command-line runtime for scopelink.
//!
//! [`RoutedClient`] is the blocking façade over the framed protocol: it sends
//! one command to a destination through the central router and waits for the
//! response. [`CommandBackend`] abstracts over the ways a command can be
//! executed ([`RoutedBackend`], [`DirectProxy`], [`Simulator`]) so callers pick
//! one at start-up.
//!
//! [`run`] drives the `scopelink` binary: it loads configuration, selects a
//! backend, sends the command named on the command line, and renders the
//! response.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use scopelink_config::Config;
use scopelink_wire::CENTRAL;

mod backend;
mod cli;
mod client;
mod command;
mod config;
mod errors;
mod link;
pub mod output;

pub use backend::{CommandBackend, DirectProxy, RoutedBackend, Simulator};
pub use client::{RoutedClient, SET_ROUTING_TABLE, routes_to_args};
pub use errors::ClientError;
pub use link::ClientSettings;
pub use output::{render_error, render_response};

use backend::select_backend;
use cli::Cli;
use command::CommandInvocation;
use config::{ConfigArgumentSplit, ConfigLoader, OrthoConfigLoader, split_config_arguments};
use errors::AppError;

pub(crate) const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::client");

/// Runs the CLI using the provided arguments and output streams.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with(args, stdout, stderr, &OrthoConfigLoader, select_backend)
}

/// Runs the CLI with an injected configuration loader and backend factory.
pub(crate) fn run_with<I, W, E, L, F>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
    connect: F,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
    F: FnOnce(&Config) -> Result<Box<dyn CommandBackend>, AppError>,
{
    match execute(args, stdout, stderr, loader, connect) {
        Ok(exit_code) => exit_code,
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            ExitCode::FAILURE
        }
    }
}

fn execute<I, W, E, L, F>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
    connect: F,
) -> Result<ExitCode, AppError>
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
    F: FnOnce(&Config) -> Result<Box<dyn CommandBackend>, AppError>,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);
    let cli = Cli::try_parse_from(prepare_cli_arguments(&args, &split)).map_err(AppError::CliUsage)?;
    let invocation = CommandInvocation::try_from(cli)?;
    let config = loader.load(&split.config_arguments)?;
    let mut backend = connect(&config)?;

    if invocation.push_routes {
        let confirmation = backend.send_command(
            CENTRAL,
            SET_ROUTING_TABLE,
            Some(routes_to_args(&config.routes)),
        )?;
        if confirmation.is_error() {
            render_error(stderr, &confirmation).map_err(AppError::Output)?;
            return Ok(ExitCode::FAILURE);
        }
    }

    let response = backend.send_command(
        &invocation.destination,
        &invocation.command,
        Some(invocation.args),
    )?;
    if response.is_error() {
        render_error(stderr, &response).map_err(AppError::Output)?;
        return Ok(ExitCode::FAILURE);
    }
    render_response(stdout, &response).map_err(AppError::Output)?;
    stdout.flush().map_err(AppError::Output)?;
    Ok(ExitCode::SUCCESS)
}

fn prepare_cli_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    args.first()
        .into_iter()
        .chain(args.iter().skip(split.command_start))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests;
