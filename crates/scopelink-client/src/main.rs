//! Entry point for the `scopelink` command-line client.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    scopelink_client::run(std::env::args_os(), &mut stdout, &mut stderr)
}
