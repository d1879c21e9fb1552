use std::process::ExitCode;

fn main() -> ExitCode {
    match scopelinkd::run_server() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("scopelinkd: {error}");
            ExitCode::from(error.exit_status())
        }
    }
}
