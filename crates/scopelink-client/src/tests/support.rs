//! Shared fixtures: in-process servers, a fixed configuration loader, and a
//! CLI runner that captures output.

use std::ffi::OsString;
use std::net::TcpListener;
use std::process::ExitCode;
use std::sync::Arc;

use scopelink_config::{BackendMode, Config, Endpoint, RouteTableSpec};
use scopelinkd::instruments::{InstrumentSettings, autoscript, ceos};
use scopelinkd::router::{CentralRouter, ForwardSettings, RoutingTable};
use scopelinkd::{ServerHandle, serve};

use crate::backend::CommandBackend;
use crate::config::ConfigLoader;
use crate::errors::AppError;

/// Loader that ignores the command line and returns a prepared config.
pub(crate) struct FixedLoader(pub(crate) Config);

impl ConfigLoader for FixedLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.0.clone())
    }
}

/// Output captured from one CLI run.
#[derive(Debug)]
pub(crate) struct CliRun {
    pub(crate) exit: ExitCode,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

pub(crate) fn run_cli<F>(args: &[&str], loader: &FixedLoader, connect: F) -> CliRun
where
    F: FnOnce(&Config) -> Result<Box<dyn CommandBackend>, AppError>,
{
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let argv = std::iter::once("scopelink")
        .chain(args.iter().copied())
        .map(OsString::from);
    let exit = crate::run_with(argv, &mut stdout, &mut stderr, loader, connect);
    CliRun {
        exit,
        stdout: String::from_utf8(stdout).expect("stdout is utf8"),
        stderr: String::from_utf8(stderr).expect("stderr is utf8"),
    }
}

/// An endpoint nothing listens on.
pub(crate) fn closed_endpoint() -> Endpoint {
    let probe = TcpListener::bind("127.0.0.1:0").expect("probe port");
    Endpoint::from(probe.local_addr().expect("probe addr"))
}

/// Configuration pointing at unreachable servers with short timeouts.
pub(crate) fn offline_config(backend: BackendMode) -> Config {
    Config {
        central: closed_endpoint(),
        direct_uri: closed_endpoint(),
        backend,
        connect_timeout_ms: 300,
        call_timeout_ms: 2_000,
        ..Config::default()
    }
}

/// A router with an AS and a Ceos server behind it, on ephemeral ports.
pub(crate) struct Cluster {
    router: Option<ServerHandle>,
    microscope: Option<ServerHandle>,
    corrector: Option<ServerHandle>,
}

impl Cluster {
    pub(crate) fn start() -> Self {
        let any_port = Endpoint::new("127.0.0.1", 0);
        let settings = InstrumentSettings::new(256, std::time::Duration::ZERO);
        let microscope = serve(
            &any_port,
            Arc::new(autoscript::dispatcher(settings).expect("AS registry")),
        )
        .expect("start AS");
        let corrector = serve(
            &any_port,
            Arc::new(ceos::dispatcher(settings).expect("Ceos registry")),
        )
        .expect("start Ceos");
        let router = CentralRouter::new(RoutingTable::new(), ForwardSettings::default())
            .expect("router registry");
        let router = serve(&any_port, Arc::new(router)).expect("start router");
        Self {
            router: Some(router),
            microscope: Some(microscope),
            corrector: Some(corrector),
        }
    }

    fn endpoint(handle: Option<&ServerHandle>) -> Endpoint {
        handle.expect("server running").endpoint()
    }

    pub(crate) fn router_endpoint(&self) -> Endpoint {
        Self::endpoint(self.router.as_ref())
    }

    pub(crate) fn routes(&self) -> RouteTableSpec {
        RouteTableSpec::new(vec![
            ("AS".into(), Self::endpoint(self.microscope.as_ref())),
            ("Ceos".into(), Self::endpoint(self.corrector.as_ref())),
        ])
    }

    pub(crate) fn config(&self) -> Config {
        Config {
            central: self.router_endpoint(),
            routes: self.routes(),
            backend: BackendMode::Routed,
            connect_timeout_ms: 500,
            call_timeout_ms: 2_000,
            ..Config::default()
        }
    }

    /// Stops the AS server, leaving its route dangling.
    pub(crate) fn stop_microscope(&mut self) {
        if let Some(handle) = self.microscope.take() {
            handle.stop().expect("stop AS");
        }
    }
}

impl Drop for Cluster {
    fn drop(&mut self) {
        for handle in [
            self.router.take(),
            self.microscope.take(),
            self.corrector.take(),
        ]
        .into_iter()
        .flatten()
        {
            let _ = handle.stop();
        }
    }
}
