//! Behavioural coverage for layered configuration loading.

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::sync::{Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use ortho_config::OrthoConfig;
use scopelink_config::{
    Config, Endpoint, RouteTableSpec, ServerRole, default_central_endpoint, default_log_filter,
    default_log_format, default_routes,
};

/// Variables a scenario may touch; each is cleared up front and restored after.
const MANAGED_VARS: [&str; 2] = ["SCOPELINK_CENTRAL", "SCOPELINK_ROUTES"];

static PROCESS_ENV: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct LayeredWorld {
    workdir: TempDir,
    argv: Vec<OsString>,
    saved_env: Vec<(&'static str, Option<OsString>)>,
    outcome: Option<Result<Config, String>>,
    _env_lock: MutexGuard<'static, ()>,
}

impl LayeredWorld {
    fn new() -> Self {
        let env_lock = PROCESS_ENV.lock().unwrap_or_else(PoisonError::into_inner);
        let saved_env = MANAGED_VARS
            .iter()
            .map(|&name| (name, std::env::var_os(name)))
            .collect();
        for name in MANAGED_VARS {
            // Edition 2024 marks env mutation unsafe; PROCESS_ENV serialises it.
            unsafe { std::env::remove_var(name) };
        }
        Self {
            workdir: TempDir::new().expect("temporary directory"),
            argv: vec![OsString::from("scopelinkd")],
            saved_env,
            outcome: None,
            _env_lock: env_lock,
        }
    }

    fn file_layer(&mut self, toml: &str) {
        let path = self.workdir.path().join("scopelink.toml");
        fs::write(&path, toml).expect("write configuration file");
        self.argv.push(OsString::from("--config-path"));
        self.argv.push(path.into_os_string());
    }

    fn env_layer(name: &str, value: &str) {
        assert!(MANAGED_VARS.contains(&name), "{name} is not restored after the scenario");
        unsafe { std::env::set_var(name, value) };
    }

    fn flag_layer(&mut self, flag: &str, value: &str) {
        self.argv.push(OsString::from(flag));
        self.argv.push(OsString::from(value));
    }

    fn loaded(&mut self) -> &Config {
        let argv = self.argv.clone();
        let outcome = self
            .outcome
            .get_or_insert_with(|| Config::load_from_iter(argv).map_err(|error| error.to_string()));
        match outcome {
            Ok(config) => config,
            Err(error) => panic!("configuration failed to load: {error}"),
        }
    }
}

impl Drop for LayeredWorld {
    fn drop(&mut self) {
        for (name, value) in self.saved_env.drain(..) {
            match value {
                Some(previous) => unsafe { std::env::set_var(name, previous) },
                None => unsafe { std::env::remove_var(name) },
            }
        }
    }
}

fn endpoint(raw: &str) -> Endpoint {
    raw.trim_matches('"').parse().expect("endpoint literal")
}

#[fixture]
fn world() -> RefCell<LayeredWorld> {
    RefCell::new(LayeredWorld::new())
}

#[given("a configuration file setting the central router to \"{central}\"")]
fn given_file_central(world: &RefCell<LayeredWorld>, central: String) {
    let toml = format!("central = \"{}\"\nrole = \"as\"\n", endpoint(&central));
    world.borrow_mut().file_layer(&toml);
}

#[given("the environment overrides the central router to \"{central}\"")]
fn given_env_central(central: String) {
    LayeredWorld::env_layer("SCOPELINK_CENTRAL", central.trim_matches('"'));
}

#[given("the environment routes \"{name}\" to \"{target}\"")]
fn given_env_route(name: String, target: String) {
    let value = format!("{}={}", name.trim_matches('"'), endpoint(&target));
    LayeredWorld::env_layer("SCOPELINK_ROUTES", &value);
}

#[when("the CLI sets the central router to \"{central}\"")]
fn when_flag_central(world: &RefCell<LayeredWorld>, central: String) {
    world
        .borrow_mut()
        .flag_layer("--central", central.trim_matches('"'));
}

#[when("the configuration loads without overrides")]
fn when_plain_load(world: &RefCell<LayeredWorld>) {
    world.borrow_mut().loaded();
}

#[then("loading the configuration resolves the central router to \"{central}\"")]
fn then_central_is(world: &RefCell<LayeredWorld>, central: String) {
    let mut world = world.borrow_mut();
    let config = world.loaded();
    assert_eq!(config.central, endpoint(&central));
    assert_eq!(config.role, ServerRole::As, "the file layer still applies");
}

#[then("loading the configuration applies the built-in defaults")]
fn then_defaults(world: &RefCell<LayeredWorld>) {
    let mut world = world.borrow_mut();
    let config = world.loaded();
    assert_eq!(config.role, ServerRole::Central);
    assert_eq!(config.central, default_central_endpoint());
    assert_eq!(config.routes, default_routes());
    assert_eq!(config.log_filter(), default_log_filter());
    assert_eq!(config.log_format(), default_log_format());
    assert_eq!(config.listen_endpoint().port(), 9000);
}

#[then("the route table holds only \"{name}\" at \"{target}\"")]
fn then_single_route(world: &RefCell<LayeredWorld>, name: String, target: String) {
    let mut world = world.borrow_mut();
    let expected = RouteTableSpec::new(vec![(name.trim_matches('"').to_owned(), endpoint(&target))]);
    assert_eq!(world.loaded().routes, expected);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Built-in defaults apply without overrides"
)]
fn defaults_apply(#[from(world)] world: RefCell<LayeredWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Configuration file overrides defaults"
)]
fn file_overrides_defaults(#[from(world)] world: RefCell<LayeredWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Environment overrides the configuration file"
)]
fn environment_overrides_file(#[from(world)] world: RefCell<LayeredWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Command-line flags override every other layer"
)]
fn cli_overrides_everything(#[from(world)] world: RefCell<LayeredWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/configuration_precedence.feature",
    name = "Routes from the environment replace the default table"
)]
fn environment_routes_replace_defaults(#[from(world)] world: RefCell<LayeredWorld>) {
    drop(world);
}
