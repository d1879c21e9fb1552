//! Behavioural tests for command dispatch over TCP.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::json;

use scopelink_wire::{CommandResponse, ErrorKind};

use crate::instruments::{InstrumentSettings, autoscript};
use crate::server::ServerHandle;

use super::support::{TestClient, error_message, start, text};

#[derive(Default)]
struct DispatchWorld {
    server: Option<ServerHandle>,
    client: Option<TestClient>,
    response: Option<CommandResponse>,
}

impl DispatchWorld {
    fn client(&mut self) -> &mut TestClient {
        if self.client.is_none() {
            let addr = self.server.as_ref().expect("server running").local_addr();
            self.client = Some(TestClient::connect(addr));
        }
        self.client.as_mut().expect("client connected")
    }

    fn send(&mut self, destination: &str, command: &str, args: serde_json::Value) {
        let response = self.client().call(destination, command, args);
        self.response = Some(response);
    }

    fn response(&self) -> &CommandResponse {
        self.response.as_ref().expect("a response was received")
    }
}

impl Drop for DispatchWorld {
    fn drop(&mut self) {
        self.client.take();
        if let Some(server) = self.server.take() {
            let _ = server.stop();
        }
    }
}

#[fixture]
fn world() -> RefCell<DispatchWorld> {
    RefCell::new(DispatchWorld::default())
}

/// Strips surrounding double quotes from a string if present.
fn strip_quotes(s: &str) -> &str {
    s.trim_matches('"')
}

#[given("an AS server is running")]
fn given_as_server(world: &RefCell<DispatchWorld>) {
    let dispatcher =
        autoscript::dispatcher(InstrumentSettings::default()).expect("AS dispatcher");
    world.borrow_mut().server = Some(start(std::sync::Arc::new(dispatcher)));
}

#[when(r#"the client sends "{command}" to "{destination}""#)]
fn when_client_sends(world: &RefCell<DispatchWorld>, command: String, destination: String) {
    world
        .borrow_mut()
        .send(strip_quotes(&destination), strip_quotes(&command), json!({}));
}

#[when(r#"a new connection sends "{command}" to "{destination}""#)]
fn when_new_connection_sends(world: &RefCell<DispatchWorld>, command: String, destination: String) {
    let mut world = world.borrow_mut();
    world.client = None;
    world.send(strip_quotes(&destination), strip_quotes(&command), json!({}));
}

#[when(r#"the client moves the stage to {x}, {y} with "{command}""#)]
fn when_client_moves_stage(world: &RefCell<DispatchWorld>, x: f64, y: f64, command: String) {
    world
        .borrow_mut()
        .send("AS", strip_quotes(&command), json!({"x": x, "y": y}));
}

#[then(r#"the response is an "{kind}" error naming "{name}""#)]
fn then_error_naming(world: &RefCell<DispatchWorld>, kind: String, name: String) {
    let world = world.borrow();
    let response = world.response();
    let expected: ErrorKind = strip_quotes(&kind).parse().expect("error kind");
    assert_eq!(response.error_kind(), Some(expected), "got {response:?}");
    assert!(error_message(response).contains(strip_quotes(&name)));
}

#[then(r#"the response text is "{expected}""#)]
fn then_response_text(world: &RefCell<DispatchWorld>, expected: String) {
    assert_eq!(text(world.borrow().response()), strip_quotes(&expected));
}

#[then("the response text mentions {x} and {y}")]
fn then_text_mentions(world: &RefCell<DispatchWorld>, x: String, y: String) {
    let world = world.borrow();
    let message = text(world.response());
    assert!(message.contains(&x) && message.contains(&y), "got {message}");
}

#[then("the stage reads {x}, {y}")]
fn then_stage_reads(world: &RefCell<DispatchWorld>, x: f64, y: f64) {
    let world = world.borrow();
    let CommandResponse::Array(array) = world.response() else {
        panic!("expected stage array, got {:?}", world.response());
    };
    let values = array.to_f64_vec();
    assert_eq!(values.get(..2), Some(&[x, y][..]));
}

#[scenario(
    path = "tests/features/instrument_dispatch.feature",
    name = "Unknown commands are reported and the server keeps serving"
)]
fn unknown_commands_keep_serving(#[from(world)] world: RefCell<DispatchWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/instrument_dispatch.feature",
    name = "Stage moves are visible to later commands"
)]
fn stage_moves_are_visible(#[from(world)] world: RefCell<DispatchWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/instrument_dispatch.feature",
    name = "Aliases reach the same handler"
)]
fn aliases_reach_the_same_handler(#[from(world)] world: RefCell<DispatchWorld>) {
    drop(world);
}
