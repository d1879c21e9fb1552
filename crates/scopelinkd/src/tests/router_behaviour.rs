//! Behavioural tests for the central router.

use std::cell::RefCell;
use std::io::Write;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rstest::{fixture, rstest};
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Value, json};

use scopelink_wire::{
    CommandRequest, CommandResponse, ErrorKind, Frame, FrameLimits, FrameReader, Message, encode,
};

use crate::dispatch::{CommandService, CommandSession, Reply};
use crate::instruments::{InstrumentSettings, autoscript, ceos};
use crate::router::{CentralRouter, ForwardSettings, RoutingTable};
use crate::server::ServerHandle;

use super::support::{TestClient, error_message, start, text};

fn forward_settings() -> ForwardSettings {
    ForwardSettings {
        connect_timeout: Duration::from_millis(500),
        call_timeout: Duration::from_secs(2),
        ..ForwardSettings::default()
    }
}

fn start_router() -> ServerHandle {
    let router = CentralRouter::new(RoutingTable::new(), forward_settings()).expect("router");
    start(Arc::new(router))
}

fn route_args(routes: &[(&str, &ServerHandle)]) -> Value {
    let map: serde_json::Map<String, Value> = routes
        .iter()
        .map(|(name, server)| {
            let addr = server.local_addr();
            (
                (*name).to_owned(),
                json!([addr.ip().to_string(), addr.port()]),
            )
        })
        .collect();
    Value::Object(map)
}

#[derive(Default)]
struct RouterWorld {
    router: Option<ServerHandle>,
    instruments: Vec<ServerHandle>,
    client: Option<TestClient>,
    response: Option<CommandResponse>,
}

impl RouterWorld {
    fn client(&mut self) -> &mut TestClient {
        if self.client.is_none() {
            let addr = self.router.as_ref().expect("router running").local_addr();
            self.client = Some(TestClient::connect(addr));
        }
        self.client.as_mut().expect("client connected")
    }

    fn send(&mut self, destination: &str, command: &str, args: Value) {
        let response = self.client().call(destination, command, args);
        self.response = Some(response);
    }

    fn response(&self) -> &CommandResponse {
        self.response.as_ref().expect("a response was received")
    }
}

impl Drop for RouterWorld {
    fn drop(&mut self) {
        self.client.take();
        if let Some(router) = self.router.take() {
            let _ = router.stop();
        }
        for server in self.instruments.drain(..) {
            let _ = server.stop();
        }
    }
}

#[fixture]
fn world() -> RefCell<RouterWorld> {
    RefCell::new(RouterWorld::default())
}

fn strip_quotes(s: &str) -> &str {
    s.trim_matches('"')
}

#[given("a central router is running")]
fn given_router(world: &RefCell<RouterWorld>) {
    world.borrow_mut().router = Some(start_router());
}

#[given("AS and Ceos servers are registered with the router")]
fn given_instruments(world: &RefCell<RouterWorld>) {
    let mut world = world.borrow_mut();
    let settings = InstrumentSettings::default();
    let as_server = start(Arc::new(autoscript::dispatcher(settings).expect("AS")));
    let ceos_server = start(Arc::new(ceos::dispatcher(settings).expect("Ceos")));
    let table = route_args(&[("AS", &as_server), ("Ceos", &ceos_server)]);
    world.instruments.push(as_server);
    world.instruments.push(ceos_server);
    world.send("Central", "set_routing_table", table);
    assert!(!world.response().is_error(), "table accepted");
}

#[given(r#""{destination}" is routed to a closed port"#)]
fn given_closed_route(world: &RefCell<RouterWorld>, destination: String) {
    let port = {
        let probe = TcpListener::bind("127.0.0.1:0").expect("probe port");
        probe.local_addr().expect("probe addr").port()
    };
    let mut world = world.borrow_mut();
    let table = json!({ strip_quotes(&destination): ["127.0.0.1", port] });
    world.send("Central", "set_routing_table", table);
    assert!(!world.response().is_error(), "table accepted");
}

#[when("the routing table is replaced with no entries")]
fn when_table_emptied(world: &RefCell<RouterWorld>) {
    world
        .borrow_mut()
        .send("Central", "set_routing_table", json!({}));
}

#[when(r#"the client sends "{command}" to "{destination}" through the router"#)]
fn when_client_sends(world: &RefCell<RouterWorld>, command: String, destination: String) {
    world
        .borrow_mut()
        .send(strip_quotes(&destination), strip_quotes(&command), json!({}));
}

#[then("the confirmation reports {size} routes")]
fn then_confirmation_size(world: &RefCell<RouterWorld>, size: u64) {
    let world = world.borrow();
    let CommandResponse::Structured(body) = world.response() else {
        panic!("expected confirmation, got {:?}", world.response());
    };
    assert_eq!(body.get("size"), Some(&json!(size)));
}

#[then(r#"the response is an "{kind}" error naming "{name}""#)]
fn then_error_naming(world: &RefCell<RouterWorld>, kind: String, name: String) {
    let world = world.borrow();
    let response = world.response();
    let expected: ErrorKind = strip_quotes(&kind).parse().expect("error kind");
    assert_eq!(response.error_kind(), Some(expected), "got {response:?}");
    assert!(error_message(response).contains(strip_quotes(&name)));
}

#[then(r#"the response text starts with "{prefix}""#)]
fn then_text_prefix(world: &RefCell<RouterWorld>, prefix: String) {
    let world = world.borrow();
    let message = text(world.response());
    assert!(message.starts_with(strip_quotes(&prefix)), "got {message}");
}

#[scenario(
    path = "tests/features/central_routing.feature",
    name = "An empty routing table knows no destinations"
)]
fn empty_routing_table(#[from(world)] world: RefCell<RouterWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/central_routing.feature",
    name = "Requests reach the instrument named by the destination"
)]
fn requests_reach_named_instrument(#[from(world)] world: RefCell<RouterWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/central_routing.feature",
    name = "An unreachable instrument is reported as a connection error"
)]
fn unreachable_instrument(#[from(world)] world: RefCell<RouterWorld>) {
    drop(world);
}

/// Counts sessions so tests can tell whether a server was contacted.
struct CountingService {
    sessions: AtomicUsize,
    label: &'static str,
}

struct LabelSession(&'static str);

impl CommandSession for LabelSession {
    fn handle(&mut self, request: &CommandRequest, _frame: &Frame) -> Reply {
        Reply::Response(CommandResponse::text(format!(
            "{} handled {}",
            self.0, request.command
        )))
    }
}

impl CommandService for CountingService {
    fn open_session(&self) -> Box<dyn CommandSession> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        Box::new(LabelSession(self.label))
    }
}

fn counting(label: &'static str) -> Arc<CountingService> {
    Arc::new(CountingService {
        sessions: AtomicUsize::new(0),
        label,
    })
}

#[rstest]
fn destinations_never_cross() {
    let first = counting("a1");
    let second = counting("a2");
    let first_server = start(first.clone());
    let second_server = start(second.clone());
    let router = start_router();
    let mut client = TestClient::connect(router.local_addr());

    let table = route_args(&[("AS", &first_server), ("Ceos", &second_server)]);
    let confirmation = client.call("Central", "set_routing_table", table);
    assert!(!confirmation.is_error());

    for _ in 0..3 {
        assert_eq!(text(&client.call("AS", "ping", json!({}))), "a1 handled ping");
    }
    let unknown = client.call("Unknown", "ping", json!({}));
    assert_eq!(unknown.error_kind(), Some(ErrorKind::UnknownDestination));

    assert_eq!(first.sessions.load(Ordering::SeqCst), 1, "link reused");
    assert_eq!(second.sessions.load(Ordering::SeqCst), 0, "Ceos never contacted");

    drop(client);
    router.stop().expect("stop router");
    first_server.stop().expect("stop a1");
    second_server.stop().expect("stop a2");
}

#[rstest]
fn relayed_responses_are_byte_identical() {
    let instrument = start(Arc::new(
        autoscript::dispatcher(InstrumentSettings::default()).expect("AS"),
    ));
    let router = start_router();

    let mut routed = TestClient::connect(router.local_addr());
    routed.call(
        "Central",
        "set_routing_table",
        route_args(&[("AS", &instrument)]),
    );
    let mut direct = TestClient::connect(instrument.local_addr());

    let via_router = routed.call("AS", "move_stage", json!({"x": 1.5, "y": 2.5}));
    let stage_direct = direct.call("AS", "get_stage", json!({}));
    let stage_routed = routed.call("AS", "get_stage", json!({}));
    assert_eq!(text(&via_router), "Stage moved to 1.5, 2.5");
    assert_eq!(
        encode(&Message::Response(stage_routed)).expect("encode"),
        encode(&Message::Response(stage_direct)).expect("encode")
    );

    drop(routed);
    drop(direct);
    router.stop().expect("stop router");
    instrument.stop().expect("stop instrument");
}

#[rstest]
fn central_entries_are_ignored_and_reported() {
    let router = start_router();
    let mut client = TestClient::connect(router.local_addr());
    let response = client.call(
        "Central",
        "set_routing_table",
        json!({"Central": ["127.0.0.1", 9000], "AS": "tcp://127.0.0.1:9001"}),
    );
    let CommandResponse::Structured(body) = response else {
        panic!("expected confirmation");
    };
    assert_eq!(body.get("size"), Some(&json!(1)));
    assert_eq!(body.get("ignored"), Some(&json!(["Central"])));
    assert_eq!(
        body.get("routes"),
        Some(&json!({"AS": ["127.0.0.1", 9001]}))
    );

    let listing = client.call("Central", "get_routing_table", json!({}));
    let CommandResponse::Structured(listing) = listing else {
        panic!("expected routing table");
    };
    assert_eq!(listing.get("size"), Some(&json!(1)));
    drop(client);
    router.stop().expect("stop router");
}

#[rstest]
fn silent_instruments_time_out() {
    struct Silent;
    struct SilentSession;
    impl CommandSession for SilentSession {
        fn handle(&mut self, _request: &CommandRequest, _frame: &Frame) -> Reply {
            std::thread::sleep(Duration::from_millis(800));
            Reply::Response(CommandResponse::text("late"))
        }
    }
    impl CommandService for Silent {
        fn open_session(&self) -> Box<dyn CommandSession> {
            Box::new(SilentSession)
        }
    }

    let slow = start(Arc::new(Silent));
    let router = CentralRouter::new(
        RoutingTable::new(),
        ForwardSettings {
            call_timeout: Duration::from_millis(200),
            ..forward_settings()
        },
    )
    .expect("router");
    let router = start(Arc::new(router));
    let mut client = TestClient::connect(router.local_addr());
    client.call("Central", "set_routing_table", route_args(&[("AS", &slow)]));

    let response = client.call("AS", "anything", json!({}));
    assert_eq!(response.error_kind(), Some(ErrorKind::Timeout));

    drop(client);
    router.stop().expect("stop router");
    slow.stop().expect("stop slow server");
}

/// Answers the first request with a 20 byte text frame, one byte per 150 ms.
fn trickling_instrument() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind trickling instrument");
    let addr = listener.local_addr().expect("trickling instrument address");
    std::thread::spawn(move || {
        let Ok((stream, _)) = listener.accept() else {
            return;
        };
        let Ok(mut writer) = stream.try_clone() else {
            return;
        };
        let mut reader = FrameReader::new(stream, FrameLimits::default());
        if !matches!(reader.read_frame(), Ok(Some(_))) {
            return;
        }
        if writer.write_all(&[0, 0, 0, 20, 0x10]).is_err() {
            return;
        }
        for _ in 0..20 {
            std::thread::sleep(Duration::from_millis(150));
            if writer.write_all(b"a").is_err() {
                return;
            }
        }
    });
    addr
}

#[rstest]
fn trickling_instruments_time_out() {
    let addr = trickling_instrument();
    let router = CentralRouter::new(
        RoutingTable::new(),
        ForwardSettings {
            call_timeout: Duration::from_millis(400),
            ..forward_settings()
        },
    )
    .expect("router");
    let router = start(Arc::new(router));
    let mut client = TestClient::connect(router.local_addr());
    client.call(
        "Central",
        "set_routing_table",
        json!({"AS": [addr.ip().to_string(), addr.port()]}),
    );

    let started = Instant::now();
    let response = client.call("AS", "get_status", json!({}));
    let elapsed = started.elapsed();
    assert_eq!(response.error_kind(), Some(ErrorKind::Timeout), "got {response:?}");
    assert!(elapsed < Duration::from_millis(1500), "took {elapsed:?}");

    drop(client);
    router.stop().expect("stop router");
}
