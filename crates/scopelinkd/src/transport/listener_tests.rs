//! Tests for the socket listener.

use std::io::Read;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rstest::{fixture, rstest};

use scopelink_config::Endpoint;

use super::listener::SocketListener;
use super::{ConnectionHandler, ListenerError};

/// Counts accepted connections and drops them immediately.
struct CountingHandler(Arc<AtomicUsize>);

impl ConnectionHandler for CountingHandler {
    fn handle(&self, _stream: TcpStream) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[fixture]
fn accepted() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

#[fixture]
fn tcp_endpoint() -> Endpoint {
    Endpoint::new("127.0.0.1", 0)
}

fn wait_for_count(count: &AtomicUsize, expected: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if count.load(Ordering::SeqCst) >= expected {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[rstest]
fn tcp_listener_accepts_connections(tcp_endpoint: Endpoint, accepted: Arc<AtomicUsize>) {
    let listener = SocketListener::bind(&tcp_endpoint).expect("bind tcp listener");
    let addr = listener.local_addr();
    let handle = listener
        .start(Arc::new(CountingHandler(Arc::clone(&accepted))))
        .expect("start listener");

    TcpStream::connect(addr).expect("connect first client");
    TcpStream::connect(addr).expect("connect second client");

    assert!(wait_for_count(&accepted, 2), "expected two connections");
    handle.shutdown();
    handle.join().expect("join listener");
}

#[rstest]
fn binding_a_taken_port_fails(tcp_endpoint: Endpoint) {
    let first = SocketListener::bind(&tcp_endpoint).expect("bind first listener");
    let taken = Endpoint::from(first.local_addr());
    let error = SocketListener::bind(&taken).expect_err("second bind must fail");
    assert!(matches!(error, ListenerError::BindTcp { .. }));
}

struct HoldingHandler;

impl ConnectionHandler for HoldingHandler {
    fn handle(&self, mut stream: TcpStream) {
        let mut buffer = [0_u8; 16];
        while matches!(stream.read(&mut buffer), Ok(read) if read > 0) {}
    }
}

#[rstest]
fn shutdown_closes_open_connections(tcp_endpoint: Endpoint) {
    let listener = SocketListener::bind(&tcp_endpoint).expect("bind tcp listener");
    let addr = listener.local_addr();
    let handle = listener
        .start(Arc::new(HoldingHandler))
        .expect("start listener");

    let mut client = TcpStream::connect(addr).expect("connect client");
    client
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("read timeout");
    std::thread::sleep(Duration::from_millis(100));
    handle.shutdown();
    handle.join().expect("join listener");

    let mut buffer = [0_u8; 1];
    let read = client.read(&mut buffer).expect("server closed the stream");
    assert_eq!(read, 0, "expected end of stream after shutdown");
}
