//! Loopback tests for the request-serving thread and the outbound calls.
//!
//! A client thread issues blocking requests while the test thread plays the
//! frame loop: it collects, raises events and serves.

use std::io::Write;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use flatengine::events::Protocol;
use flatengine::resources::gameconfig::EngineConfig;
use flatengine::resources::network::{self, NetworkService};
use flatengine::scheduler::Scheduler;
use flatengine::surface::headless::HeadlessSurface;

const LOOPBACK: &str = "127.0.0.1";
const DEADLINE: Duration = Duration::from_secs(10);

fn client<F>(f: F) -> JoinHandle<String>
where
    F: FnOnce() -> String + Send + 'static,
{
    thread::spawn(f)
}

/// Polls `collect` until a request shows up.
fn wait_for_request(service: &mut NetworkService) -> Protocol {
    let started = Instant::now();
    loop {
        if let Some(protocol) = service.collect() {
            return protocol;
        }
        assert!(started.elapsed() < DEADLINE, "no request arrived");
        thread::sleep(Duration::from_millis(1));
    }
}

fn status_of(port: u16, method: reqwest::Method, path: &str) -> u16 {
    reqwest::blocking::Client::new()
        .request(method, format!("http://{LOOPBACK}:{port}{path}"))
        .send()
        .unwrap()
        .status()
        .as_u16()
}

#[test]
fn read_request_is_served_by_the_frame_loop() {
    let mut service = NetworkService::start(LOOPBACK, Duration::from_secs(5)).unwrap();
    let port = service.port();
    let reader = client(move || network::read(LOOPBACK, port));

    assert_eq!(wait_for_request(&mut service), Protocol::Read);
    assert_eq!(service.request(), "");
    assert!(service.client().is_some_and(|c| c.ip().is_loopback()));
    service.serve("state").unwrap();

    assert_eq!(reader.join().unwrap(), "state");
    assert_eq!(service.response(), "state");
    assert!(!service.has_pending());
}

#[test]
fn write_request_carries_its_body() {
    let mut service = NetworkService::start(LOOPBACK, Duration::from_secs(5)).unwrap();
    let port = service.port();
    let writer = client(move || network::write(LOOPBACK, port, "move left"));

    assert_eq!(wait_for_request(&mut service), Protocol::Write);
    assert_eq!(service.request(), "move left");
    service.serve("ok").unwrap();
    assert_eq!(writer.join().unwrap(), "ok");
}

#[test]
fn unserved_request_times_out_with_an_empty_answer() {
    let mut service = NetworkService::start(LOOPBACK, Duration::from_millis(50)).unwrap();
    let port = service.port();
    let reader = client(move || network::read(LOOPBACK, port));

    // Collected but never served.
    wait_for_request(&mut service);
    assert_eq!(reader.join().unwrap(), "");

    // Serving afterwards is harmless.
    service.serve("too late").unwrap();
}

#[test]
fn uncollected_request_times_out() {
    let service = NetworkService::start(LOOPBACK, Duration::from_millis(50)).unwrap();
    let port = service.port();
    assert_eq!(
        status_of(port, reqwest::Method::GET, "/"),
        504,
        "nobody collected the request"
    );
    drop(service);
}

#[test]
fn other_methods_and_paths_never_reach_the_frame_loop() {
    let mut service = NetworkService::start(LOOPBACK, Duration::from_secs(5)).unwrap();
    let port = service.port();
    assert_eq!(status_of(port, reqwest::Method::DELETE, "/"), 405);
    assert_eq!(status_of(port, reqwest::Method::GET, "/status"), 404);
    assert!(service.collect().is_none());
}

#[test]
fn serve_without_a_request_is_rejected() {
    let mut service = NetworkService::start(LOOPBACK, Duration::from_secs(5)).unwrap();
    assert!(service.serve("nothing").is_err());
}

#[test]
fn malformed_request_line_gets_bad_request() {
    let service = NetworkService::start(LOOPBACK, Duration::from_secs(5)).unwrap();
    let mut stream = std::net::TcpStream::connect((LOOPBACK, service.port())).unwrap();
    stream.write_all(b"\r\n\r\n").unwrap();
    let mut reply = String::new();
    std::io::Read::read_to_string(&mut stream, &mut reply).unwrap();
    assert!(reply.starts_with("HTTP/1.1 400"), "{reply}");
}

#[test]
fn outbound_call_to_a_closed_port_is_empty() {
    let port = {
        let listener = std::net::TcpListener::bind((LOOPBACK, 0)).unwrap();
        listener.local_addr().unwrap().port()
    };
    assert_eq!(network::read(LOOPBACK, port), "");
    assert_eq!(network::write(LOOPBACK, port, "hello"), "");
}

#[test]
fn destroyed_service_stops_its_thread() {
    let mut service = NetworkService::start(LOOPBACK, Duration::from_secs(5)).unwrap();
    assert!(service.running());
    service.destroy();
    assert!(!service.running());
}

#[test]
fn script_answers_requests_through_its_network_hook() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("server.lua");
    std::fs::write(
        &script,
        "events = 0
         port = engine.network.start()
         engine.dispatcher.hook(engine.dispatcher.network, function(protocol)
             events = events + 1
             if protocol == engine.network.protocol.write then
                 engine.network.serve('echo:' .. engine.network.request())
             else
                 engine.network.serve('state')
             end
         end)",
    )
    .unwrap();

    let mut s = Scheduler::new(EngineConfig::new(), HeadlessSurface::new(32, 32));
    s.start(&script).unwrap();
    let port: u16 = s.runtime().unwrap().lua().globals().get("port").unwrap();
    assert_ne!(port, 0);

    let mut drive = |handle: JoinHandle<String>| {
        let started = Instant::now();
        while !handle.is_finished() {
            assert!(started.elapsed() < DEADLINE, "client never finished");
            s.advance(0.001).unwrap();
            thread::sleep(Duration::from_millis(1));
        }
        handle.join().unwrap()
    };

    assert_eq!(drive(client(move || network::write(LOOPBACK, port, "hi"))), "echo:hi");
    assert_eq!(drive(client(move || network::read(LOOPBACK, port))), "state");

    // One event per request.
    let lua = s.runtime().unwrap().lua();
    let events: i64 = lua.globals().get("events").unwrap();
    assert_eq!(events, 2);
    let client_ip: String = lua.load("return engine.network.client()").eval().unwrap();
    assert_eq!(client_ip, LOOPBACK);
}
