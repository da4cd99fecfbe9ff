use sorrel_http::{Connection, Request, Response, Status};
use sorrel_server::{AddressFamily, ListenAddress, Server};
use std::{
    io::{Read, Write},
    net::{SocketAddr, TcpStream},
    sync::Arc,
    time::{Duration, Instant},
};

fn ping_handler(
    _connection: &Arc<Connection>,
    request: &mut Request,
) -> sorrel_http::Result<Response> {
    if request.suggested_status != Status::OK {
        return Ok(Response::new(request.suggested_status.clone()));
    }
    if request.url.path.to_string() == "/ping" {
        Ok(Response::text("pong"))
    } else {
        Ok(Response::new(Status::NOT_FOUND))
    }
}

fn start_server(timeout: Duration) -> (Server, SocketAddr) {
    let mut server = Server::new(
        ListenAddress::new(AddressFamily::V4, "127.0.0.1", 0),
        ping_handler,
    )
    .with_timeout(timeout)
    .with_log_format("%h %l %u %t \"%r\" %s %b");
    server.start().unwrap();
    let addr = server.local_addr().unwrap();
    (server, addr)
}

fn exchange(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();
    stream.write_all(request.as_bytes()).unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    response
}

#[test]
fn responds_to_ping() {
    let (_server, addr) = start_server(Duration::from_secs(5));
    let response = exchange(addr, "GET /ping HTTP/1.1\r\nHost: localhost\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.contains("Content-Length: 4\r\n"), "{response}");
    assert!(response.ends_with("\r\n\r\npong"), "{response}");
}

#[test]
fn unknown_paths_get_404() {
    let (_server, addr) = start_server(Duration::from_secs(5));
    let response = exchange(addr, "GET /other HTTP/1.1\r\nHost: localhost\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"), "{response}");
}

#[test]
fn malformed_requests_get_400() {
    let (_server, addr) = start_server(Duration::from_secs(5));
    let response = exchange(addr, "total nonsense\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{response}");
}

#[test]
fn concurrent_clients_observe_independent_responses() {
    let (_server, addr) = start_server(Duration::from_secs(5));

    let ping = std::thread::spawn(move || {
        exchange(addr, "GET /ping HTTP/1.1\r\nHost: localhost\r\n\r\n")
    });
    let miss = std::thread::spawn(move || {
        exchange(addr, "GET /other HTTP/1.1\r\nHost: localhost\r\n\r\n")
    });

    let ping = ping.join().unwrap();
    let miss = miss.join().unwrap();
    assert!(ping.ends_with("pong"), "{ping}");
    assert!(miss.starts_with("HTTP/1.1 404"), "{miss}");
}

#[test]
fn idle_connections_are_closed_on_deadline() {
    let (_server, addr) = start_server(Duration::from_millis(250));

    let started = Instant::now();
    let mut stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();

    // say nothing; the server's deadline should end the connection
    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    if !response.is_empty() {
        assert!(response.starts_with("HTTP/1.1 408"), "{response}");
    }
}

#[test]
fn stop_unbinds_the_port() {
    let (mut server, addr) = start_server(Duration::from_secs(5));
    server.stop();
    assert!(!server.started());

    // a fresh connection is either refused outright or, if it landed in
    // the accept backlog, never answered
    if let Ok(mut stream) = TcpStream::connect(addr) {
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        stream.write_all(b"GET /ping HTTP/1.1\r\n\r\n").ok();
        let mut buf = String::new();
        let answered = stream.read_to_string(&mut buf).is_ok() && !buf.is_empty();
        assert!(!answered, "{buf}");
    }
}
