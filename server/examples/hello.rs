//! Minimal server: greets every request and logs an access line.

use sorrel_http::{Connection, Request, Response, Status};
use sorrel_server::{AddressFamily, ListenAddress, Server};
use std::{sync::Arc, time::Duration};

fn greet(_connection: &Arc<Connection>, request: &mut Request) -> sorrel_http::Result<Response> {
    if request.suggested_status != Status::OK {
        return Ok(Response::new(request.suggested_status.clone()));
    }
    Ok(Response::text(format!(
        "Hello from {}\n",
        request.url.path
    )))
}

fn main() -> std::io::Result<()> {
    env_logger::init();

    let mut server = Server::new(ListenAddress::new(AddressFamily::V4, "", 8088), greet)
        .with_timeout(Duration::from_secs(16))
        .with_log_format("%h %l %u %t \"%r\" %s %b");
    server.start()?;
    println!("listening on {}", server.local_addr().expect("bound address"));

    loop {
        std::thread::park();
    }
}
