#![forbid(unsafe_code)]
#![deny(missing_docs)]
/*!
The listening HTTP/1.x server for the sorrel toolkit.

[`ListenServer`] is the raw accept loop; [`Server`] wraps it in a
background thread and dispatches each parsed request to a [`Handler`].
Handler failures are mapped to `500 Internal Server Error` in the
dispatch glue, so a handler may use `?` freely.

```no_run
use sorrel_http::{Connection, Request, Response, Status};
use sorrel_server::{AddressFamily, ListenAddress, Server};
use std::sync::Arc;

fn hello(_connection: &Arc<Connection>, request: &mut Request) -> sorrel_http::Result<Response> {
    if request.suggested_status != Status::OK {
        return Ok(Response::new(request.suggested_status.clone()));
    }
    Ok(Response::text("hello"))
}

let mut server = Server::new(ListenAddress::new(AddressFamily::V4, "", 8080), hello);
server.start().unwrap();
```
*/

mod listen;
pub use listen::{AddressFamily, ListenAddress, ListenServer};

mod log_format;
pub use log_format::log_response;

use sorrel_http::{Connection, Http1Formatter, Http1Parser, Request, Response, Status};
use std::{
    io,
    net::SocketAddr,
    sync::Arc,
    thread::JoinHandle,
    time::Duration,
};
use stopper::Stopper;

/// Application logic invoked once per parsed request.
///
/// The handler builds the [`Response`]; the server writes it back and
/// closes the connection. When the request's
/// [suggested status][Request::suggested_status] is an error, the
/// handler is expected to respond with that status. Returning `Err`
/// produces a `500 Internal Server Error`.
pub trait Handler: Send + Sync + 'static {
    /// Produces the response for one request.
    ///
    /// # Errors
    ///
    /// Any error; the dispatch glue turns it into a 500.
    fn respond(
        &self,
        connection: &Arc<Connection>,
        request: &mut Request,
    ) -> sorrel_http::Result<Response>;
}

impl<F> Handler for F
where
    F: Fn(&Arc<Connection>, &mut Request) -> sorrel_http::Result<Response>
        + Send
        + Sync
        + 'static,
{
    fn respond(
        &self,
        connection: &Arc<Connection>,
        request: &mut Request,
    ) -> sorrel_http::Result<Response> {
        self(connection, request)
    }
}

/// An HTTP/1.x server: a [`ListenServer`] on a background thread plus
/// request dispatch.
///
/// Connections are served one at a time from the accept thread and
/// closed after each response; keep-alive is a deliberate extension
/// point, not implemented here.
pub struct Server {
    listen_address: ListenAddress,
    handler: Arc<dyn Handler>,
    timeout: Option<Duration>,
    parser: Http1Parser,
    formatter: Http1Formatter,
    log_format: Option<Arc<str>>,
    stopper: Stopper,
    thread: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl Server {
    /// A server for `listen_address` dispatching to `handler`; call
    /// [`start`][Server::start] to bind and serve.
    pub fn new(listen_address: impl Into<ListenAddress>, handler: impl Handler) -> Self {
        Self {
            listen_address: listen_address.into(),
            handler: Arc::new(handler),
            timeout: None,
            parser: Http1Parser::new(),
            formatter: Http1Formatter::new(),
            log_format: None,
            stopper: Stopper::new(),
            thread: None,
            local_addr: None,
        }
    }

    /// Chainable setter for the per-connection I/O deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Chainable setter for the wire parser configuration.
    pub fn with_parser(mut self, parser: Http1Parser) -> Self {
        self.parser = parser;
        self
    }

    /// Enables access logging (via `log::info!`) in the given
    /// Apache-style format; see [`log_response`].
    pub fn with_log_format(mut self, format: impl Into<Arc<str>>) -> Self {
        self.log_format = Some(format.into());
        self
    }

    /// The configured listen address.
    pub fn listen_address(&self) -> &ListenAddress {
        &self.listen_address
    }

    /// The bound address, once started. With port 0 this is where the
    /// system actually put the server.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Whether the serving thread is running.
    pub fn started(&self) -> bool {
        self.thread.is_some()
    }

    /// Binds the listening socket and starts serving on a background
    /// thread. Does nothing when already started.
    ///
    /// # Errors
    ///
    /// Bind or thread-spawn failure; the server is left stopped.
    pub fn start(&mut self) -> io::Result<()> {
        if self.started() {
            return Ok(());
        }

        let mut listen_server = ListenServer::new();
        listen_server.start(&self.listen_address)?;
        if let Some(timeout) = self.timeout {
            listen_server.set_timeout(timeout);
        }
        self.local_addr = listen_server.local_addr();
        self.stopper = listen_server.stopper();

        let handler = self.handler.clone();
        let parser = self.parser;
        let formatter = self.formatter.clone();
        let log_format = self.log_format.clone();

        let thread = std::thread::Builder::new()
            .name("sorrel-server".to_string())
            .spawn(move || {
                listen_server.run(
                    |connection| {
                        dispatch(
                            &*handler,
                            &parser,
                            &formatter,
                            log_format.as_deref(),
                            connection,
                        );
                    },
                    |error| log::warn!("error accepting connection: {error}"),
                    Connection::new,
                );
            })?;
        self.thread = Some(thread);
        Ok(())
    }

    /// Stops accepting and joins the serving thread.
    pub fn stop(&mut self) {
        self.stopper.stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("server thread panicked");
            }
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One request/response exchange: parse, handle (mapping handler errors
/// to 500), send, log.
fn dispatch(
    handler: &dyn Handler,
    parser: &Http1Parser,
    formatter: &Http1Formatter,
    log_format: Option<&str>,
    connection: &Arc<Connection>,
) {
    let mut request = connection.read_request(parser);

    let mut response = match handler.respond(connection, &mut request) {
        Ok(response) => response,
        Err(error) => {
            log::error!("handler error: {error}");
            Response::new(Status::INTERNAL_SERVER_ERROR)
        }
    };
    response.connection = Some(connection.clone());

    if let Err(error) = connection.send_response(formatter, &mut response) {
        log::warn!("error sending response: {error}");
    }

    if let Some(format) = log_format {
        log::info!("{}", log_response(format, connection, &request, &response));
    }
}
