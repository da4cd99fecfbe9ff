use pretty_assertions::assert_eq;
use sorrel_client::{AsyncClient, Client, Error};
use sorrel_http::{Connection, Request, Response, Status, Uri};
use sorrel_server::{AddressFamily, ListenAddress, Server};
use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        mpsc, Arc,
    },
    time::Duration,
};

fn handler(
    _connection: &Arc<Connection>,
    request: &mut Request,
) -> sorrel_http::Result<Response> {
    if request.suggested_status != Status::OK {
        return Ok(Response::new(request.suggested_status.clone()));
    }

    match request.url.path.to_string().as_str() {
        "/ping" => Ok(Response::text("pong")),
        "/redirect" => {
            let mut response = Response::redirect(&Uri::from("/ping"));
            response.headers.set("Connection", "close");
            Ok(response)
        }
        "/loop" => {
            let mut response = Response::redirect(&Uri::from("/loop"));
            response.headers.set("Connection", "close");
            Ok(response)
        }
        "/slow" => {
            std::thread::sleep(Duration::from_secs(2));
            Ok(Response::text("eventually"))
        }
        _ => Ok(Response::new(Status::NOT_FOUND)),
    }
}

fn start_server() -> Server {
    let mut server = Server::new(
        ListenAddress::new(AddressFamily::V4, "127.0.0.1", 0),
        handler,
    )
    .with_timeout(Duration::from_secs(10));
    server.start().unwrap();
    server
}

fn uri(server: &Server, path: &str) -> Uri {
    Uri::from(format!("http://{}{path}", server.local_addr().unwrap()).as_str())
}

#[test]
fn queries_a_live_server() {
    let server = start_server();
    let client = Client::new().with_timeout(Duration::from_secs(5));

    let mut request = Request::get(uri(&server, "/ping"));
    let mut response = client.query(&mut request).unwrap();

    assert_eq!(response.status, Status::OK);
    assert_eq!(response.body.read_string().unwrap(), "pong");
}

#[test]
fn sets_the_user_agent() {
    let server = start_server();
    let client = Client::new()
        .with_timeout(Duration::from_secs(5))
        .with_user_agent("test-pony/1.0");

    let mut request = Request::get(uri(&server, "/ping"));
    client.query(&mut request).unwrap();
    assert_eq!(&request.headers["User-Agent"], "test-pony/1.0");
}

#[test]
fn follows_one_redirect() {
    let server = start_server();
    let attempts = Arc::new(AtomicU32::new(0));
    let seen = attempts.clone();
    let client = Client::new()
        .with_timeout(Duration::from_secs(5))
        .with_max_redirects(5)
        .with_response_hook(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

    let mut request = Request::post(uri(&server, "/redirect"));
    let mut response = client.query(&mut request).unwrap();

    assert_eq!(response.status, Status::OK);
    assert_eq!(response.body.read_string().unwrap(), "pong");
    // the redirect rewrote the method and target
    assert_eq!(request.method, sorrel_http::Method::Get);
    assert_eq!(request.url.path.to_string(), "/ping");
    // initial attempt plus one follow-up
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn reports_too_many_redirects() {
    let server = start_server();
    let client = Client::new()
        .with_timeout(Duration::from_secs(5))
        .with_max_redirects(2);

    let mut request = Request::get(uri(&server, "/loop"));
    let error = client.query(&mut request).unwrap_err();
    assert!(matches!(error, Error::TooManyRedirects));
    assert_eq!(error.to_string(), "too many redirects");
}

#[test]
fn reports_timeouts() {
    let server = start_server();
    let client = Client::new().with_timeout(Duration::from_millis(250));

    let mut request = Request::get(uri(&server, "/slow"));
    let error = client.query(&mut request).unwrap_err();
    assert!(matches!(error, Error::Timeout), "{error}");
    assert_eq!(error.to_string(), "timeout");
}

#[test]
fn connection_refused_surfaces_the_system_error() {
    // bind a port and drop the listener so nothing is there
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let client = Client::new().with_timeout(Duration::from_secs(5));
    let mut request = Request::get(Uri::from(format!("http://127.0.0.1:{port}/").as_str()));
    let error = client.query(&mut request).unwrap_err();
    assert!(
        matches!(error, Error::Io(_)),
        "unexpected error: {error:?}"
    );
}

#[test]
fn async_client_fires_callbacks_in_order() {
    let server = start_server();
    let mut async_client =
        AsyncClient::new(Client::new().with_timeout(Duration::from_secs(5)));
    async_client.start().unwrap();

    let (sender, receiver) = mpsc::channel::<String>();
    let on_response = {
        let sender = sender.clone();
        move |_request: &mut Request, response: &mut Response| {
            let body = response.body.read_string().unwrap_or_default();
            sender
                .send(format!("response {} {body}", response.status.code))
                .ok();
        }
    };
    let on_connect = {
        let sender = sender.clone();
        move |_request: &Request| {
            sender.send("connect".to_string()).ok();
        }
    };
    let on_error = move |_request: &mut Request, error: Error| {
        sender.send(format!("error {error}")).ok();
    };

    async_client.async_query(Request::get(uri(&server, "/ping")), on_response, on_connect, on_error);

    let timeout = Duration::from_secs(10);
    assert_eq!(receiver.recv_timeout(timeout).unwrap(), "connect");
    assert_eq!(receiver.recv_timeout(timeout).unwrap(), "response 200 pong");

    async_client.stop();
    assert!(!async_client.started());
}

#[test]
fn async_client_reports_errors() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut async_client =
        AsyncClient::new(Client::new().with_timeout(Duration::from_secs(2)));
    async_client.start().unwrap();

    let (sender, receiver) = mpsc::channel::<String>();
    let on_response = {
        let sender = sender.clone();
        move |_request: &mut Request, _response: &mut Response| {
            sender.send("response".to_string()).ok();
        }
    };
    let on_connect = {
        let sender = sender.clone();
        move |_request: &Request| {
            sender.send("connect".to_string()).ok();
        }
    };
    let on_error = move |_request: &mut Request, _error: Error| {
        sender.send("error".to_string()).ok();
    };

    async_client.async_query(
        Request::get(Uri::from(format!("http://127.0.0.1:{port}/").as_str())),
        on_response,
        on_connect,
        on_error,
    );

    assert_eq!(
        receiver.recv_timeout(Duration::from_secs(10)).unwrap(),
        "error"
    );
}
