use crate::{Connector, Error, Result, TcpConnector};
use async_io::Timer;
use futures_lite::future;
use sorrel_http::{
    Connection, Http1Formatter, Http1Parser, Method, Request, Response, StatusCategory, Uri,
};
use std::{sync::Arc, time::Duration};

/// default User-Agent header
pub const USER_AGENT: &str = concat!("sorrel/", env!("CARGO_PKG_VERSION"));

type RequestHook = Box<dyn Fn(&mut Request) + Send + Sync>;
type ResponseHook = Box<dyn Fn(&Request, &mut Response) + Send + Sync>;

/// A synchronous HTTP/1.x client.
///
/// A client owns its connection policy (timeout, user agent, redirect
/// limits) and a [`Connector`] deciding how connections are made. One
/// query is one or more *attempts*: attempt 0 sends the original
/// request, and each 3xx response with a `Location` starts the next
/// attempt until the redirect limit is hit.
///
/// ```no_run
/// # fn main() -> sorrel_client::Result<()> {
/// use sorrel_client::Client;
/// use sorrel_http::Request;
/// use std::time::Duration;
///
/// let client = Client::new()
///     .with_timeout(Duration::from_secs(10))
///     .with_max_redirects(5);
/// let mut request = Request::get("http://example.com/ping");
/// let mut response = client.query(&mut request)?;
/// println!("{}", response.body.read_string()?);
/// # Ok(()) }
/// ```
pub struct Client<C: Connector = TcpConnector> {
    connector: C,
    user_agent: String,
    timeout: Option<Duration>,
    max_redirects: u32,
    follow_cross_scheme: bool,
    parser: Http1Parser,
    formatter: Http1Formatter,
    request_hook: Option<RequestHook>,
    response_hook: Option<ResponseHook>,
}

impl Client<TcpConnector> {
    /// A client over plain TCP with default policies: no timeout, no
    /// redirect following.
    pub fn new() -> Self {
        Self::with_connector(TcpConnector)
    }
}

impl Default for Client<TcpConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> Client<C> {
    /// A client using the given connector; see [`Connector`].
    pub fn with_connector(connector: C) -> Self {
        Self {
            connector,
            user_agent: USER_AGENT.to_string(),
            timeout: None,
            max_redirects: 0,
            follow_cross_scheme: true,
            parser: Http1Parser::new(),
            formatter: Http1Formatter::new(),
            request_hook: None,
            response_hook: None,
        }
    }

    /// Chainable setter for the per-operation I/O timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Chainable setter for the `User-Agent` header value.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Chainable setter for how many redirects a query may follow.
    pub fn with_max_redirects(mut self, max_redirects: u32) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Chainable setter for whether redirects may change scheme
    /// (http → https). Defaults to following them.
    pub fn with_follow_cross_scheme(mut self, follow: bool) -> Self {
        self.follow_cross_scheme = follow;
        self
    }

    /// Registers a hook run on each attempt's request just before it is
    /// written, after the default `User-Agent` handling.
    pub fn with_request_hook(
        mut self,
        hook: impl Fn(&mut Request) + Send + Sync + 'static,
    ) -> Self {
        self.request_hook = Some(Box::new(hook));
        self
    }

    /// Registers a hook run on each attempt's response right after it is
    /// parsed, before redirect handling.
    pub fn with_response_hook(
        mut self,
        hook: impl Fn(&Request, &mut Response) + Send + Sync + 'static,
    ) -> Self {
        self.response_hook = Some(Box::new(hook));
        self
    }

    /// The configured I/O timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The configured `User-Agent`.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// The configured redirect limit.
    pub fn max_redirects(&self) -> u32 {
        self.max_redirects
    }

    pub(crate) async fn connect_async(&self, target: &Uri) -> Result<Arc<Connection>> {
        let mut target = target.clone();
        if target.scheme.is_empty() {
            target.scheme = "http".to_string();
        }

        let connect = self.connector.connect(&target);
        let connection = match self.timeout {
            Some(timeout) => {
                future::or(connect, async {
                    Timer::after(timeout).await;
                    Err(Error::Timeout)
                })
                .await?
            }
            None => connect.await?,
        };

        let connection = Arc::new(connection);
        if let Some(timeout) = self.timeout {
            connection.set_timeout(timeout);
        }
        self.connector.on_connect(&target, &connection)?;
        Ok(connection)
    }

    /// Opens a connection to the authority of `target`, applying the
    /// configured timeout and running the connector's
    /// [`on_connect`][Connector::on_connect] hook.
    ///
    /// # Errors
    ///
    /// Resolution, connection, timeout, or hook failure.
    pub fn connect(&self, target: &Uri) -> Result<Arc<Connection>> {
        async_io::block_on(self.connect_async(target))
    }

    /// Connects to the request's target and performs the full query
    /// cycle, following redirects per policy.
    ///
    /// # Errors
    ///
    /// See [`Error`]; timeouts surface as [`Error::Timeout`] and an
    /// exhausted redirect budget as [`Error::TooManyRedirects`].
    pub fn query(&self, request: &mut Request) -> Result<Response> {
        let connection = self.connect(&request.url)?;
        request.connection = Some(connection);
        self.get_response(request)
    }

    /// Performs the query cycle over the connection already attached to
    /// `request`.
    ///
    /// # Errors
    ///
    /// [`Error::NotConnected`] when no connection is attached, otherwise
    /// as [`query`][Client::query].
    pub fn get_response(&self, request: &mut Request) -> Result<Response> {
        self.get_response_attempt(0, request)
    }

    fn get_response_attempt(&self, attempt: u32, request: &mut Request) -> Result<Response> {
        let connection = request.connection.clone().ok_or(Error::NotConnected)?;
        if let Some(timeout) = self.timeout {
            connection.set_timeout(timeout);
        }

        self.process_request(request);

        let mut send = connection.send_stream();
        let formatted = self.formatter.request(&mut send, request);
        let written = formatted.and_then(|()| send.send());
        drop(send);
        if written.is_err() {
            return Err(Error::ConnectionError);
        }

        let mut receive = connection.receive_stream();
        let parsed = self.parser.response(&mut receive);
        if receive.timed_out() {
            return Err(Error::Timeout);
        }
        let mut response = parsed?;
        response.connection = Some(connection.clone());

        if response.body.has_data() {
            let content_length = response.body.content_length();
            connection.expect_input(usize::try_from(content_length).unwrap_or(usize::MAX));
        }

        if let Some(hook) = &self.response_hook {
            hook(request, &mut response);
        }

        self.on_attempt(request, response, attempt)
    }

    /// Default request processing: the client's `User-Agent` plus any
    /// registered hook.
    fn process_request(&self, request: &mut Request) {
        request.headers.set("User-Agent", self.user_agent.clone());
        if let Some(hook) = &self.request_hook {
            hook(request);
        }
    }

    /// Redirect policy: follow a 3xx with a `Location` while attempts
    /// remain, reconnecting when the peer closed or the authority
    /// changed, rewriting POST to GET and dropping the request body.
    fn on_attempt(&self, request: &mut Request, response: Response, attempt: u32) -> Result<Response> {
        if self.max_redirects == 0
            || response.status.category() != StatusCategory::Redirection
            || !response.headers.contains("Location")
        {
            return Ok(response);
        }

        if attempt >= self.max_redirects {
            return Err(Error::TooManyRedirects);
        }

        let mut target = Uri::parse(&response.headers["Location"]);
        if target.authority.is_empty() {
            target.authority = request.url.authority.clone();
        }
        if target.scheme.is_empty() {
            target.scheme = request.url.scheme.clone();
        } else if !self.follow_cross_scheme && target.scheme != request.url.scheme {
            return Err(Error::CrossSchemeRedirect);
        }
        log::debug!("following redirect to {target}");

        let connection = request.connection.clone().ok_or(Error::NotConnected)?;
        let must_reconnect = response.headers["Connection"].eq_ignore_ascii_case("close")
            || !connection.connected()
            || request.url.authority.host != target.authority.host
            || request.url.authority.port != target.authority.port;
        if must_reconnect {
            connection.close();
            request.connection = Some(self.connect(&target)?);
        }

        request.url = target;
        request.query_data = request.url.query.clone();
        // the legacy rewrite: a redirected POST is retried as a bodyless GET
        if request.method == Method::Post {
            request.method = Method::Get;
        }
        request.body.stop_output();

        self.get_response_attempt(attempt + 1, request)
    }
}
