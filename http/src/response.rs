use crate::{
    AuthChallenge, Connection, Content, CookieJar, Headers, MimeType, Protocol, Status, Uri,
};
use std::{sync::Arc, time::SystemTime};

/// An HTTP response, either being built for sending or parsed off the
/// wire.
#[derive(Debug)]
pub struct Response {
    /// response status
    pub status: Status,
    /// response headers
    pub headers: Headers,
    /// protocol for the status line
    pub protocol: Protocol,
    /// cookies to emit as `Set-Cookie` headers
    pub cookies: CookieJar,
    /// challenges to emit as `WWW-Authenticate`
    pub www_authenticate: Vec<AuthChallenge>,
    /// challenges to emit as `Proxy-Authenticate`
    pub proxy_authenticate: Vec<AuthChallenge>,
    /// message body
    pub body: Content,
    /// emission timestamp, written as the `Date` header
    pub date: SystemTime,
    /// the connection the response belongs to
    pub connection: Option<Arc<Connection>>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: Status::OK,
            headers: Headers::new(),
            protocol: Protocol::http_1_1(),
            cookies: CookieJar::new(),
            www_authenticate: Vec::new(),
            proxy_authenticate: Vec::new(),
            body: Content::None,
            date: SystemTime::now(),
            connection: None,
        }
    }
}

impl Response {
    /// An empty response with the given status.
    pub fn new(status: impl Into<Status>) -> Self {
        Self {
            status: status.into(),
            ..Self::default()
        }
    }

    /// A response whose body is `content` declared as `content_type`.
    pub fn content(content_type: MimeType, content: impl AsRef<[u8]>) -> Self {
        let mut response = Self::default();
        response.body.start_output(content_type);
        if let Some(output) = response.body.output() {
            use std::io::Write;
            output.write_all(content.as_ref()).ok();
        }
        response
    }

    /// A `text/plain` response.
    pub fn text(content: impl AsRef<[u8]>) -> Self {
        Self::content(MimeType::new("text", "plain"), content)
    }

    /// A redirect to `location`, `302 Found` by default.
    pub fn redirect(location: &Uri) -> Self {
        Self::redirect_with_status(location, Status::FOUND)
    }

    /// A redirect to `location` with an explicit 3xx status.
    pub fn redirect_with_status(location: &Uri, status: Status) -> Self {
        let mut response = Self::new(status);
        response.headers.set("Location", location.to_string());
        response
    }

    /// A `401 Unauthorized` response carrying the given challenges.
    pub fn authorization_required(challenges: Vec<AuthChallenge>) -> Self {
        let mut response = Self::new(Status::UNAUTHORIZED);
        response.www_authenticate = challenges;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_sets_location() {
        let response = Response::redirect(&Uri::from("http://example.com/x"));
        assert_eq!(response.status, Status::FOUND);
        assert_eq!(&response.headers["location"], "http://example.com/x");
    }

    #[test]
    fn authorization_required_carries_challenges() {
        let response =
            Response::authorization_required(vec![AuthChallenge::new("Basic", "pony")]);
        assert_eq!(response.status, Status::UNAUTHORIZED);
        assert_eq!(response.www_authenticate.len(), 1);
    }

    #[test]
    fn content_constructor_fills_the_body() {
        let response = Response::text("pong");
        assert!(response.body.has_data());
        assert_eq!(response.body.content_length(), 4);
    }
}
