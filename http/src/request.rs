use crate::{
    Auth, Connection, Content, DataMap, Headers, Method, Protocol, Status, Uri,
};
use std::{net::SocketAddr, sync::Arc, time::SystemTime};

/// An HTTP request, either parsed off the wire or being built for
/// sending.
///
/// Requests parsed by [`Http1Parser`][crate::Http1Parser] carry a
/// *suggested status*: the status the parser recommends replying with.
/// Anything other than `200 OK` (or `100 Continue`) means the request was
/// not usable and a handler should short-circuit with that status.
#[derive(Debug)]
pub struct Request {
    /// request target
    pub url: Uri,
    /// request method
    pub method: Method,
    /// protocol from the request line
    pub protocol: Protocol,
    /// request headers
    pub headers: Headers,
    /// cookies from the `Cookie` headers
    pub cookies: DataMap,
    /// decoded query data from the target
    pub query_data: DataMap,
    /// decoded post data; see [`Request::parse_post`]
    pub post_data: DataMap,
    /// address of the peer the request arrived from
    pub from: Option<SocketAddr>,
    /// parsed `Authorization` header
    pub auth: Auth,
    /// the status the parser recommends responding with
    pub suggested_status: Status,
    /// message body
    pub body: Content,
    /// when the request was received
    pub received: SystemTime,
    /// the connection the request arrived on
    pub connection: Option<Arc<Connection>>,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            url: Uri::default(),
            method: Method::Get,
            protocol: Protocol::http_1_1(),
            headers: Headers::new(),
            cookies: DataMap::new(),
            query_data: DataMap::new(),
            post_data: DataMap::new(),
            from: None,
            auth: Auth::default(),
            suggested_status: Status::OK,
            body: Content::None,
            received: SystemTime::now(),
            connection: None,
        }
    }
}

impl Request {
    /// A request for `url` with the given method and no headers.
    pub fn new(method: Method, url: impl Into<Uri>) -> Self {
        let url = url.into();
        Self {
            query_data: url.query.clone(),
            url,
            method,
            ..Self::default()
        }
    }

    /// A GET request for `url`.
    pub fn get(url: impl Into<Uri>) -> Self {
        Self::new(Method::Get, url)
    }

    /// A POST request for `url`.
    pub fn post(url: impl Into<Uri>) -> Self {
        Self::new(Method::Post, url)
    }
}
