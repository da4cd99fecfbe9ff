#![forbid(unsafe_code)]
#![deny(missing_docs)]
/*!
The HTTP/1.x message engine and connection runtime for the sorrel toolkit.

This crate models HTTP messages precisely ([`Request`], [`Response`],
[`Headers`], cookies, [`Uri`], [`MimeType`], multipart bodies), turns byte
streams into messages and back ([`Http1Parser`], [`Http1Formatter`]), and
provides the transport machinery to carry them: a [`TimeoutSocket`] whose
blocking operations are bounded by a single expiring deadline, and a
[`Connection`] pairing that socket with framing-aware stream buffers.

It deliberately stops there. Routing, TLS, file serving and the like are
the business of the crates built on top of it, or of the application.
*/

mod error;
pub use error::{Error, Result};

pub mod encoding;

mod params;
pub use params::{
    CaseInsensitive, CaseSensitive, DataMap, Headers, IntoIter, Iter, KeyCase, OrderedMap,
};

mod uri;
pub use uri::{build_query_string, parse_query_string, Authority, Path, Uri};

mod mime;
pub use mime::MimeType;

mod protocol;
pub use protocol::Protocol;

mod status;
pub use status::{Status, StatusCategory};

mod method;
pub use method::Method;

mod cookie;
pub use cookie::{ClientCookie, ClientCookieJar, Cookie, CookieJar};

mod auth;
pub use auth::{Auth, AuthChallenge};

mod body;
pub use body::{Content, InputBody, OutputBody};

mod multipart;
pub use multipart::{Multipart, MultipartPart};

mod transport;
pub use transport::Transport;

mod synthetic;
pub use synthetic::{Synthetic, SyntheticOutput};

mod connection;
pub use connection::{Connection, ReceiveStream, SendStream, TimeoutSocket};

mod request;
pub use request::Request;

mod response;
pub use response::Response;

mod parser;
pub use parser::{CompoundHeader, Http1Parser};

mod formatter;
pub use formatter::Http1Formatter;

pub mod post;

pub(crate) mod scan;
