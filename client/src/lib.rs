#![forbid(unsafe_code)]
#![deny(missing_docs)]
/*!
HTTP/1.x clients for the sorrel toolkit.

[`Client`] performs synchronous request/response cycles with redirect
handling; [`AsyncClient`] wraps one in a background worker servicing many
outstanding requests at once. Both speak through
[`sorrel_http`]'s message engine and connection runtime, and both leave
TLS to a [`Connector`] implementation supplied from outside.
*/

mod error;
pub use error::{Error, Result};

mod connector;
pub use connector::{Connector, TcpConnector};

mod client;
pub use client::{Client, USER_AGENT};

mod async_client;
pub use async_client::AsyncClient;

pub use sorrel_http::{Request, Response, Uri};
