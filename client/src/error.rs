use thiserror::Error;

/// Client-side failure conditions.
///
/// The `Display` form is the client status string an application sees:
/// `"timeout"`, `"too many redirects"`, a protocol complaint, or a
/// system error message verbatim.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// the socket deadline fired during the exchange
    #[error("timeout")]
    Timeout,

    /// the redirect chain exceeded the configured maximum
    #[error("too many redirects")]
    TooManyRedirects,

    /// a redirect switched scheme while that was disallowed
    #[error("cross-scheme redirect")]
    CrossSchemeRedirect,

    /// `query` was called on a request with no connection attached
    #[error("client not connected")]
    NotConnected,

    /// the request could not be written to the connection
    #[error("connection error")]
    ConnectionError,

    /// the target URI names no port and no scheme with a known default
    #[error("unsupported url")]
    UnsupportedUrl,

    /// the response could not be parsed
    #[error(transparent)]
    Http(sorrel_http::Error),

    /// a network-level error, surfaced verbatim
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<sorrel_http::Error> for Error {
    fn from(error: sorrel_http::Error) -> Self {
        match error {
            sorrel_http::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
                Error::Timeout
            }
            sorrel_http::Error::Io(io) => Error::Io(io),
            other => Error::Http(other),
        }
    }
}

/// this crate's result type
pub type Result<T> = std::result::Result<T, Error>;
