use thiserror::Error;

/// Concrete errors that occur within sorrel's HTTP implementation
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// [`std::io::Error`]
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// a string could not be decoded or encoded by the named codec
    #[error("invalid {codec} string")]
    Encoding {
        /// name of the codec that rejected the input
        codec: &'static str,
    },

    /// we were unable to parse a protocol token such as `HTTP/1.1`
    #[error("invalid protocol token")]
    InvalidProtocol,

    /// we were unable to parse this method
    #[error("unrecognized method {0}")]
    UnrecognizedMethod(String),

    /// a mime type was missing its type or subtype
    #[error("invalid mime type")]
    InvalidMimeType,

    /// the response status line could not be parsed
    #[error("malformed response")]
    MalformedResponse,

    /// a header block could not be parsed
    #[error("malformed headers")]
    MalformedHeaders,

    /// the message advertised a body we cannot make sense of
    #[error("invalid payload")]
    InvalidPayload,

    /// multipart content did not follow its boundary framing
    #[error("malformed multipart data")]
    InvalidMultipart,

    /// a post body could not be interpreted by the selected format
    #[error("unparseable post data")]
    InvalidPostData,

    /// a body stream was used in a mode it was not started in
    #[error("content stream mode mismatch")]
    ContentModeMismatch,
}

/// this crate's result type
pub type Result<T> = std::result::Result<T, Error>;
