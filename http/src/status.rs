use std::{
    borrow::Cow,
    fmt::{self, Display, Formatter},
};

/// An HTTP response status: a numeric code plus its reason phrase.
///
/// Equality considers the code alone, so a status with a customized
/// reason phrase still compares equal to its canonical form.
///
/// ```
/// # use sorrel_http::{Status, StatusCategory};
/// assert_eq!(Status::new(404).reason, "Not Found");
/// assert_eq!(Status::new(404).category(), StatusCategory::ClientError);
/// assert!(Status::new(404).is_error());
/// assert!(!Status::OK.is_error());
/// ```
#[derive(Debug, Clone)]
pub struct Status {
    /// numeric status code
    pub code: u16,
    /// reason phrase
    pub reason: Cow<'static, str>,
}

/// The class of a status code, derived from its hundreds digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    /// code 0 or out of the defined classes
    Invalid,
    /// 1xx
    Informational,
    /// 2xx
    Success,
    /// 3xx
    Redirection,
    /// 4xx
    ClientError,
    /// 5xx
    ServerError,
}

macro_rules! status_constants {
    ($(($name:ident, $code:literal, $reason:literal),)+) => {
        impl Status {
            $(
                #[doc = concat!("`", stringify!($code), " ", $reason, "`")]
                pub const $name: Status = Status {
                    code: $code,
                    reason: Cow::Borrowed($reason),
                };
            )+

            /// The canonical reason phrase for `code`, or `"Unknown"`.
            pub fn canonical_reason(code: u16) -> &'static str {
                match code {
                    $($code => $reason,)+
                    _ => "Unknown",
                }
            }
        }
    };
}

status_constants![
    (CONTINUE, 100, "Continue"),
    (SWITCHING_PROTOCOLS, 101, "Switching Protocols"),
    (PROCESSING, 102, "Processing"),
    (OK, 200, "OK"),
    (CREATED, 201, "Created"),
    (ACCEPTED, 202, "Accepted"),
    (NON_AUTHORITATIVE_INFORMATION, 203, "Non-Authoritative Information"),
    (NO_CONTENT, 204, "No Content"),
    (RESET_CONTENT, 205, "Reset Content"),
    (PARTIAL_CONTENT, 206, "Partial Content"),
    (MULTI_STATUS, 207, "Multi-Status"),
    (ALREADY_REPORTED, 208, "Already Reported"),
    (IM_USED, 226, "IM Used"),
    (MULTIPLE_CHOICES, 300, "Multiple Choices"),
    (MOVED_PERMANENTLY, 301, "Moved Permanently"),
    (FOUND, 302, "Found"),
    (SEE_OTHER, 303, "See Other"),
    (NOT_MODIFIED, 304, "Not Modified"),
    (USE_PROXY, 305, "Use Proxy"),
    (TEMPORARY_REDIRECT, 307, "Temporary Redirect"),
    (PERMANENT_REDIRECT, 308, "Permanent Redirect"),
    (BAD_REQUEST, 400, "Bad Request"),
    (UNAUTHORIZED, 401, "Unauthorized"),
    (PAYMENT_REQUIRED, 402, "Payment Required"),
    (FORBIDDEN, 403, "Forbidden"),
    (NOT_FOUND, 404, "Not Found"),
    (METHOD_NOT_ALLOWED, 405, "Method Not Allowed"),
    (NOT_ACCEPTABLE, 406, "Not Acceptable"),
    (PROXY_AUTHENTICATION_REQUIRED, 407, "Proxy Authentication Required"),
    (REQUEST_TIMEOUT, 408, "Request Timeout"),
    (CONFLICT, 409, "Conflict"),
    (GONE, 410, "Gone"),
    (LENGTH_REQUIRED, 411, "Length Required"),
    (PRECONDITION_FAILED, 412, "Precondition Failed"),
    (PAYLOAD_TOO_LARGE, 413, "Payload Too Large"),
    (URI_TOO_LONG, 414, "URI Too Long"),
    (UNSUPPORTED_MEDIA_TYPE, 415, "Unsupported Media Type"),
    (RANGE_NOT_SATISFIABLE, 416, "Range Not Satisfiable"),
    (EXPECTATION_FAILED, 417, "Expectation Failed"),
    (IM_A_TEAPOT, 418, "I'm a teapot"),
    (MISDIRECTED_REQUEST, 421, "Misdirected Request"),
    (UNPROCESSABLE_ENTITY, 422, "Unprocessable Entity"),
    (LOCKED, 423, "Locked"),
    (FAILED_DEPENDENCY, 424, "Failed Dependency"),
    (UPGRADE_REQUIRED, 426, "Upgrade Required"),
    (PRECONDITION_REQUIRED, 428, "Precondition Required"),
    (TOO_MANY_REQUESTS, 429, "Too Many Requests"),
    (REQUEST_HEADER_FIELDS_TOO_LARGE, 431, "Request Header Fields Too Large"),
    (UNAVAILABLE_FOR_LEGAL_REASONS, 451, "Unavailable For Legal Reasons"),
    (INTERNAL_SERVER_ERROR, 500, "Internal Server Error"),
    (NOT_IMPLEMENTED, 501, "Not Implemented"),
    (BAD_GATEWAY, 502, "Bad Gateway"),
    (SERVICE_UNAVAILABLE, 503, "Service Unavailable"),
    (GATEWAY_TIMEOUT, 504, "Gateway Timeout"),
    (HTTP_VERSION_NOT_SUPPORTED, 505, "HTTP Version Not Supported"),
    (VARIANT_ALSO_NEGOTIATES, 506, "Variant Also Negotiates"),
    (INSUFFICIENT_STORAGE, 507, "Insufficient Storage"),
    (LOOP_DETECTED, 508, "Loop Detected"),
    (NOT_EXTENDED, 510, "Not Extended"),
    (NETWORK_AUTHENTICATION_REQUIRED, 511, "Network Authentication Required"),
];

impl Status {
    /// A status with the canonical reason phrase for `code`.
    pub fn new(code: u16) -> Self {
        Self {
            code,
            reason: Cow::Borrowed(Self::canonical_reason(code)),
        }
    }

    /// A status with a custom reason phrase.
    pub fn with_reason(code: u16, reason: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// The class of this status.
    pub fn category(&self) -> StatusCategory {
        match self.code / 100 {
            1 => StatusCategory::Informational,
            2 => StatusCategory::Success,
            3 => StatusCategory::Redirection,
            4 => StatusCategory::ClientError,
            5 => StatusCategory::ServerError,
            _ => StatusCategory::Invalid,
        }
    }

    /// Whether this status reports a client or server error.
    pub fn is_error(&self) -> bool {
        matches!(
            self.category(),
            StatusCategory::ClientError | StatusCategory::ServerError
        )
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::OK
    }
}

impl PartialEq for Status {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for Status {}

impl PartialEq<u16> for Status {
    fn eq(&self, other: &u16) -> bool {
        self.code == *other
    }
}

impl From<u16> for Status {
    fn from(code: u16) -> Self {
        Self::new(code)
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        assert_eq!(Status::new(100).category(), StatusCategory::Informational);
        assert_eq!(Status::new(200).category(), StatusCategory::Success);
        assert_eq!(Status::new(302).category(), StatusCategory::Redirection);
        assert_eq!(Status::new(404).category(), StatusCategory::ClientError);
        assert_eq!(Status::new(500).category(), StatusCategory::ServerError);
        assert_eq!(Status::new(0).category(), StatusCategory::Invalid);
        assert_eq!(Status::new(700).category(), StatusCategory::Invalid);
    }

    #[test]
    fn error_predicate() {
        assert!(Status::new(404).is_error());
        assert!(Status::new(500).is_error());
        assert!(!Status::new(200).is_error());
        assert!(!Status::new(302).is_error());
    }

    #[test]
    fn equality_ignores_the_reason_phrase() {
        assert_eq!(Status::with_reason(404, "Gone Fishing"), Status::NOT_FOUND);
        assert_eq!(Status::NOT_FOUND, 404);
    }

    #[test]
    fn unknown_codes_get_a_placeholder_reason() {
        assert_eq!(Status::new(599).reason, "Unknown");
    }
}
