use crate::{encoding::urlencode, params::CaseSensitive, OrderedMap, Path, Uri};
use std::{
    fmt::Write,
    time::{Duration, SystemTime},
};

/// Cookies pending in a response, keyed by cookie name. Names compare
/// exactly.
pub type CookieJar = OrderedMap<Cookie, CaseSensitive>;

/// Cookies stored on the client side, keyed by cookie name.
pub type ClientCookieJar = OrderedMap<ClientCookie, CaseSensitive>;

/// A `Set-Cookie` value as sent by a server.
///
/// See [RFC 6265](https://tools.ietf.org/html/rfc6265).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookie {
    /// cookie value
    pub value: String,
    /// absolute expiry time from the `Expires` attribute
    pub expires: Option<SystemTime>,
    /// lifetime in seconds from the `Max-Age` attribute; zero or
    /// negative means "expire immediately"
    pub max_age: Option<i64>,
    /// `Domain` attribute, or empty
    pub domain: String,
    /// `Path` attribute as sent, or empty
    pub path: String,
    /// `Secure` flag
    pub secure: bool,
    /// `HttpOnly` flag
    pub http_only: bool,
    /// unrecognized attributes, verbatim
    pub extension: Vec<String>,
}

impl Cookie {
    /// A cookie with the given value and no attributes.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    /// Chainable setter for the `Expires` attribute.
    pub fn with_expires(mut self, expires: SystemTime) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Chainable setter for the `Max-Age` attribute, in seconds.
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Chainable setter for the `Domain` attribute.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Chainable setter for the `Path` attribute.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Chainable setter for the `Secure` flag.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Chainable setter for the `HttpOnly` flag.
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Renders the `Set-Cookie` header value for a cookie named `name`.
    pub fn encode(&self, name: &str) -> String {
        let mut output = format!("{name}={}", self.value);
        if let Some(expires) = self.expires {
            write!(output, "; Expires={}", httpdate::fmt_http_date(expires)).ok();
        }
        if let Some(max_age) = self.max_age {
            write!(output, "; Max-Age={max_age}").ok();
        }
        if !self.domain.is_empty() {
            write!(output, "; Domain={}", self.domain).ok();
        }
        if !self.path.is_empty() {
            write!(output, "; Path={}", urlencode(&self.path, false)).ok();
        }
        if self.secure {
            output.push_str("; Secure");
        }
        if self.http_only {
            output.push_str("; HttpOnly");
        }
        for extension in &self.extension {
            write!(output, "; {extension}").ok();
        }
        output
    }
}

impl From<&str> for Cookie {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Cookie {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A cookie as stored by a client, with its expiry resolved to an
/// absolute time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCookie {
    /// cookie value
    pub value: String,
    /// resolved expiry; `None` for session cookies
    pub expiry_time: Option<SystemTime>,
    /// domain the cookie applies to
    pub domain: String,
    /// decoded path the cookie applies to
    pub path: Path,
    /// `Secure` flag
    pub secure: bool,
    /// `HttpOnly` flag
    pub http_only: bool,
    /// when the cookie was stored
    pub creation_time: SystemTime,
    /// when the cookie was last sent
    pub last_access: SystemTime,
}

impl From<&Cookie> for ClientCookie {
    fn from(cookie: &Cookie) -> Self {
        let now = SystemTime::now();

        // Max-Age wins over Expires; a non-positive Max-Age expires the
        // cookie immediately by pinning it to the epoch.
        let expiry_time = match cookie.max_age {
            Some(seconds) if seconds <= 0 => Some(SystemTime::UNIX_EPOCH),
            Some(seconds) => Some(now + Duration::from_secs(seconds as u64)),
            None => cookie.expires,
        };

        Self {
            value: cookie.value.clone(),
            expiry_time,
            domain: cookie.domain.clone(),
            path: Path::parse(&cookie.path, true),
            secure: cookie.secure,
            http_only: cookie.http_only,
            creation_time: now,
            last_access: now,
        }
    }
}

impl ClientCookie {
    /// Whether the cookie can be sent to `uri`: both the domain and the
    /// path must match.
    pub fn matches_uri(&self, uri: &Uri) -> bool {
        self.matches_domain(&uri.authority.host) && self.matches_path(&uri.path)
    }

    /// Domain matching per RFC 6265 §5.1.3: the request host equals the
    /// cookie domain, or ends with `"." + domain`.
    pub fn matches_domain(&self, host: &str) -> bool {
        host == self.domain || host.ends_with(&format!(".{}", self.domain))
    }

    /// Path matching per RFC 6265 §5.1.4: the cookie path's segments are
    /// a prefix of the request path's segments.
    pub fn matches_path(&self, request_path: &Path) -> bool {
        self.path.is_prefix_of(request_path)
    }

    /// Whether the cookie is expired at `now`.
    pub fn expired(&self, now: SystemTime) -> bool {
        self.expiry_time.is_some_and(|expiry| expiry < now)
    }

    /// Whether the cookie lives only for the session.
    pub fn is_session(&self) -> bool {
        self.expiry_time.is_none()
    }

    /// Records an access at the current time.
    pub fn update_access(&mut self) {
        self.last_access = SystemTime::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_cookie_encoding() {
        let cookie = Cookie::new("a b")
            .with_domain("example.com")
            .with_path("/x")
            .with_max_age(60)
            .with_secure(true)
            .with_http_only(true);
        assert_eq!(
            cookie.encode("sid"),
            "sid=a b; Max-Age=60; Domain=example.com; Path=%2Fx; Secure; HttpOnly"
        );
    }

    #[test]
    fn domain_matching() {
        let cookie = ClientCookie::from(&Cookie::new("1").with_domain("example.com"));
        assert!(cookie.matches_domain("example.com"));
        assert!(cookie.matches_domain("a.example.com"));
        assert!(!cookie.matches_domain("bexample.com"));
        assert!(!cookie.matches_domain("example.com.evil"));
    }

    #[test]
    fn path_matching() {
        let cookie = ClientCookie::from(&Cookie::new("1").with_path("/a"));
        assert!(cookie.matches_path(&Path::parse("/a/b", false)));
        assert!(cookie.matches_path(&Path::parse("/a", false)));
        assert!(!cookie.matches_path(&Path::parse("/b", false)));
    }

    #[test]
    fn max_age_zero_is_immediately_expired() {
        let cookie = ClientCookie::from(&Cookie::new("1").with_max_age(0));
        assert!(cookie.expired(SystemTime::now()));
        assert!(!cookie.is_session());
    }

    #[test]
    fn max_age_wins_over_expires() {
        let long_expires = SystemTime::now() + Duration::from_secs(86400);
        let cookie = ClientCookie::from(&Cookie::new("1").with_expires(long_expires).with_max_age(-5));
        assert!(cookie.expired(SystemTime::now()));
    }

    #[test]
    fn session_cookies_never_expire() {
        let cookie = ClientCookie::from(&Cookie::new("1"));
        assert!(cookie.is_session());
        assert!(!cookie.expired(SystemTime::now() + Duration::from_secs(1_000_000)));
    }
}
