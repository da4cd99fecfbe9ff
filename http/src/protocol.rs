use crate::Error;
use std::{
    cmp::Ordering,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// A protocol token such as `HTTP/1.1`: a name and a version pair.
///
/// Ordering is total within one name and undefined across names:
/// `partial_cmp` returns `None` for two protocols with different names, so
/// every comparison operator between them is false.
///
/// ```
/// # use sorrel_http::Protocol;
/// let http11: Protocol = "HTTP/1.1".parse().unwrap();
/// let http12: Protocol = "HTTP/1.2".parse().unwrap();
/// assert!(http12 > http11);
/// assert!(!(Protocol::new("ICY", 1, 1) > http11));
/// assert!(!(Protocol::new("ICY", 1, 1) < http11));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protocol {
    /// protocol name, e.g. `HTTP`
    pub name: String,
    /// version before the dot
    pub major: u32,
    /// version after the dot, 0 when omitted
    pub minor: u32,
}

impl Protocol {
    /// Builds a protocol token from parts.
    pub fn new(name: impl Into<String>, major: u32, minor: u32) -> Self {
        Self {
            name: name.into(),
            major,
            minor,
        }
    }

    /// `HTTP/1.0`
    pub fn http_1_0() -> Self {
        Self::new("HTTP", 1, 0)
    }

    /// `HTTP/1.1`
    pub fn http_1_1() -> Self {
        Self::new("HTTP", 1, 1)
    }

    /// Whether this is some version of HTTP.
    pub fn is_http(&self) -> bool {
        self.name == "HTTP"
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Self::http_1_1()
    }
}

impl PartialOrd for Protocol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        (self.name == other.name)
            .then(|| (self.major, self.minor).cmp(&(other.major, other.minor)))
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (name, version) = input.split_once('/').ok_or(Error::InvalidProtocol)?;
        if name.is_empty() || version.is_empty() {
            return Err(Error::InvalidProtocol);
        }

        let (major, minor) = match version.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (version, "0"),
        };

        Ok(Self {
            name: name.to_string(),
            major: major.parse().map_err(|_| Error::InvalidProtocol)?,
            minor: minor.parse().map_err(|_| Error::InvalidProtocol)?,
        })
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}.{}", self.name, self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_and_without_minor() {
        assert_eq!(
            "HTTP/1.1".parse::<Protocol>().unwrap(),
            Protocol::http_1_1()
        );
        assert_eq!(
            "HTTP/2".parse::<Protocol>().unwrap(),
            Protocol::new("HTTP", 2, 0)
        );
    }

    #[test]
    fn rejects_malformed_tokens() {
        for input in ["HTTP", "HTTP/", "HTTP/x", "HTTP/1.", "HTTP/1.x", "/1.1"] {
            assert!(input.parse::<Protocol>().is_err(), "{input}");
        }
    }

    #[test]
    fn orders_within_a_name() {
        let old: Protocol = "HTTP/1.0".parse().unwrap();
        let new: Protocol = "HTTP/1.2".parse().unwrap();
        assert!(new > old);
        assert!(new >= Protocol::http_1_1());
        assert!(old < Protocol::http_1_1());
    }

    #[test]
    fn cross_name_comparisons_are_all_false() {
        let http = Protocol::http_1_1();
        let icy = Protocol::new("ICY", 1, 1);
        assert!(!(icy < http));
        assert!(!(icy > http));
        assert!(!(icy <= http));
        assert!(!(icy >= http));
        assert!(icy != http);
    }

    #[test]
    fn displays_canonically() {
        assert_eq!(Protocol::http_1_0().to_string(), "HTTP/1.0");
        assert_eq!("HTTP/2".parse::<Protocol>().unwrap().to_string(), "HTTP/2.0");
    }
}
