use crate::{
    encoding::{urldecode, urlencode},
    DataMap,
};
use std::fmt::{self, Display, Formatter, Write};

/// A URI path as an ordered sequence of decoded segments.
///
/// Construction normalizes the textual form: segments are split on `/`,
/// empty and `.` segments are dropped, and a `..` consumes the segment
/// before it.
///
/// ```
/// # use sorrel_http::Path;
/// let path = Path::parse("/foo/../bar/./baz", false);
/// let segments: Vec<&str> = path.iter().collect();
/// assert_eq!(segments, ["bar", "baz"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// An empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a path from pre-split segments, without normalization.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Splits `input` on `/` and normalizes `.` and `..` segments,
    /// percent-decoding each segment when `url_decode` is set.
    pub fn parse(input: &str, url_decode: bool) -> Self {
        let mut segments = Vec::new();
        for segment in input.split('/') {
            if segment.is_empty() || segment == "." {
                continue;
            }
            if segment == ".." {
                segments.pop();
                continue;
            }
            segments.push(if url_decode {
                urldecode(segment, false)
            } else {
                segment.to_string()
            });
        }
        Self { segments }
    }

    /// The decoded segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Iterates the segments as `&str`.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The path with its last segment removed.
    pub fn parent(&self) -> Path {
        let mut parent = self.clone();
        parent.segments.pop();
        parent
    }

    /// The path extended by one segment.
    pub fn child(&self, segment: impl Into<String>) -> Path {
        let mut child = self.clone();
        child.segments.push(segment.into());
        child
    }

    /// Whether `self`'s segments are a prefix of `other`'s.
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        other.segments.len() >= self.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    /// Renders the path with each segment percent-encoded. An empty path
    /// renders as `/` when `empty_root` is set and as nothing otherwise.
    pub fn url_encoded(&self, empty_root: bool) -> String {
        if self.is_empty() {
            return if empty_root { "/".into() } else { String::new() };
        }
        let mut output = String::new();
        for segment in &self.segments {
            output.push('/');
            output.push_str(&urlencode(segment, false));
        }
        output
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

impl From<&str> for Path {
    fn from(input: &str) -> Self {
        Self::parse(input, false)
    }
}

/// The `[user[:password]@]host[:port]` portion of a URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Authority {
    /// user name, when credentials are present
    pub user: Option<String>,
    /// password, when one follows the user name
    pub password: Option<String>,
    /// host name or address literal
    pub host: String,
    /// port, when explicitly given
    pub port: Option<u16>,
}

impl Authority {
    /// Splits an authority string into credentials, host, and port.
    ///
    /// Credentials end at the first `@`; the port starts at the last `:`
    /// provided everything after it is a valid port number.
    pub fn parse(input: &str) -> Self {
        let mut authority = Self::default();

        let rest = match input.find('@') {
            Some(at) => {
                let credentials = &input[..at];
                match credentials.find(':') {
                    Some(colon) => {
                        authority.user = Some(credentials[..colon].to_string());
                        authority.password = Some(credentials[colon + 1..].to_string());
                    }
                    None => authority.user = Some(credentials.to_string()),
                }
                &input[at + 1..]
            }
            None => input,
        };

        match rest.rfind(':') {
            Some(colon)
                if rest.len() > colon + 1
                    && rest[colon + 1..].bytes().all(|b| b.is_ascii_digit()) =>
            {
                match rest[colon + 1..].parse() {
                    Ok(port) => {
                        authority.host = rest[..colon].to_string();
                        authority.port = Some(port);
                    }
                    Err(_) => authority.host = rest.to_string(),
                }
            }
            _ => authority.host = rest.to_string(),
        }

        authority
    }

    /// Whether no component is present.
    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.password.is_none() && self.host.is_empty() && self.port.is_none()
    }
}

impl From<&str> for Authority {
    fn from(input: &str) -> Self {
        Self::parse(input)
    }
}

impl Display for Authority {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(user) = &self.user {
            f.write_str(user)?;
            if let Some(password) = &self.password {
                write!(f, ":{password}")?;
            }
            f.write_char('@')?;
        }
        f.write_str(&self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}

/// A uniform resource identifier, stored decoded and component-wise.
///
/// ```
/// # use sorrel_http::Uri;
/// let uri = Uri::from("http://example.com/a%20b?q=hello+world#frag");
/// assert_eq!(uri.scheme, "http");
/// assert_eq!(uri.authority.host, "example.com");
/// assert_eq!(&uri.query["q"], "hello world");
/// assert_eq!(uri.to_string(), "http://example.com/a%20b?q=hello+world#frag");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Uri {
    /// URI scheme, without the trailing `:`
    pub scheme: String,
    /// authority component
    pub authority: Authority,
    /// decoded, normalized path
    pub path: Path,
    /// decoded query entries, in order
    pub query: DataMap,
    /// decoded fragment, without the leading `#`
    pub fragment: String,
}

fn is_scheme_byte(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || matches!(byte, b'-' | b'.' | b'+')
}

impl Uri {
    /// Builds a URI from its components.
    pub fn new(
        scheme: impl Into<String>,
        authority: Authority,
        path: Path,
        query: DataMap,
        fragment: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            authority,
            path,
            query,
            fragment: fragment.into(),
        }
    }

    /// Performs the RFC 3986 component split
    /// (`scheme:`, `//authority`, path, `?query`, `#fragment`).
    pub fn parse(input: &str) -> Self {
        let mut uri = Self::default();
        let mut rest = input;

        if rest.as_bytes().first().is_some_and(u8::is_ascii_alphabetic) {
            let end = rest
                .bytes()
                .position(|b| !is_scheme_byte(b))
                .unwrap_or(rest.len());
            if rest.as_bytes().get(end) == Some(&b':') {
                uri.scheme = urldecode(&rest[..end], false);
                rest = &rest[end + 1..];
            }
        }

        if let Some(authority) = rest.strip_prefix("//") {
            let end = authority
                .bytes()
                .position(|b| matches!(b, b'/' | b'?' | b'#'))
                .unwrap_or(authority.len());
            uri.authority = Authority::parse(&authority[..end]);
            rest = &authority[end..];
        }

        let path_end = rest
            .bytes()
            .position(|b| matches!(b, b'?' | b'#'))
            .unwrap_or(rest.len());
        uri.path = Path::parse(&rest[..path_end], true);
        rest = &rest[path_end..];

        if let Some(query) = rest.strip_prefix('?') {
            let end = query
                .bytes()
                .position(|b| b == b'#')
                .unwrap_or(query.len());
            uri.query = parse_query_string(&query[..end]);
            rest = &query[end..];
        }

        if let Some(fragment) = rest.strip_prefix('#') {
            uri.fragment = urldecode(fragment, false);
        }

        uri
    }

    /// The query component rendered as a string, optionally with its
    /// leading `?`.
    pub fn query_string(&self, question_mark: bool) -> String {
        build_query_string(&self.query, question_mark)
    }
}

impl From<&str> for Uri {
    fn from(input: &str) -> Self {
        Self::parse(input)
    }
}

impl From<&String> for Uri {
    fn from(input: &String) -> Self {
        Self::parse(input)
    }
}

impl Display for Uri {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if !self.scheme.is_empty() {
            write!(f, "{}:", urlencode(&self.scheme, false))?;
        }
        if !self.authority.is_empty() {
            write!(f, "//{}", self.authority)?;
        }
        f.write_str(&self.path.url_encoded(!self.authority.is_empty()))?;
        f.write_str(&self.query_string(true))?;
        if !self.fragment.is_empty() {
            write!(f, "#{}", urlencode(&self.fragment, false))?;
        }
        Ok(())
    }
}

/// Parses a query string into an ordered map.
///
/// Tokens split on `&`; each token splits on its first `=`. A token
/// without `=` becomes a key with an empty value. Values decode `+` as
/// space, keys do not.
///
/// ```
/// # use sorrel_http::parse_query_string;
/// let query = parse_query_string("test=1%2b1=2");
/// assert_eq!(&query["test"], "1+1=2");
/// ```
pub fn parse_query_string(input: &str) -> DataMap {
    let input = input.strip_prefix('?').unwrap_or(input);
    let mut query = DataMap::new();
    let mut tokens = input.split('&').peekable();
    while let Some(token) = tokens.next() {
        if token.is_empty() && tokens.peek().is_none() {
            break;
        }
        match token.split_once('=') {
            Some((name, value)) => {
                query.append(urldecode(name, false), urldecode(value, true));
            }
            None => query.append(urldecode(token, false), ""),
        }
    }
    query
}

/// Renders an ordered map as a query string; inverse of
/// [`parse_query_string`]. Empty values omit the `=`.
pub fn build_query_string(query: &DataMap, question_mark: bool) -> String {
    let mut output = String::new();
    for (name, value) in query {
        if output.is_empty() {
            if question_mark {
                output.push('?');
            }
        } else {
            output.push('&');
        }
        output.push_str(&urlencode(name, false));
        if !value.is_empty() {
            output.push('=');
            output.push_str(&urlencode(value, true));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn segments(path: &Path) -> Vec<&str> {
        path.iter().collect()
    }

    #[test]
    fn path_normalization() {
        assert_eq!(segments(&Path::parse("/foo/../bar", false)), ["bar"]);
        assert_eq!(segments(&Path::parse("/foo/./bar", false)), ["foo", "bar"]);
        assert_eq!(segments(&Path::parse("/foo//bar", false)), ["foo", "bar"]);
        assert_eq!(segments(&Path::parse("../x", false)), ["x"]);
        assert!(Path::parse("/..", false).is_empty());
    }

    #[test]
    fn path_rendering() {
        assert_eq!(Path::parse("/a b/c", false).url_encoded(false), "/a%20b/c");
        assert_eq!(Path::new().url_encoded(true), "/");
        assert_eq!(Path::new().url_encoded(false), "");
        assert_eq!(Path::parse("/a/b", false).to_string(), "/a/b");
    }

    #[test]
    fn authority_parsing() {
        let authority = Authority::parse("user:secret@example.com:8080");
        assert_eq!(authority.user.as_deref(), Some("user"));
        assert_eq!(authority.password.as_deref(), Some("secret"));
        assert_eq!(authority.host, "example.com");
        assert_eq!(authority.port, Some(8080));
        assert_eq!(authority.to_string(), "user:secret@example.com:8080");

        let bare = Authority::parse("example.com");
        assert_eq!(bare.host, "example.com");
        assert_eq!(bare.port, None);
        assert_eq!(bare.user, None);

        let v6 = Authority::parse("[::1]:8080");
        assert_eq!(v6.host, "[::1]");
        assert_eq!(v6.port, Some(8080));
    }

    #[test]
    fn uri_component_split() {
        let uri = Uri::from("http://u:p@h:1/x/y?a=1&b#frag");
        assert_eq!(uri.scheme, "http");
        assert_eq!(uri.authority.host, "h");
        assert_eq!(uri.authority.port, Some(1));
        assert_eq!(segments(&uri.path), ["x", "y"]);
        assert_eq!(&uri.query["a"], "1");
        assert_eq!(&uri.query["b"], "");
        assert_eq!(uri.fragment, "frag");
    }

    #[test]
    fn uri_round_trip() {
        for input in [
            "http://example.com/",
            "http://u:p@h:1/x/y?a=1&b#frag",
            "https://example.com/a%20b?q=hello+world",
            "/relative/path?x=y",
            "scheme:",
        ] {
            let uri = Uri::from(input);
            assert_eq!(Uri::parse(&uri.to_string()), uri, "{input}");
        }
    }

    #[test]
    fn empty_path_renders_as_root_only_with_authority() {
        assert_eq!(Uri::from("http://example.com").to_string(), "http://example.com/");
        assert_eq!(Uri::from("").to_string(), "");
    }

    #[test]
    fn query_string_codec() {
        let query = parse_query_string("test=1%2b1=2");
        assert_eq!(&query["test"], "1+1=2");

        let mut data = DataMap::new();
        data.append("q", "hello world");
        assert_eq!(build_query_string(&data, false), "q=hello+world");
        assert_eq!(build_query_string(&data, true), "?q=hello+world");

        assert_eq!(build_query_string(&parse_query_string("a&b=2"), false), "a&b=2");
    }

    #[test]
    fn plus_decodes_as_space_in_values_only() {
        let query = parse_query_string("a+b=c+d");
        let (name, value) = query.front().unwrap();
        assert_eq!(name, "a+b");
        assert_eq!(value, "c d");
    }
}
