//! Decoding and encoding of POST bodies.
//!
//! A [`FormatRegistry`] holds the known body formats; requests parse or
//! format their [`post_data`][crate::Request::post_data] through an
//! explicit registry value rather than any global table.

use crate::{
    build_query_string, parse_query_string, CompoundHeader, Error, Headers, Http1Formatter,
    Http1Parser, MimeType, Multipart, MultipartPart, Request, Result,
};
use std::io::Cursor;

/// A POST body format: how `post_data` maps to body bytes and back.
pub trait PostFormat: Send + Sync {
    /// Whether this format can decode the request's body.
    fn can_parse(&self, request: &Request) -> bool;

    /// Decodes the request body into `request.post_data`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPostData`] when the body does not follow the
    /// format, or the underlying read error.
    fn parse(&self, request: &mut Request) -> Result<()>;

    /// Whether this format can encode the request's `post_data`.
    fn can_format(&self, request: &Request) -> bool;

    /// Encodes `request.post_data` into the request body, setting its
    /// content type.
    ///
    /// # Errors
    ///
    /// [`Error::ContentModeMismatch`] when the body is already bound for
    /// reading.
    fn format(&self, request: &mut Request) -> Result<()>;
}

/// `application/x-www-form-urlencoded` bodies: the query-string grammar.
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlEncoded;

impl UrlEncoded {
    fn mime() -> MimeType {
        MimeType::new("application", "x-www-form-urlencoded")
    }
}

impl PostFormat for UrlEncoded {
    fn can_parse(&self, request: &Request) -> bool {
        request
            .body
            .content_type()
            .is_some_and(|mime| mime.matches_type("application", "x-www-form-urlencoded"))
    }

    fn parse(&self, request: &mut Request) -> Result<()> {
        let text = request.body.read_string()?;
        if request.body.has_error() {
            return Err(Error::InvalidPostData);
        }
        request.post_data = parse_query_string(&text);
        Ok(())
    }

    fn can_format(&self, _request: &Request) -> bool {
        true
    }

    fn format(&self, request: &mut Request) -> Result<()> {
        use std::io::Write;
        if !request.body.start_output(Self::mime()) {
            return Err(Error::ContentModeMismatch);
        }
        let encoded = build_query_string(&request.post_data, false);
        request.body.write_all(encoded.as_bytes())?;
        Ok(())
    }
}

/// `multipart/form-data` bodies, per
/// [RFC 2388](https://tools.ietf.org/html/rfc2388).
#[derive(Debug, Default, Clone, Copy)]
pub struct FormData;

impl PostFormat for FormData {
    fn can_parse(&self, request: &Request) -> bool {
        request
            .body
            .content_type()
            .is_some_and(|mime| mime.matches_type("multipart", "form-data"))
    }

    fn parse(&self, request: &mut Request) -> Result<()> {
        let boundary = request
            .body
            .content_type()
            .and_then(MimeType::parameter)
            .filter(|(name, _)| *name == "boundary")
            .map(|(_, value)| value.to_string())
            .ok_or(Error::InvalidPostData)?;

        let bytes = request.body.read_bytes()?;
        if request.body.has_error() {
            return Err(Error::InvalidPostData);
        }

        let mut form_data = Multipart::new(boundary);
        Http1Parser::new().multipart(Cursor::new(bytes), &mut form_data)?;

        for part in form_data.parts {
            let disposition = Http1Parser::compound_header(&part.headers["Content-Disposition"])
                .ok_or(Error::InvalidPostData)?;
            if disposition.value != "form-data" || !disposition.parameters.contains("name") {
                return Err(Error::InvalidPostData);
            }
            request.post_data.append(
                disposition.parameters["name"].to_string(),
                String::from_utf8_lossy(&part.content).into_owned(),
            );
        }

        Ok(())
    }

    fn can_format(&self, _request: &Request) -> bool {
        true
    }

    fn format(&self, request: &mut Request) -> Result<()> {
        let boundary = Multipart::suggest_boundary(&request.post_data);
        let content_type =
            MimeType::new("multipart", "form-data").with_parameter("boundary", &boundary);
        let formatter = Http1Formatter::new();

        let mut form_data = Multipart::new(boundary);
        for (name, value) in &request.post_data {
            let disposition = CompoundHeader {
                value: "form-data".to_string(),
                parameters: [("name", name)].into_iter().collect(),
            };
            let mut headers = Headers::new();
            headers.append("Content-Disposition", formatter.compound_header(&disposition));
            form_data.parts.push(MultipartPart {
                headers,
                content: value.clone().into_bytes(),
            });
        }

        if !request.body.start_output(content_type) {
            return Err(Error::ContentModeMismatch);
        }
        let output = request.body.output().ok_or(Error::ContentModeMismatch)?;
        formatter.multipart(output, &form_data)?;
        Ok(())
    }
}

/// The set of known POST body formats.
///
/// The default registry understands [`UrlEncoded`] and [`FormData`];
/// applications may register their own formats.
pub struct FormatRegistry {
    formats: Vec<Box<dyn PostFormat>>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(UrlEncoded);
        registry.register(FormData);
        registry
    }
}

impl FormatRegistry {
    /// A registry with no formats.
    pub fn empty() -> Self {
        Self {
            formats: Vec::new(),
        }
    }

    /// A registry with the standard formats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a format, consulted after the ones already present.
    pub fn register(&mut self, format: impl PostFormat + 'static) {
        self.formats.push(Box::new(format));
    }

    /// Whether some registered format can decode the request body.
    pub fn can_parse(&self, request: &Request) -> bool {
        self.formats.iter().any(|format| format.can_parse(request))
    }

    /// Decodes the request body with the first format that accepts it.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPostData`] when no format accepts the body or
    /// decoding fails.
    pub fn parse(&self, request: &mut Request) -> Result<()> {
        self.formats
            .iter()
            .find(|format| format.can_parse(request))
            .ok_or(Error::InvalidPostData)?
            .parse(request)
    }

    /// Encodes `post_data` with the first format that accepts the
    /// request.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPostData`] when no format accepts the request.
    pub fn format(&self, request: &mut Request) -> Result<()> {
        self.formats
            .iter()
            .find(|format| format.can_format(request))
            .ok_or(Error::InvalidPostData)?
            .format(request)
    }
}

impl Request {
    /// Whether [`parse_post`][Request::parse_post] with this registry
    /// would find a format for the body.
    pub fn can_parse_post(&self, registry: &FormatRegistry) -> bool {
        registry.can_parse(self)
    }

    /// Decodes the request body into [`post_data`][Request::post_data].
    ///
    /// # Errors
    ///
    /// See [`FormatRegistry::parse`].
    pub fn parse_post(&mut self, registry: &FormatRegistry) -> Result<()> {
        registry.parse(self)
    }

    /// Encodes [`post_data`][Request::post_data] into the request body.
    ///
    /// # Errors
    ///
    /// See [`FormatRegistry::format`].
    pub fn format_post(&mut self, registry: &FormatRegistry) -> Result<()> {
        registry.format(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Connection;

    fn request_with_body(content_type: &str, body: &[u8]) -> Request {
        let (connection, _) = Connection::synthetic(body);
        connection.expect_input(body.len());
        let mut request = Request::post("/submit");
        request.body.start_input(crate::InputBody::new(
            connection,
            body.len() as u64,
            content_type.parse().ok(),
        ));
        request
    }

    #[test]
    fn urlencoded_bodies_parse_into_post_data() {
        let mut request = request_with_body(
            "application/x-www-form-urlencoded",
            b"name=pony&mood=happy+enough",
        );
        let registry = FormatRegistry::new();
        assert!(request.can_parse_post(&registry));
        request.parse_post(&registry).unwrap();
        assert_eq!(&request.post_data["name"], "pony");
        assert_eq!(&request.post_data["mood"], "happy enough");
    }

    #[test]
    fn form_data_round_trips_through_a_body() {
        let registry = FormatRegistry::new();

        let mut outgoing = Request::post("/submit");
        outgoing.post_data.append("a", "hello");
        outgoing.post_data.append("b", "world");
        outgoing.format_post(&registry).unwrap();

        let content_type = outgoing.body.content_type().cloned().map(|m| m.to_string());
        let body = outgoing.body.output().map(|o| o.data().to_vec()).unwrap_or_default();

        let mut incoming = request_with_body(content_type.as_deref().unwrap_or_default(), &body);
        incoming.parse_post(&registry).unwrap();
        assert_eq!(&incoming.post_data["a"], "hello");
        assert_eq!(&incoming.post_data["b"], "world");
    }

    #[test]
    fn unknown_bodies_are_rejected() {
        let mut request = request_with_body("application/json", b"{}");
        let registry = FormatRegistry::new();
        assert!(!request.can_parse_post(&registry));
        assert!(request.parse_post(&registry).is_err());
    }
}
