use crate::{
    encoding::BaseEncoding,
    params::KeyCase,
    scan::{quoted_string, Scanner, StrScanner},
    Auth, Cookie, DataMap, Error, Headers, InputBody, Multipart, MultipartPart, OrderedMap,
    Protocol, ReceiveStream, Request, Response, Result, Status,
};
use std::io::Read;

/// A header value followed by `;`-delimited parameters, e.g.
/// `form-data; name="field"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundHeader {
    /// the primary value, before the first delimiter
    pub value: String,
    /// the parameters after it
    pub parameters: Headers,
}

/// Parser for the HTTP/1.x wire grammar.
///
/// Request parsing never fails outright: the parsed [`Request`] carries a
/// [*suggested status*][Request::suggested_status] describing how the
/// server should reply. Response parsing, done on behalf of a client,
/// reports failures as [`Error`] values instead.
#[derive(Debug, Clone, Copy)]
pub struct Http1Parser {
    /// whether `Cookie` / `Set-Cookie` headers are decoded into cookie
    /// maps; when off they are still available as plain headers
    pub parse_cookies: bool,
    /// whether obsolete folded headers are concatenated rather than
    /// rejected with `400 Bad Request`
    pub parse_folded_headers: bool,
}

impl Default for Http1Parser {
    fn default() -> Self {
        Self {
            parse_cookies: true,
            parse_folded_headers: false,
        }
    }
}

enum LineType {
    Boundary,
    LastBoundary,
    Data,
}

impl Http1Parser {
    /// A parser with the default flags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chainable setter for folded-header tolerance.
    pub fn with_folded_headers(mut self, parse_folded_headers: bool) -> Self {
        self.parse_folded_headers = parse_folded_headers;
        self
    }

    /// Chainable setter for cookie decoding.
    pub fn with_cookies(mut self, parse_cookies: bool) -> Self {
        self.parse_cookies = parse_cookies;
        self
    }

    /// Reads a full request from the stream.
    ///
    /// The returned request's `suggested_status` is `200 OK` when it may
    /// be dispatched, `100 Continue` when the client awaits permission to
    /// send its body, and an error status otherwise.
    pub fn request(&self, stream: &mut ReceiveStream) -> Request {
        let mut request = Request::default();
        request.connection = Some(stream.connection().clone());
        request.from = stream.connection().remote_address();

        if stream.is_bad() {
            request.suggested_status = if stream.timed_out() {
                Status::REQUEST_TIMEOUT
            } else {
                Status::BAD_REQUEST
            };
            return request;
        }

        request.suggested_status = self.request_inner(stream, &mut request);
        request
    }

    fn request_inner(&self, stream: &mut ReceiveStream, request: &mut Request) -> Status {
        let connection = stream.connection().clone();
        let mut scanner = Scanner::new(stream);

        if !self.request_line(&mut scanner, request) {
            return Status::BAD_REQUEST;
        }

        if !self.headers_scan(&mut scanner, &mut request.headers) {
            return Status::BAD_REQUEST;
        }

        drop(scanner);

        if self.parse_cookies {
            for value in request.headers.get_all("Cookie") {
                if !Self::header_parameters(value, ';', &mut request.cookies) {
                    return Status::BAD_REQUEST;
                }
            }
        }

        if let Some(authorization) = request.headers.get("Authorization") {
            if let Some(auth) = Self::auth(authorization) {
                request.auth = auth;
            }
        }

        if let Some(content_length) = request.headers.get("Content-Length") {
            let Ok(length) = content_length.trim().parse::<u64>() else {
                return Status::BAD_REQUEST;
            };
            let content_type = request
                .headers
                .get("Content-Type")
                .and_then(|value| value.parse().ok());
            if !request
                .body
                .start_input(InputBody::new(connection.clone(), length, content_type))
            {
                return Status::BAD_REQUEST;
            }
            connection.expect_input(usize::try_from(length).unwrap_or(usize::MAX));

            if request.protocol >= Protocol::http_1_1()
                && request.headers["Expect"].eq_ignore_ascii_case("100-continue")
            {
                return Status::CONTINUE;
            }
        } else if connection.buffered_input() > 0 {
            return Status::LENGTH_REQUIRED;
        }

        if request.protocol < Protocol::http_1_1() && request.headers.contains("Expect") {
            return Status::EXPECTATION_FAILED;
        }

        Status::OK
    }

    /// Reads a full response from the stream.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedResponse`] for an unparseable status line,
    /// [`Error::MalformedHeaders`] for a bad header block or `Set-Cookie`,
    /// [`Error::InvalidPayload`] for body framing the parser cannot use,
    /// and [`Error::Io`] when the stream was dead to begin with.
    pub fn response(&self, stream: &mut ReceiveStream) -> Result<Response> {
        if stream.is_bad() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "network error",
            )));
        }

        let connection = stream.connection().clone();
        let mut response = Response::default();
        response.connection = Some(connection.clone());

        let mut scanner = Scanner::new(stream);
        if !self.response_line(&mut scanner, &mut response) {
            return Err(Error::MalformedResponse);
        }
        if !self.headers_scan(&mut scanner, &mut response.headers) {
            return Err(Error::MalformedHeaders);
        }
        drop(scanner);

        if self.parse_cookies {
            for value in response.headers.get_all("Set-Cookie") {
                let cookie = Self::set_cookie(value).ok_or(Error::MalformedHeaders)?;
                response.cookies.append(cookie.0, cookie.1);
            }
        }

        if let Some(content_length) = response.headers.get("Content-Length") {
            let Ok(length) = content_length.trim().parse::<u64>() else {
                return Err(Error::InvalidPayload);
            };
            let content_type = response
                .headers
                .get("Content-Type")
                .and_then(|value| value.parse().ok());
            if !response
                .body
                .start_input(InputBody::new(connection, length, content_type))
            {
                return Err(Error::InvalidPayload);
            }
        }

        Ok(response)
    }

    /// Parses one `Set-Cookie` header value: the first pair names the
    /// cookie, the remaining pairs are attributes.
    fn set_cookie(value: &str) -> Option<(String, Cookie)> {
        let mut parameters = DataMap::new();
        if !Self::header_parameters(value, ';', &mut parameters) || parameters.is_empty() {
            return None;
        }

        let mut entries = parameters.into_iter();
        let (name, value) = entries.next()?;
        let mut cookie = Cookie::new(value);

        for (attribute, attribute_value) in entries {
            match attribute.to_ascii_lowercase().as_str() {
                "expires" => cookie.expires = httpdate::parse_http_date(&attribute_value).ok(),
                "max-age" => cookie.max_age = attribute_value.parse().ok(),
                "domain" => cookie.domain = attribute_value,
                "path" => cookie.path = attribute_value,
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                _ if attribute_value.is_empty() => cookie.extension.push(attribute),
                _ => cookie
                    .extension
                    .push(format!("{attribute}={attribute_value}")),
            }
        }

        Some((name, cookie))
    }

    /// Reads the request line, e.g. `GET /url HTTP/1.1`.
    fn request_line<R: Read>(&self, scanner: &mut Scanner<R>, request: &mut Request) -> bool {
        let Some(method) = Self::token(scanner) else {
            return false;
        };
        let Some(target) = Self::token(scanner) else {
            return false;
        };
        let Some(protocol) = Self::token(scanner) else {
            return false;
        };
        Self::skip_line(scanner);

        let Ok(method) = method.parse() else {
            return false;
        };
        request.method = method;
        request.url = crate::Uri::parse(&target);
        request.query_data = request.url.query.clone();

        match protocol.parse() {
            Ok(protocol) => {
                request.protocol = protocol;
                true
            }
            Err(_) => false,
        }
    }

    /// Reads the response line, e.g. `HTTP/1.1 200 OK`. The reason
    /// phrase on the wire is discarded in favor of the canonical one.
    fn response_line<R: Read>(&self, scanner: &mut Scanner<R>, response: &mut Response) -> bool {
        let Some(protocol) = Self::token(scanner) else {
            return false;
        };
        let Some(code) = Self::token(scanner) else {
            return false;
        };
        Self::skip_line(scanner);

        let Ok(protocol) = protocol.parse() else {
            return false;
        };
        response.protocol = protocol;

        match code.parse::<u16>() {
            Ok(code) => {
                response.status = Status::new(code);
                true
            }
            Err(_) => false,
        }
    }

    /// Reads a header block and the blank line terminating it into
    /// `headers`. Returns false on malformed input.
    pub fn headers(&self, input: impl Read, headers: &mut Headers) -> bool {
        self.headers_scan(&mut Scanner::new(input), headers)
    }

    fn headers_scan<R: Read>(&self, scanner: &mut Scanner<R>, headers: &mut Headers) -> bool {
        loop {
            let Ok(Some(next)) = scanner.peek_byte() else {
                return false;
            };

            if next == b'\r' {
                Self::skip_line(scanner);
                return true;
            }

            // (obsolete) header folding: either reject with 400 or
            // concatenate onto the previous value
            if next == b' ' || next == b'\t' {
                if !self.parse_folded_headers || headers.is_empty() {
                    return false;
                }
                Self::skip_spaces(scanner);
                let Some(continuation) = Self::line(scanner) else {
                    return false;
                };
                let Some((_, value)) = headers.back_mut() else {
                    return false;
                };
                value.push(' ');
                value.push_str(&continuation);
                continue;
            }

            let Some(name) = Self::delimited(scanner, b':') else {
                return false;
            };

            let value = if matches!(scanner.peek_byte(), Ok(Some(b'"'))) {
                match self.quoted_header_value(scanner) {
                    Some(value) => value,
                    None => return false,
                }
            } else {
                match Self::line(scanner) {
                    Some(value) => value,
                    None => return false,
                }
            };

            headers.append(name, value);
        }
    }

    /// Reads a `"quoted"` header value with backslash escapes, then the
    /// rest of its line.
    fn quoted_header_value<R: Read>(&self, scanner: &mut Scanner<R>) -> Option<String> {
        scanner.next_byte().ok()?;
        let mut value = Vec::new();
        let mut escaped = false;
        loop {
            let byte = scanner.next_byte().ok().flatten()?;
            if matches!(byte, b'\r' | b'\n') {
                return None;
            }
            if !escaped {
                if byte == b'"' {
                    break;
                }
                if byte == b'\\' {
                    escaped = true;
                    continue;
                }
            } else {
                escaped = false;
            }
            value.push(byte);
        }
        Self::skip_line(scanner);
        Some(String::from_utf8_lossy(&value).into_owned())
    }

    /// Reads header parameters (`a=1; b="2"`) from `input` into
    /// `output`, with `delimiter` between pairs. A pair without `=`
    /// gets an empty value. Returns false on an unterminated quote.
    pub fn header_parameters<C: KeyCase>(
        input: &str,
        delimiter: char,
        output: &mut OrderedMap<String, C>,
    ) -> bool {
        let delimiter = delimiter as u8;
        let is_boundary = move |byte: u8| byte.is_ascii_whitespace() || byte == delimiter;

        let mut scanner = StrScanner::new(input);
        while !scanner.eof() {
            scanner.ignore_while(is_boundary);
            if scanner.eof() {
                break;
            }

            let name = scanner.take_until(|byte| byte == b'=' || is_boundary(byte));
            let mut value = String::new();
            if scanner.peek() == Some(b'=') {
                scanner.next_byte();
                if scanner.peek() == Some(b'"') {
                    match quoted_string(&mut scanner) {
                        Some(quoted) => value = quoted,
                        None => return false,
                    }
                } else {
                    value = scanner.take_until(is_boundary).to_string();
                }
            }
            output.append(name, value);
        }
        true
    }

    /// Splits a compound header value (`value; a=1`) into its primary
    /// value and parameters.
    pub fn compound_header(header_value: &str) -> Option<CompoundHeader> {
        let mut scanner = StrScanner::new(header_value);
        let value = scanner
            .take_until(|byte| byte.is_ascii_whitespace() || byte == b';')
            .to_string();
        let mut parameters = Headers::new();
        Self::header_parameters(scanner.remaining(), ';', &mut parameters)
            .then_some(CompoundHeader { value, parameters })
    }

    /// Parses an `Authorization` header. For the `Basic` scheme the
    /// credential string is base64-decoded into user and password.
    pub fn auth(header_contents: &str) -> Option<Auth> {
        let mut scanner = StrScanner::new(header_contents);
        let mut auth = Auth::default();

        auth.scheme = scanner
            .take_until(|byte| byte.is_ascii_whitespace())
            .to_string();
        scanner.ignore_while(|byte| byte.is_ascii_whitespace());
        auth.auth_string = scanner
            .take_until(|byte| byte.is_ascii_whitespace())
            .to_string();

        if !Self::header_parameters(scanner.remaining(), ';', &mut auth.parameters) {
            return None;
        }
        auth.realm = auth.parameters["realm"].to_string();
        auth.parameters.remove("realm");

        if auth.scheme == "Basic" {
            let decoded = BaseEncoding::base64().decode(&auth.auth_string).ok()?;
            let decoded = String::from_utf8_lossy(&decoded);
            match decoded.split_once(':') {
                Some((user, password)) => {
                    auth.user = user.to_string();
                    auth.password = password.to_string();
                }
                None => auth.user = decoded.into_owned(),
            }
        }

        Some(auth)
    }

    /// Reads a multipart payload framed by `multipart.boundary` from
    /// `input`, appending to `multipart.parts`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidMultipart`] for a bad boundary or framing, or the
    /// underlying read error.
    pub fn multipart(&self, input: impl Read, multipart: &mut Multipart) -> Result<()> {
        if !Multipart::valid_boundary(&multipart.boundary) {
            return Err(Error::InvalidMultipart);
        }

        let mut scanner = Scanner::new(input);
        loop {
            let Some(line) = scanner.bytes_until(b'\r')? else {
                return Err(Error::InvalidMultipart);
            };

            match Self::line_type(&line, &multipart.boundary) {
                LineType::LastBoundary => return Self::cleanup_boundary(&mut scanner, multipart),
                LineType::Boundary => {
                    Self::cleanup_boundary(&mut scanner, multipart)?;
                    let mut part = MultipartPart::default();
                    if !self.headers_scan(&mut scanner, &mut part.headers) {
                        return Err(Error::InvalidMultipart);
                    }
                    multipart.parts.push(part);
                }
                LineType::Data => {
                    let Some(part) = multipart.parts.last_mut() else {
                        return Err(Error::InvalidMultipart);
                    };
                    part.content.extend_from_slice(&line);
                    part.content.push(b'\r');
                    let Some(rest) = scanner.bytes_until(b'\n')? else {
                        return Err(Error::InvalidMultipart);
                    };
                    part.content.extend_from_slice(&rest);
                    part.content.push(b'\n');
                }
            }
        }
    }

    /// Classifies a multipart line as `--boundary`, `--boundary--`, or
    /// data. Trailing blanks after a boundary are tolerated.
    fn line_type(line: &[u8], boundary: &str) -> LineType {
        let boundary = boundary.as_bytes();
        if line.len() < boundary.len() + 2 || &line[..2] != b"--" {
            return LineType::Data;
        }
        if &line[2..2 + boundary.len()] != boundary {
            return LineType::Data;
        }

        let mut rest = &line[2 + boundary.len()..];
        let mut line_type = LineType::Boundary;
        if rest.starts_with(b"--") {
            line_type = LineType::LastBoundary;
            rest = &rest[2..];
        }

        if rest.iter().all(|byte| matches!(byte, b' ' | b'\t')) {
            line_type
        } else {
            LineType::Data
        }
    }

    /// Consumes the `\n` finishing a boundary line and strips the CRLF
    /// that preceded the boundary from the previous part's content.
    fn cleanup_boundary<R: Read>(
        scanner: &mut Scanner<R>,
        multipart: &mut Multipart,
    ) -> Result<()> {
        if scanner.next_byte()? != Some(b'\n') {
            return Err(Error::InvalidMultipart);
        }

        if let Some(part) = multipart.parts.last_mut() {
            if !part.content.is_empty() {
                if !part.content.ends_with(b"\r\n") {
                    return Err(Error::InvalidMultipart);
                }
                part.content.truncate(part.content.len() - 2);
            }
        }

        Ok(())
    }

    /// Reads a whitespace-delimited token, skipping leading whitespace.
    fn token<R: Read>(scanner: &mut Scanner<R>) -> Option<String> {
        let mut token = Vec::new();
        loop {
            match scanner.peek_byte().ok()? {
                Some(byte) if byte.is_ascii_whitespace() && token.is_empty() => {
                    scanner.next_byte().ok()?;
                }
                Some(byte) if !byte.is_ascii_whitespace() => {
                    scanner.next_byte().ok()?;
                    token.push(byte);
                }
                _ if token.is_empty() => return None,
                _ => return Some(String::from_utf8_lossy(&token).into_owned()),
            }
        }
    }

    /// Reads a name up to `delim`, then skips the spaces after it.
    /// Fails when the line or input ends first.
    fn delimited<R: Read>(scanner: &mut Scanner<R>, delim: u8) -> Option<String> {
        let mut name = Vec::new();
        loop {
            let byte = scanner.next_byte().ok().flatten()?;
            if byte == b'\r' {
                return None;
            }
            if byte == delim {
                break;
            }
            name.push(byte);
        }

        Self::skip_spaces(scanner);
        match scanner.peek_byte() {
            Ok(Some(b'\r')) | Ok(None) | Err(_) => None,
            Ok(Some(_)) => Some(String::from_utf8_lossy(&name).into_owned()),
        }
    }

    /// Skips spaces and tabs, stopping at `\r`.
    fn skip_spaces<R: Read>(scanner: &mut Scanner<R>) {
        while matches!(scanner.peek_byte(), Ok(Some(b' ')) | Ok(Some(b'\t'))) {
            let _ = scanner.next_byte();
        }
    }

    /// Reads the rest of the line up to `\r\n`, returning it without the
    /// line ending.
    fn line<R: Read>(scanner: &mut Scanner<R>) -> Option<String> {
        let value = scanner.bytes_until(b'\r').ok().flatten()?;
        scanner.next_byte().ok()?;
        Some(String::from_utf8_lossy(&value).into_owned())
    }

    /// Ignores everything up to and including the next `\n`.
    fn skip_line<R: Read>(scanner: &mut Scanner<R>) {
        while let Ok(Some(byte)) = scanner.next_byte() {
            if byte == b'\n' {
                break;
            }
        }
    }
}
