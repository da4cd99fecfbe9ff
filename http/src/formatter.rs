use crate::{AuthChallenge, CompoundHeader, Headers, Multipart, Request, Response};
use std::{
    borrow::Cow,
    fmt::Display,
    io::{self, Write},
};

/// characters that force a header parameter value into quotes
fn needs_quoting(value: &str) -> bool {
    value.is_empty() || value.bytes().any(|byte| matches!(byte, b'"' | b' ' | b'\t' | b'\\'))
}

fn escaped(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            output.push('\\');
        }
        output.push(c);
    }
    output
}

/// Formatter for the HTTP/1.x wire grammar, symmetric to
/// [`Http1Parser`][crate::Http1Parser].
///
/// Lines end with CRLF unless another ending is injected.
#[derive(Debug, Clone)]
pub struct Http1Formatter {
    endl: Cow<'static, str>,
}

impl Default for Http1Formatter {
    fn default() -> Self {
        Self {
            endl: Cow::Borrowed("\r\n"),
        }
    }
}

impl Http1Formatter {
    /// A formatter emitting CRLF line endings.
    pub fn new() -> Self {
        Self::default()
    }

    /// A formatter emitting the given line ending.
    pub fn with_line_ending(endl: impl Into<Cow<'static, str>>) -> Self {
        Self { endl: endl.into() }
    }

    /// Writes the entire response: status line, headers, and body.
    ///
    /// The response is taken mutably because writing drains its body
    /// buffer state; headers the caller already set are never duplicated.
    ///
    /// # Errors
    ///
    /// Whatever the output stream reports.
    pub fn response(&self, output: &mut impl Write, response: &mut Response) -> io::Result<()> {
        self.response_line(output, response)?;
        self.response_headers(output, response)?;
        if let Some(body) = response.body.output() {
            body.write_to(output)?;
        }
        Ok(())
    }

    /// Writes the entire request: request line, headers, and body.
    ///
    /// # Errors
    ///
    /// Whatever the output stream reports.
    pub fn request(&self, output: &mut impl Write, request: &mut Request) -> io::Result<()> {
        self.request_line(output, request)?;
        self.request_headers(output, request)?;
        if let Some(body) = request.body.output() {
            body.write_to(output)?;
        }
        Ok(())
    }

    /// Writes a block of headers, without the terminating blank line.
    ///
    /// # Errors
    ///
    /// Whatever the output stream reports.
    pub fn headers(&self, output: &mut impl Write, headers: &Headers) -> io::Result<()> {
        for (name, value) in headers {
            self.header(output, name, value)?;
        }
        Ok(())
    }

    /// Writes one authentication challenge, e.g. `Basic realm="pony"`.
    ///
    /// # Errors
    ///
    /// Whatever the output stream reports.
    pub fn auth_challenge(
        &self,
        output: &mut impl Write,
        challenge: &AuthChallenge,
    ) -> io::Result<()> {
        write!(output, "{}", challenge.scheme)?;
        if !challenge.realm.is_empty() {
            write!(output, " realm=\"{}\";", escaped(&challenge.realm))?;
        }
        if !challenge.parameters.is_empty() {
            write!(output, " ")?;
            self.header_parameters(output, &challenge.parameters, ", ")?;
        }
        Ok(())
    }

    /// Renders a compound header value, e.g.
    /// `form-data; name="field"`.
    pub fn compound_header(&self, header: &CompoundHeader) -> String {
        let mut output = Vec::new();
        // writing to a Vec cannot fail
        let _ = write!(output, "{}", header.value);
        if !header.parameters.is_empty() {
            let _ = write!(output, "; ");
            let _ = self.header_parameters(&mut output, &header.parameters, "; ");
        }
        String::from_utf8_lossy(&output).into_owned()
    }

    /// Writes a multipart payload framed by `multipart.boundary`.
    /// Formatting then reparsing yields the same parts.
    ///
    /// # Errors
    ///
    /// Whatever the output stream reports.
    pub fn multipart(&self, output: &mut impl Write, multipart: &Multipart) -> io::Result<()> {
        for part in &multipart.parts {
            write!(output, "--{}{}", multipart.boundary, self.endl)?;
            self.headers(output, &part.headers)?;
            write!(output, "{}", self.endl)?;
            output.write_all(&part.content)?;
            write!(output, "{}", self.endl)?;
        }
        write!(output, "--{}--{}", multipart.boundary, self.endl)
    }

    fn response_line(&self, output: &mut impl Write, response: &Response) -> io::Result<()> {
        write!(
            output,
            "{} {} {}{}",
            response.protocol, response.status.code, response.status.reason, self.endl
        )
    }

    fn request_line(&self, output: &mut impl Write, request: &Request) -> io::Result<()> {
        write!(
            output,
            "{} {}{} {}{}",
            request.method,
            request.url.path.url_encoded(true),
            request.url.query_string(true),
            request.protocol,
            self.endl
        )
    }

    fn header(
        &self,
        output: &mut impl Write,
        name: impl Display,
        value: impl Display,
    ) -> io::Result<()> {
        write!(output, "{name}: {value}{}", self.endl)
    }

    fn header_parameters<'a>(
        &self,
        output: &mut impl Write,
        parameters: impl IntoIterator<Item = (&'a str, &'a String)>,
        delimiter: &str,
    ) -> io::Result<()> {
        for (index, (name, value)) in parameters.into_iter().enumerate() {
            if index > 0 {
                write!(output, "{delimiter}")?;
            }
            if needs_quoting(value) {
                write!(output, "{name}=\"{}\"", escaped(value))?;
            } else {
                write!(output, "{name}={value}")?;
            }
        }
        Ok(())
    }

    fn authenticate_header(
        &self,
        output: &mut impl Write,
        name: &str,
        challenges: &[AuthChallenge],
    ) -> io::Result<()> {
        if challenges.is_empty() {
            return Ok(());
        }
        write!(output, "{name}: ")?;
        for (index, challenge) in challenges.iter().enumerate() {
            if index > 0 {
                write!(output, ", ")?;
            }
            self.auth_challenge(output, challenge)?;
        }
        write!(output, "{}", self.endl)
    }

    /// Writes all response headers and the blank line, filling in
    /// `Date`, pending `Set-Cookie`s, authenticate challenges, and body
    /// framing headers unless the caller already set them.
    fn response_headers(&self, output: &mut impl Write, response: &Response) -> io::Result<()> {
        if !response.headers.contains("Date") {
            self.header(output, "Date", httpdate::fmt_http_date(response.date))?;
        }

        self.headers(output, &response.headers)?;

        if !response.cookies.is_empty() && !response.headers.contains("Set-Cookie") {
            for (name, cookie) in &response.cookies {
                self.header(output, "Set-Cookie", cookie.encode(name))?;
            }
        }

        if !response.headers.contains("WWW-Authenticate") {
            self.authenticate_header(output, "WWW-Authenticate", &response.www_authenticate)?;
        }

        if !response.headers.contains("Proxy-Authenticate") {
            self.authenticate_header(output, "Proxy-Authenticate", &response.proxy_authenticate)?;
        }

        if response.body.has_data() {
            if !response.headers.contains("Content-Type") {
                if let Some(content_type) = response.body.content_type() {
                    self.header(output, "Content-Type", content_type)?;
                }
            }
            if !response.headers.contains("Content-Length") {
                self.header(output, "Content-Length", response.body.content_length())?;
            }
        }

        write!(output, "{}", self.endl)
    }

    /// Writes all request headers and the blank line, filling in `Host`,
    /// a consolidated `Cookie`, and body framing headers unless the
    /// caller already set them.
    fn request_headers(&self, output: &mut impl Write, request: &Request) -> io::Result<()> {
        self.headers(output, &request.headers)?;

        if !request.headers.contains("Host") && !request.url.authority.host.is_empty() {
            match request.url.authority.port {
                Some(port) => self.header(
                    output,
                    "Host",
                    format!("{}:{port}", request.url.authority.host),
                )?,
                None => self.header(output, "Host", &request.url.authority.host)?,
            }
        }

        if !request.cookies.is_empty() && !request.headers.contains("Cookie") {
            write!(output, "Cookie: ")?;
            self.header_parameters(output, &request.cookies, "; ")?;
            write!(output, "{}", self.endl)?;
        }

        if request.body.has_data() {
            if !request.headers.contains("Content-Type") {
                if let Some(content_type) = request.body.content_type() {
                    self.header(output, "Content-Type", content_type)?;
                }
            }
            if !request.headers.contains("Content-Length") {
                self.header(output, "Content-Length", request.body.content_length())?;
            }
        }

        write!(output, "{}", self.endl)
    }
}
