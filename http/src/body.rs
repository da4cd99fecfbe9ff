use crate::{Connection, MimeType};
use encoding_rs::Encoding;
use std::{
    fmt::{self, Debug, Formatter},
    io::{self, Read, Write},
    sync::Arc,
};

fn charset_encoding(content_type: Option<&MimeType>) -> &'static Encoding {
    content_type
        .and_then(MimeType::parameter)
        .filter(|(name, _)| *name == "charset")
        .and_then(|(_, value)| Encoding::for_label(value.as_bytes()))
        .unwrap_or(encoding_rs::WINDOWS_1252)
}

/// A message body being read from a connection.
///
/// The body is framed by the declared Content-Length: reads stop at the
/// frame boundary rather than blocking on a quiet socket. A body that
/// ends early (peer disconnect, deadline) flips the error flag.
pub struct InputBody {
    connection: Arc<Connection>,
    content_length: u64,
    remaining: u64,
    content_type: Option<MimeType>,
    error: bool,
}

impl Debug for InputBody {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputBody")
            .field("content_length", &self.content_length)
            .field("remaining", &self.remaining)
            .field("content_type", &self.content_type)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl InputBody {
    pub(crate) fn new(
        connection: Arc<Connection>,
        content_length: u64,
        content_type: Option<MimeType>,
    ) -> Self {
        Self {
            connection,
            content_length,
            remaining: content_length,
            content_type,
            error: false,
        }
    }

    /// The length declared by the message head.
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// The declared content type, when one parsed.
    pub fn content_type(&self) -> Option<&MimeType> {
        self.content_type.as_ref()
    }

    /// Whether reading failed or ended short of the declared length.
    pub fn has_error(&self) -> bool {
        self.error
    }

    /// The character encoding named by the content type's `charset`,
    /// defaulting to windows-1252.
    pub fn encoding(&self) -> &'static Encoding {
        charset_encoding(self.content_type.as_ref())
    }

    /// Reads the rest of the framed body.
    ///
    /// A body cut short by the peer sets the error flag and returns the
    /// bytes that did arrive.
    ///
    /// # Errors
    ///
    /// Any socket read error, including the deadline firing.
    pub fn read_bytes(&mut self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(usize::try_from(self.remaining).unwrap_or(0));
        match self.read_to_end(&mut bytes) {
            Ok(_) => {
                if self.remaining > 0 {
                    self.error = true;
                }
                Ok(bytes)
            }
            Err(e) => {
                self.error = true;
                Err(e)
            }
        }
    }

    /// Reads the rest of the framed body and decodes it with
    /// [`encoding`][InputBody::encoding]; malformed sequences become
    /// replacement characters.
    ///
    /// # Errors
    ///
    /// Any socket read error, including the deadline firing.
    pub fn read_string(&mut self) -> io::Result<String> {
        let encoding = self.encoding();
        let bytes = self.read_bytes()?;
        let (string, _, _) = encoding.decode(&bytes);
        Ok(string.into_owned())
    }
}

impl Read for InputBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let limit = usize::try_from(self.remaining)
            .unwrap_or(usize::MAX)
            .min(buf.len());
        let read = self.connection.read_buffered(&mut buf[..limit])?;
        self.remaining -= read as u64;
        Ok(read)
    }
}

/// A message body being built for sending: an owned buffer plus the
/// content type it will be declared with.
#[derive(Debug, Default)]
pub struct OutputBody {
    buffer: Vec<u8>,
    content_type: Option<MimeType>,
}

impl OutputBody {
    /// The declared content type; `None` after
    /// [`clear`][OutputBody::clear].
    pub fn content_type(&self) -> Option<&MimeType> {
        self.content_type.as_ref()
    }

    /// Bytes accumulated so far.
    pub fn content_length(&self) -> u64 {
        self.buffer.len() as u64
    }

    /// Whether the body holds sendable data (possibly zero-length).
    pub fn has_data(&self) -> bool {
        self.content_type.is_some()
    }

    /// The accumulated bytes.
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    /// Writes the accumulated bytes to `output`.
    ///
    /// # Errors
    ///
    /// Whatever `output` reports.
    pub fn write_to(&self, output: &mut impl Write) -> io::Result<()> {
        if self.has_data() {
            output.write_all(&self.buffer)?;
        }
        Ok(())
    }

    /// Drops the accumulated data and content type.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.content_type = None;
    }
}

impl Write for OutputBody {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A message body in one of its three states: absent, being read, or
/// being written.
///
/// Transitions are one-way. A body that has begun reading can never be
/// switched to writing, and vice versa; [`stop_output`][Content::stop_output]
/// discards written data but leaves the body on the output side.
#[derive(Debug, Default)]
pub enum Content {
    /// no body
    #[default]
    None,
    /// body bound to a connection for reading
    Input(InputBody),
    /// body being accumulated for sending
    Output(OutputBody),
}

impl Content {
    /// Binds the body to `input` for reading. Fails (returning false)
    /// when the body is already in output mode.
    pub fn start_input(&mut self, input: InputBody) -> bool {
        match self {
            Content::Output(_) => false,
            _ => {
                *self = Content::Input(input);
                true
            }
        }
    }

    /// Puts the body in output mode with the given content type,
    /// clearing any previously written data. Fails (returning false)
    /// when the body is in input mode.
    pub fn start_output(&mut self, content_type: MimeType) -> bool {
        match self {
            Content::Input(_) => false,
            Content::Output(output) => {
                output.clear();
                output.content_type = Some(content_type);
                true
            }
            Content::None => {
                *self = Content::Output(OutputBody {
                    buffer: Vec::new(),
                    content_type: Some(content_type),
                });
                true
            }
        }
    }

    /// Discards any data written so far; the body stays on the output
    /// side. Returns false when the body is not in output mode.
    pub fn stop_output(&mut self) -> bool {
        match self {
            Content::Output(output) => {
                output.clear();
                true
            }
            _ => false,
        }
    }

    /// Whether there is data to read or send (which may have zero
    /// length).
    pub fn has_data(&self) -> bool {
        match self {
            Content::None => false,
            Content::Input(input) => !input.has_error(),
            Content::Output(output) => output.has_data(),
        }
    }

    /// Whether the body hit an error.
    pub fn has_error(&self) -> bool {
        match self {
            Content::Input(input) => input.has_error(),
            _ => false,
        }
    }

    /// Declared length (input) or accumulated length (output).
    pub fn content_length(&self) -> u64 {
        match self {
            Content::None => 0,
            Content::Input(input) => input.content_length(),
            Content::Output(output) => output.content_length(),
        }
    }

    /// The body's content type, when one is set.
    pub fn content_type(&self) -> Option<&MimeType> {
        match self {
            Content::None => None,
            Content::Input(input) => input.content_type(),
            Content::Output(output) => output.content_type(),
        }
    }

    /// The reading side, when in input mode.
    pub fn input(&mut self) -> Option<&mut InputBody> {
        match self {
            Content::Input(input) => Some(input),
            _ => None,
        }
    }

    /// The writing side, when in output mode.
    pub fn output(&mut self) -> Option<&mut OutputBody> {
        match self {
            Content::Output(output) => Some(output),
            _ => None,
        }
    }

    /// Reads the rest of an input body; `Ok(empty)` when there is none.
    ///
    /// # Errors
    ///
    /// Any socket read error, including the deadline firing.
    pub fn read_bytes(&mut self) -> io::Result<Vec<u8>> {
        match self.input() {
            Some(input) => input.read_bytes(),
            None => Ok(Vec::new()),
        }
    }

    /// Reads and charset-decodes the rest of an input body; `Ok(empty)`
    /// when there is none.
    ///
    /// # Errors
    ///
    /// Any socket read error, including the deadline firing.
    pub fn read_string(&mut self) -> io::Result<String> {
        match self.input() {
            Some(input) => input.read_string(),
            None => Ok(String::new()),
        }
    }
}

impl Write for Content {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.output() {
            Some(output) => output.write(buf),
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "content stream is not in output mode",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input_body(bytes: &[u8], content_length: u64) -> InputBody {
        let (connection, _) = Connection::synthetic(bytes);
        connection.expect_input(content_length as usize);
        InputBody::new(connection, content_length, None)
    }

    #[test]
    fn input_reads_exactly_the_framed_bytes() {
        let mut body = input_body(b"hello, extra", 5);
        assert_eq!(body.read_bytes().unwrap(), b"hello");
        assert!(!body.has_error());
    }

    #[test]
    fn short_input_sets_the_error_flag() {
        let mut body = input_body(b"hel", 5);
        assert_eq!(body.read_bytes().unwrap(), b"hel");
        assert!(body.has_error());
    }

    #[test]
    fn read_string_honors_the_charset() {
        let (connection, _) = Connection::synthetic(&[0xe9][..]);
        connection.expect_input(1);
        let latin1: MimeType = "text/plain;charset=ISO-8859-1".parse().unwrap();
        let mut body = InputBody::new(connection, 1, Some(latin1));
        assert_eq!(body.read_string().unwrap(), "é");
    }

    #[test]
    fn transitions_are_one_way() {
        let mut content = Content::None;
        assert!(content.start_output("text/plain".parse().unwrap()));
        content.write_all(b"x").unwrap();
        assert!(!content.start_input(input_body(b"", 0)));

        let mut content = Content::None;
        assert!(content.start_input(input_body(b"", 0)));
        assert!(!content.start_output("text/plain".parse().unwrap()));
    }

    #[test]
    fn stop_output_discards_data_but_keeps_the_mode() {
        let mut content = Content::None;
        content.start_output("text/plain".parse().unwrap());
        content.write_all(b"body").unwrap();
        assert_eq!(content.content_length(), 4);

        assert!(content.stop_output());
        assert!(!content.has_data());
        assert_eq!(content.content_length(), 0);
        assert!(!content.start_input(input_body(b"", 0)));
        assert!(content.start_output("text/html".parse().unwrap()));
    }
}
