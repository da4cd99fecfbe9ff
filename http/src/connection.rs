use crate::Transport;
use async_io::Timer;
use futures_lite::{future, AsyncReadExt, AsyncWriteExt};
use std::{
    fmt::{self, Debug, Formatter},
    io::{self, Read, Write},
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::{Duration, Instant},
};

/// bytes pulled up front when a receive stream is opened
const INITIAL_READ: usize = 1024;

/// largest single pull from the socket, whatever the frame still owes
const MAX_PULL: usize = 64 * 1024;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn expire<T>(deadline: Option<Instant>) -> io::Result<T> {
    match deadline {
        Some(at) => {
            Timer::at(at).await;
            Err(io::ErrorKind::TimedOut.into())
        }
        None => future::pending().await,
    }
}

/// A transport with a single expiring deadline shared across operations.
///
/// Each blocking call runs a private event loop that drives the I/O
/// operation and the deadline timer together; whichever finishes first
/// wins. When the deadline fires, the operation returns
/// [`io::ErrorKind::TimedOut`] and the socket is flagged as timed out.
///
/// The deadline is snapshotted when an operation starts, so a timeout set
/// while an operation is in flight applies from the next operation on.
pub struct TimeoutSocket {
    transport: Box<dyn Transport>,
    deadline: Option<Instant>,
    timed_out: bool,
}

impl Debug for TimeoutSocket {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeoutSocket")
            .field("deadline", &self.deadline)
            .field("timed_out", &self.timed_out)
            .finish_non_exhaustive()
    }
}

impl TimeoutSocket {
    /// Wraps a transport with no deadline set.
    pub fn new(transport: impl Transport) -> Self {
        Self {
            transport: Box::new(transport),
            deadline: None,
            timed_out: false,
        }
    }

    /// Replaces the deadline with one `timeout` from now.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.deadline = Some(Instant::now() + timeout);
    }

    /// Removes the deadline; operations may block indefinitely.
    pub fn clear_timeout(&mut self) {
        self.deadline = None;
    }

    /// Whether any operation on this socket has hit the deadline.
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// Reads whatever is available into `buf`, up to the deadline.
    ///
    /// # Errors
    ///
    /// [`io::ErrorKind::TimedOut`] when the deadline fires first, or the
    /// transport's error.
    pub fn read_some(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let deadline = self.deadline;
        let transport = &mut self.transport;
        let result = async_io::block_on(future::or(
            async { transport.read(buf).await },
            expire(deadline),
        ));
        self.record_timeout(&result);
        result
    }

    /// Writes all of `buf`, up to the deadline.
    ///
    /// # Errors
    ///
    /// [`io::ErrorKind::TimedOut`] when the deadline fires first, or the
    /// transport's error.
    pub fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let deadline = self.deadline;
        let transport = &mut self.transport;
        let result = async_io::block_on(future::or(
            async { transport.write_all(buf).await },
            expire(deadline),
        ));
        self.record_timeout(&result);
        result
    }

    /// The remote endpoint, when the transport has one.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.transport.peer_addr().ok().flatten()
    }

    /// The local endpoint, when the transport has one.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.transport.local_addr().ok().flatten()
    }

    /// Shuts the transport down.
    pub fn shutdown(&self) {
        if let Err(e) = self.transport.shutdown() {
            log::debug!("error shutting down transport: {e}");
        }
    }

    fn record_timeout<T>(&mut self, result: &io::Result<T>) {
        if let Err(e) = result {
            if e.kind() == io::ErrorKind::TimedOut {
                self.timed_out = true;
            }
        }
    }
}

#[derive(Debug, Default)]
struct Buffer {
    offset: usize,
    data: Vec<u8>,
}

impl Buffer {
    fn len(&self) -> usize {
        self.data.len() - self.offset
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn as_slice(&self) -> &[u8] {
        &self.data[self.offset..]
    }

    fn extend(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    fn consume(&mut self, n: usize) {
        self.offset += n;
        if self.offset >= self.data.len() {
            self.data.clear();
            self.offset = 0;
        }
    }
}

/// Input streambuf state: buffered bytes plus the expected-input counter
/// that bounds how much more may be pulled from the socket.
#[derive(Debug, Default)]
struct InputBuffer {
    buffer: Buffer,
    expected_input: usize,
}

/// A socket paired with HTTP-aware stream buffers.
///
/// The input side tracks an *expected input* counter: when a reader
/// drains the buffered bytes, at most that many more bytes are pulled
/// from the socket. Priming the counter with a body's Content-Length
/// makes body reads stop exactly at the frame boundary instead of
/// blocking on a quiet socket.
///
/// The output side accumulates writes and flushes them to the socket in
/// a single write when the [`SendStream`] commits.
///
/// Connections are shared through [`Arc`]: requests and responses in
/// flight hold a handle to the connection that produced them.
pub struct Connection {
    socket: Mutex<TimeoutSocket>,
    input: Mutex<InputBuffer>,
    output: Mutex<Vec<u8>>,
    closed: AtomicBool,
}

impl Debug for Connection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("socket", &lock(&self.socket))
            .field("buffered_input", &lock(&self.input).buffer.len())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// A connection over `transport` with empty buffers.
    pub fn new(transport: impl Transport) -> Self {
        Self {
            socket: Mutex::new(TimeoutSocket::new(transport)),
            input: Mutex::new(InputBuffer::default()),
            output: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Sets the I/O deadline to `timeout` from now.
    pub fn set_timeout(&self, timeout: Duration) {
        lock(&self.socket).set_timeout(timeout);
    }

    /// Removes the I/O deadline.
    pub fn clear_timeout(&self) {
        lock(&self.socket).clear_timeout();
    }

    /// Whether the socket has hit its deadline.
    pub fn timed_out(&self) -> bool {
        lock(&self.socket).timed_out()
    }

    /// The peer's address, when known.
    pub fn remote_address(&self) -> Option<SocketAddr> {
        lock(&self.socket).peer_addr()
    }

    /// The local address, when known.
    pub fn local_address(&self) -> Option<SocketAddr> {
        lock(&self.socket).local_addr()
    }

    /// Closes the connection, unblocking in-flight operations.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            lock(&self.socket).shutdown();
        }
    }

    /// Whether [`close`][Connection::close] has not been called.
    pub fn connected(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    /// Allows up to `byte_count` total bytes to be pulled from the
    /// socket to satisfy upcoming reads, counting bytes already
    /// buffered.
    pub fn expect_input(&self, byte_count: usize) {
        let mut input = lock(&self.input);
        input.expected_input = byte_count.saturating_sub(input.buffer.len());
    }

    /// How many more bytes may be pulled from the socket.
    pub fn expected_input(&self) -> usize {
        lock(&self.input).expected_input
    }

    /// Bytes currently buffered on the input side.
    pub fn buffered_input(&self) -> usize {
        lock(&self.input).buffer.len()
    }

    /// Reads into `buf` from the input buffer, pulling at most the
    /// expected input from the socket when the buffer runs dry. `Ok(0)`
    /// means the framing is exhausted, not necessarily the socket.
    pub(crate) fn read_buffered(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut input = lock(&self.input);
        if input.buffer.is_empty() && input.expected_input > 0 {
            let mut chunk = vec![0; input.expected_input.min(MAX_PULL)];
            let read = lock(&self.socket).read_some(&mut chunk)?;
            input.buffer.extend(&chunk[..read]);
            input.expected_input = input.expected_input.saturating_sub(read);
        }

        let available = input.buffer.len().min(buf.len());
        buf[..available].copy_from_slice(&input.buffer.as_slice()[..available]);
        input.buffer.consume(available);
        Ok(available)
    }

    /// Ensures up to `byte_count` bytes are buffered, reading once from
    /// the socket if needed. Returns how many bytes are buffered.
    fn prime(&self, byte_count: usize) -> io::Result<usize> {
        let mut input = lock(&self.input);
        let buffered = input.buffer.len();
        if buffered >= byte_count {
            return Ok(buffered);
        }
        let mut chunk = vec![0; byte_count - buffered];
        let read = lock(&self.socket).read_some(&mut chunk)?;
        input.buffer.extend(&chunk[..read]);
        Ok(input.buffer.len())
    }

    /// Flushes the accumulated output buffer to the socket in one write.
    ///
    /// # Errors
    ///
    /// Any socket write error, including the deadline firing.
    pub fn commit_output(&self) -> io::Result<()> {
        let pending = std::mem::take(&mut *lock(&self.output));
        if pending.is_empty() {
            return Ok(());
        }
        lock(&self.socket).write_all(&pending)
    }

    /// A writable stream over the output buffer. Nothing reaches the
    /// socket until [`SendStream::send`] (or drop) commits it.
    pub fn send_stream(self: &Arc<Self>) -> SendStream {
        SendStream {
            connection: self.clone(),
            sent: false,
        }
    }

    /// A readable stream over the input buffer, primed with an initial
    /// read of up to 1 KiB. Check [`ReceiveStream::is_bad`] before
    /// parsing from it.
    pub fn receive_stream(self: &Arc<Self>) -> ReceiveStream {
        let bad = match self.prime(INITIAL_READ) {
            Ok(0) => true,
            Ok(_) => false,
            Err(e) => {
                log::debug!("error priming receive stream: {e}");
                true
            }
        };
        ReceiveStream {
            connection: self.clone(),
            bad,
        }
    }
}

impl Connection {
    /// Reads one request off the connection. A dead or timed-out
    /// connection yields a request whose suggested status says so.
    pub fn read_request(self: &Arc<Self>, parser: &crate::Http1Parser) -> crate::Request {
        let mut stream = self.receive_stream();
        parser.request(&mut stream)
    }

    /// Formats `response` onto the connection and flushes it in a
    /// single write.
    ///
    /// # Errors
    ///
    /// Any socket write error, including the deadline firing.
    pub fn send_response(
        self: &Arc<Self>,
        formatter: &crate::Http1Formatter,
        response: &mut crate::Response,
    ) -> io::Result<()> {
        let mut stream = self.send_stream();
        formatter.response(&mut stream, response)?;
        stream.send()
    }
}

/// Writable view over a connection's output buffer.
///
/// There should be only one send stream per connection at a time. Data
/// is committed to the socket by [`send`][SendStream::send]; a stream
/// dropped without sending commits what it can and logs any failure.
pub struct SendStream {
    connection: Arc<Connection>,
    sent: bool,
}

impl SendStream {
    /// Commits the accumulated bytes to the socket.
    ///
    /// # Errors
    ///
    /// Any socket write error, including the deadline firing.
    pub fn send(&mut self) -> io::Result<()> {
        self.sent = true;
        self.connection.commit_output()
    }

    /// The connection this stream writes to.
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }
}

impl Write for SendStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&self.connection.output).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for SendStream {
    fn drop(&mut self) {
        if !self.sent {
            if let Err(e) = self.connection.commit_output() {
                log::debug!("error sending buffered output on drop: {e}");
            }
        }
    }
}

/// Readable view over a connection's input buffer.
pub struct ReceiveStream {
    connection: Arc<Connection>,
    bad: bool,
}

impl ReceiveStream {
    /// Whether the initial read failed or returned nothing; a bad stream
    /// has no request or response to parse.
    pub fn is_bad(&self) -> bool {
        self.bad
    }

    /// Whether the underlying socket has hit its deadline.
    pub fn timed_out(&self) -> bool {
        self.connection.timed_out()
    }

    /// The connection this stream reads from.
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }
}

impl Read for ReceiveStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.connection.read_buffered(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_input_bounds_socket_reads() {
        let (connection, _) = Connection::synthetic(&b"0123456789"[..]);
        let mut buf = [0u8; 10];

        // nothing expected, nothing buffered: framing says EOF
        assert_eq!(connection.read_buffered(&mut buf).unwrap(), 0);

        connection.expect_input(4);
        assert_eq!(connection.read_buffered(&mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], b"0123");
        assert_eq!(connection.read_buffered(&mut buf).unwrap(), 0);
    }

    #[test]
    fn expected_input_counts_buffered_bytes() {
        let (connection, _) = Connection::synthetic(&b"0123456789"[..]);
        connection.prime(4).unwrap();
        connection.expect_input(6);
        assert_eq!(connection.expected_input(), 2);
    }

    #[test]
    fn send_stream_accumulates_until_sent() {
        let (connection, output) = Connection::synthetic(Vec::new());
        let mut stream = connection.send_stream();
        stream.write_all(b"hello ").unwrap();
        stream.write_all(b"world").unwrap();
        assert!(output.bytes().is_empty());
        stream.send().unwrap();
        assert_eq!(output.bytes(), b"hello world");
    }

    #[test]
    fn receive_stream_primes_and_reads() {
        let (connection, _) = Connection::synthetic(&b"abc"[..]);
        let mut stream = connection.receive_stream();
        assert!(!stream.is_bad());
        let mut buf = [0u8; 8];
        let n = stream.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"abc");
    }

    #[test]
    fn receive_stream_on_empty_input_is_bad() {
        let (connection, _) = Connection::synthetic(Vec::new());
        assert!(connection.receive_stream().is_bad());
    }
}
