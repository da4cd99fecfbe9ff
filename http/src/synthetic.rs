use crate::{Connection, Transport};
use futures_lite::{AsyncRead, AsyncWrite};
use std::{
    io,
    pin::Pin,
    sync::{Arc, Mutex, PoisonError},
    task::{Context, Poll},
};

/// An in-memory [`Transport`]: reads serve a canned input, writes are
/// captured for inspection.
///
/// This is what makes the wire grammar testable without sockets — a
/// [`Connection`] over a `Synthetic` behaves exactly like one over TCP,
/// minus the deadline ever firing.
#[derive(Debug)]
pub struct Synthetic {
    input: Vec<u8>,
    position: usize,
    output: Arc<Mutex<Vec<u8>>>,
}

/// Handle to the bytes written through a [`Synthetic`] transport.
#[derive(Debug, Clone)]
pub struct SyntheticOutput(Arc<Mutex<Vec<u8>>>);

impl SyntheticOutput {
    /// The bytes written so far.
    pub fn bytes(&self) -> Vec<u8> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The bytes written so far, as lossy UTF-8.
    pub fn string(&self) -> String {
        String::from_utf8_lossy(&self.bytes()).into_owned()
    }
}

impl Synthetic {
    /// A transport that will serve `input` and capture writes into the
    /// returned [`SyntheticOutput`].
    pub fn new(input: impl Into<Vec<u8>>) -> (Self, SyntheticOutput) {
        let output = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                input: input.into(),
                position: 0,
                output: output.clone(),
            },
            SyntheticOutput(output),
        )
    }
}

impl AsyncRead for Synthetic {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let remaining = &this.input[this.position..];
        let len = remaining.len().min(buf.len());
        buf[..len].copy_from_slice(&remaining[..len]);
        this.position += len;
        Poll::Ready(Ok(len))
    }
}

impl AsyncWrite for Synthetic {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl Transport for Synthetic {}

impl Connection {
    /// A connection over an in-memory transport serving `input`, plus the
    /// handle to whatever gets written back. See [`Synthetic`].
    pub fn synthetic(input: impl Into<Vec<u8>>) -> (Arc<Connection>, SyntheticOutput) {
        let (transport, output) = Synthetic::new(input);
        (Arc::new(Connection::new(transport)), output)
    }
}
