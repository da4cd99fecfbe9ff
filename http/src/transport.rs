use futures_lite::{AsyncRead, AsyncWrite};
use std::{io::Result, net::SocketAddr, net::Shutdown};

/// The byte stream an HTTP connection runs over.
///
/// The trait extends the async read/write pair with the small capability
/// set the rest of the crate needs: endpoint addresses and an immediate
/// shutdown. A TLS adapter implements this for its encrypted stream and
/// hands it to [`Connection::new`][crate::Connection::new]; nothing above
/// the connection ever learns which variant it is talking to.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin + 'static {
    /// The address of the remote peer, when the transport has one.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport supports peer addresses but
    /// retrieving one fails.
    fn peer_addr(&self) -> Result<Option<SocketAddr>> {
        Ok(None)
    }

    /// The local address of this transport, when it has one.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport supports local addresses but
    /// retrieving one fails.
    fn local_addr(&self) -> Result<Option<SocketAddr>> {
        Ok(None)
    }

    /// Tears the transport down immediately, unblocking any in-flight
    /// operation on it.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be shut down.
    fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

impl Transport for async_net::TcpStream {
    fn peer_addr(&self) -> Result<Option<SocketAddr>> {
        async_net::TcpStream::peer_addr(self).map(Some)
    }

    fn local_addr(&self) -> Result<Option<SocketAddr>> {
        async_net::TcpStream::local_addr(self).map(Some)
    }

    fn shutdown(&self) -> Result<()> {
        async_net::TcpStream::shutdown(self, Shutdown::Both)
    }
}
