use sorrel_http::Connection;
use std::{
    fmt::{self, Display, Formatter},
    io,
    net::{IpAddr, SocketAddr, TcpListener as StdTcpListener, ToSocketAddrs},
    sync::Arc,
    time::Duration,
};
use stopper::Stopper;

/// The IP family a server binds with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    /// IPv4
    V4,
    /// IPv6
    V6,
}

/// An address a server listens on: a family, a host, and a port.
///
/// An empty host binds all interfaces of the family; port 0 asks the
/// system for an ephemeral port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenAddress {
    /// which IP family to bind
    pub family: AddressFamily,
    /// host name or address to bind, or empty for all interfaces
    pub host: String,
    /// port to bind
    pub port: u16,
}

impl ListenAddress {
    /// An address with an explicit family and host.
    pub fn new(family: AddressFamily, host: impl Into<String>, port: u16) -> Self {
        Self {
            family,
            host: host.into(),
            port,
        }
    }

    /// All IPv4 interfaces on `port`.
    pub fn v4(port: u16) -> Self {
        Self::new(AddressFamily::V4, "", port)
    }

    /// All IPv6 interfaces on `port`.
    pub fn v6(port: u16) -> Self {
        Self::new(AddressFamily::V6, "", port)
    }

    /// Resolves to the socket address the listener should bind.
    fn resolve(&self) -> io::Result<SocketAddr> {
        if self.host.is_empty() {
            let ip: IpAddr = match self.family {
                AddressFamily::V4 => std::net::Ipv4Addr::UNSPECIFIED.into(),
                AddressFamily::V6 => std::net::Ipv6Addr::UNSPECIFIED.into(),
            };
            return Ok(SocketAddr::new(ip, self.port));
        }

        let wanted_v4 = self.family == AddressFamily::V4;
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .find(|candidate| candidate.is_ipv4() == wanted_v4)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    format!("no address of the requested family for {}", self.host),
                )
            })
    }
}

impl From<u16> for ListenAddress {
    fn from(port: u16) -> Self {
        Self::v6(port)
    }
}

impl Display for ListenAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.host.is_empty() {
            write!(f, "*:{}", self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

fn bind(address: &ListenAddress) -> io::Result<StdTcpListener> {
    use socket2::{Domain, Protocol, Socket, Type};

    let domain = match address.family {
        AddressFamily::V4 => Domain::IPV4,
        AddressFamily::V6 => Domain::IPV6,
    };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&address.resolve()?.into())?;
    socket.listen(128)?;
    Ok(socket.into())
}

/// Low-level accept loop: binds a port and hands each arriving
/// connection to a callback.
///
/// The loop owns a [`Stopper`]; stopping it closes the acceptor and
/// makes [`run`][ListenServer::run] return. Each accepted connection
/// lives exactly as long as its callback invocation: the loop holds the
/// only registered handle, so a connection can never be dispatched
/// twice, and it is closed when the callback returns.
#[derive(Debug, Default)]
pub struct ListenServer {
    listener: Option<async_net::TcpListener>,
    stopper: Stopper,
    timeout: Option<Duration>,
}

impl ListenServer {
    /// A listen server with nothing bound yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the listening socket (with reuse-address) without
    /// accepting yet.
    ///
    /// # Errors
    ///
    /// Resolution or bind failure.
    pub fn start(&mut self, address: &ListenAddress) -> io::Result<()> {
        let listener = bind(address)?;
        listener.set_nonblocking(true)?;
        self.listener = Some(async_net::TcpListener::try_from(listener)?);
        if self.stopper.is_stopped() {
            self.stopper = Stopper::new();
        }
        Ok(())
    }

    /// Stops the accept loop; a blocked [`run`][ListenServer::run]
    /// returns.
    pub fn stop(&self) {
        self.stopper.stop();
    }

    /// A handle that stops this server when stopped.
    pub fn stopper(&self) -> Stopper {
        self.stopper.clone()
    }

    /// The bound address, once [`start`][ListenServer::start] succeeded.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener
            .as_ref()
            .and_then(|listener| listener.local_addr().ok())
    }

    /// Sets the I/O deadline applied to each accepted connection.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    /// Removes the per-connection deadline.
    pub fn clear_timeout(&mut self) {
        self.timeout = None;
    }

    /// The per-connection deadline.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Accepts connections until stopped, dispatching each to
    /// `on_success` (or `on_failure` for accept errors).
    /// `create_connection` wraps the accepted stream, letting callers
    /// inject e.g. a TLS-capable connection.
    pub fn run<S, F, CC>(&mut self, mut on_success: S, mut on_failure: F, create_connection: CC)
    where
        S: FnMut(&Arc<Connection>),
        F: FnMut(io::Error),
        CC: Fn(async_net::TcpStream) -> Connection,
    {
        let Some(listener) = self.listener.clone() else {
            log::error!("run() called before start()");
            return;
        };
        let stopper = self.stopper.clone();

        loop {
            match async_io::block_on(stopper.stop_future(listener.accept())) {
                None => break,
                Some(Ok((stream, peer))) => {
                    log::debug!("accepted connection from {peer}");
                    let connection = Arc::new(create_connection(stream));
                    if let Some(timeout) = self.timeout {
                        connection.set_timeout(timeout);
                    }
                    on_success(&connection);
                    connection.close();
                }
                Some(Err(error)) => on_failure(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_an_ephemeral_port() {
        let mut server = ListenServer::new();
        server
            .start(&ListenAddress::new(AddressFamily::V4, "127.0.0.1", 0))
            .unwrap();
        let addr = server.local_addr().unwrap();
        assert!(addr.port() > 0);
        assert!(addr.is_ipv4());
    }

    #[test]
    fn empty_host_binds_all_interfaces() {
        let mut server = ListenServer::new();
        server.start(&ListenAddress::v4(0)).unwrap();
        assert!(server.local_addr().unwrap().ip().is_unspecified());
    }

    #[test]
    fn stopping_makes_run_return() {
        let mut server = ListenServer::new();
        server
            .start(&ListenAddress::new(AddressFamily::V4, "127.0.0.1", 0))
            .unwrap();
        let stopper = server.stopper();

        let handle = std::thread::spawn(move || {
            server.run(|_| {}, |_| {}, Connection::new);
        });

        stopper.stop();
        handle.join().unwrap();
    }
}
