use crate::{Error, Result};
use sorrel_http::{Connection, Uri};
use std::sync::Arc;

/// How a client reaches a server: connection creation plus the
/// post-connect hook.
///
/// The default [`TcpConnector`] yields plain TCP connections. A TLS
/// adapter implements this trait to return a connection over its own
/// [`Transport`][sorrel_http::Transport] and to run its handshake in
/// [`on_connect`][Connector::on_connect]; everything above the connector
/// is oblivious to the difference.
#[allow(async_fn_in_trait)]
pub trait Connector: Send + Sync + 'static {
    /// Resolves `target`'s authority and opens a connection to it.
    ///
    /// # Errors
    ///
    /// Resolution or connection failure.
    async fn connect(&self, target: &Uri) -> Result<Connection>;

    /// Invoked once the connection is established, before any request is
    /// written. TLS adapters perform their handshake here.
    ///
    /// # Errors
    ///
    /// Any handshake or setup failure; the query is abandoned.
    fn on_connect(&self, _target: &Uri, _connection: &Arc<Connection>) -> Result<()> {
        Ok(())
    }
}

/// The plain TCP connector.
///
/// The port defaults from the scheme when the URI names none: 80 for
/// `http` (or no scheme), 443 for `https`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl TcpConnector {
    fn port_for(target: &Uri) -> Result<u16> {
        if let Some(port) = target.authority.port {
            return Ok(port);
        }
        match target.scheme.as_str() {
            "" | "http" => Ok(80),
            "https" => Ok(443),
            _ => Err(Error::UnsupportedUrl),
        }
    }
}

impl Connector for TcpConnector {
    async fn connect(&self, target: &Uri) -> Result<Connection> {
        let host = target.authority.host.as_str();
        let port = Self::port_for(target)?;
        log::debug!("connecting to {host}:{port}");
        let stream = async_net::TcpStream::connect((host, port)).await?;
        Ok(Connection::new(stream))
    }
}
