//! Transport layer for Kitty War.
//!
//! One TCP listener serves two kinds of clients. The first byte a client
//! sends decides which: an HTTP `GET` means a WebSocket upgrade, anything
//! else is the raw binary protocol.
//!
//! Accepting is split in two so the accept loop never waits on a slow
//! client: [`TcpTransport::accept`] only takes the socket, and
//! [`PendingConnection::establish`] (run on the connection's own task)
//! does detection and the handshake under a timeout.

mod connection;
mod error;
pub mod handshake;

pub use connection::{Connection, ResponseSender};
pub use error::TransportError;

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use kittywar_protocol::WireFormat;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Default bound on transport detection plus the WebSocket handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }

    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Listens for incoming game clients.
pub struct TcpTransport {
    listener: TcpListener,
    handshake_timeout: Duration,
}

impl TcpTransport {
    /// Binds a new transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self {
            listener,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        })
    }

    /// Sets how long a client may take to be detected and upgraded.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Returns the address actually bound (useful after binding port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener
            .local_addr()
            .map_err(TransportError::AcceptFailed)
    }

    /// Waits for and accepts the next incoming socket.
    pub async fn accept(&self) -> Result<PendingConnection, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        let id = ConnectionId::next();
        tracing::debug!(%id, %peer, "accepted TCP connection");
        Ok(PendingConnection {
            id,
            peer,
            stream,
            handshake_timeout: self.handshake_timeout,
        })
    }
}

/// A socket that has been accepted but not yet classified.
pub struct PendingConnection {
    id: ConnectionId,
    peer: SocketAddr,
    stream: TcpStream,
    handshake_timeout: Duration,
}

impl PendingConnection {
    /// Returns the identifier the connection will keep once established.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the client's address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Detects the wire format and, for WebSocket clients, performs the
    /// upgrade handshake.
    pub async fn establish(self) -> Result<Connection, TransportError> {
        let limit = self.handshake_timeout;
        tokio::time::timeout(limit, self.establish_inner())
            .await
            .map_err(|_| TransportError::HandshakeTimeout(limit))?
    }

    async fn establish_inner(self) -> Result<Connection, TransportError> {
        let Self { id, peer, stream, .. } = self;

        let mut first = [0u8; 1];
        let n = stream
            .peek(&mut first)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if n == 0 {
            return Err(TransportError::ConnectionClosed(format!(
                "{id} closed before sending anything"
            )));
        }

        let wire = WireFormat::detect(first[0]);
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        if wire == WireFormat::WebSocket {
            handshake::accept(&mut reader, &mut write_half).await?;
        }

        tracing::debug!(%id, %peer, %wire, "connection established");
        Ok(Connection::start(id, peer, wire, reader, write_half))
    }
}
