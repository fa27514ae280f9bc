//! An established client connection: a framed reader plus a writer task.

use std::net::SocketAddr;

use kittywar_protocol::{Message, Response, WireFormat};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::{ConnectionId, TransportError};

/// Sending half of a connection's outbox.
///
/// Cloned into whatever needs to talk to the client (the session, the
/// player inside a match). Sending never blocks; the writer task does the
/// socket I/O.
pub type ResponseSender = mpsc::UnboundedSender<Response>;

/// A client connection after transport detection (and the upgrade
/// handshake, for WebSocket clients).
///
/// Reading happens on the owner's task through [`recv`](Self::recv).
/// Writing happens on a dedicated task fed by an unbounded channel, so
/// responses queued from inside a match never wait on the socket.
pub struct Connection {
    id: ConnectionId,
    peer: SocketAddr,
    wire: WireFormat,
    reader: BufReader<OwnedReadHalf>,
    outbox: ResponseSender,
    writer: Option<JoinHandle<()>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Connection {
    /// Wraps the two halves of an established stream and starts the
    /// writer task.
    pub(crate) fn start(
        id: ConnectionId,
        peer: SocketAddr,
        wire: WireFormat,
        reader: BufReader<OwnedReadHalf>,
        write_half: OwnedWriteHalf,
    ) -> Self {
        let (outbox, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let writer = tokio::spawn(write_loop(id, wire, write_half, rx, shutdown_rx));

        Self {
            id,
            peer,
            wire,
            reader,
            outbox,
            writer: Some(writer),
            shutdown: Some(shutdown_tx),
        }
    }

    /// Returns the unique identifier for this connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the client's address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Returns the framing this connection speaks.
    pub fn wire_format(&self) -> WireFormat {
        self.wire
    }

    /// Receives the next message from the client.
    ///
    /// Returns `Ok(None)` when the client went away: EOF, a close frame,
    /// or a WebSocket frame too short to be a message.
    pub async fn recv(&mut self) -> Result<Option<Message>, TransportError> {
        Ok(self.wire.read_message(&mut self.reader).await?)
    }

    /// Returns a handle that queues responses to this client.
    pub fn sender(&self) -> ResponseSender {
        self.outbox.clone()
    }

    /// Queues one response.
    pub fn send(&self, response: Response) -> Result<(), TransportError> {
        self.outbox
            .send(response)
            .map_err(|_| TransportError::ConnectionClosed(format!("{} writer stopped", self.id)))
    }

    /// Resolves once the client closes its side of the stream.
    ///
    /// Used while the session is parked waiting for an opponent. If the
    /// client sends data instead, this never resolves and the data stays
    /// buffered for the next [`recv`](Self::recv). Cancel-safe.
    pub async fn wait_closed(&mut self) -> Result<(), TransportError> {
        let buf = self
            .reader
            .fill_buf()
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if buf.is_empty() {
            return Ok(());
        }
        std::future::pending().await
    }

    /// Flushes every queued response, then shuts the socket down.
    pub async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.await {
                tracing::warn!(id = %self.id, error = %e, "writer task failed");
            }
        }
        tracing::debug!(id = %self.id, "connection closed");
    }
}

/// Drains the outbox onto the socket until told to stop.
///
/// On shutdown (explicit, or because the [`Connection`] was dropped) the
/// responses already queued are still written before the write half is
/// shut down.
async fn write_loop(
    id: ConnectionId,
    wire: WireFormat,
    mut half: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<Response>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            next = rx.recv() => match next {
                Some(response) => {
                    if !write_one(id, wire, &mut half, &response).await {
                        return;
                    }
                }
                None => break,
            },
            _ = &mut shutdown => {
                while let Ok(response) = rx.try_recv() {
                    if !write_one(id, wire, &mut half, &response).await {
                        return;
                    }
                }
                break;
            }
        }
    }
    let _ = half.shutdown().await;
}

/// Encodes and writes one response. Returns `false` if the socket is gone.
async fn write_one(
    id: ConnectionId,
    wire: WireFormat,
    half: &mut OwnedWriteHalf,
    response: &Response,
) -> bool {
    let bytes = match wire.encode(response) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(%id, flag = %response.flag, error = %e, "dropping unencodable response");
            return true;
        }
    };
    match half.write_all(&bytes).await {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(%id, error = %e, "write failed, stopping writer");
            false
        }
    }
}
