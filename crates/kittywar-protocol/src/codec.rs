//! Dispatch between the two wire formats.
//!
//! A connection picks its [`WireFormat`] once, right after accept, and
//! keeps it for its whole life. Everything above the transport only deals
//! in [`Message`] and [`Response`].

use std::fmt;

use tokio::io::AsyncRead;

use crate::{Message, ProtocolError, Response, raw, websocket};

/// How a connection frames its messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireFormat {
    /// Fixed 28-byte request header over plain TCP.
    Raw,
    /// RFC 6455 frames after an HTTP upgrade.
    WebSocket,
}

impl WireFormat {
    /// Picks the format from the first byte a client sent.
    ///
    /// An HTTP upgrade starts with `GET`. No valid flag equals `b'G'`, so
    /// one byte is enough to tell them apart.
    pub fn detect(first_byte: u8) -> Self {
        if first_byte == b'G' {
            Self::WebSocket
        } else {
            Self::Raw
        }
    }

    /// Encodes a response for this format.
    pub fn encode(self, response: &Response) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Self::Raw => raw::encode_response(response),
            Self::WebSocket => Ok(websocket::encode_response(response)),
        }
    }

    /// Decodes the next request. `Ok(None)` means treat as disconnect.
    pub async fn read_message<R>(self, reader: &mut R) -> Result<Option<Message>, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        match self {
            Self::Raw => raw::read_message(reader).await,
            Self::WebSocket => websocket::read_message(reader).await,
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => f.write_str("raw"),
            Self::WebSocket => f.write_str("websocket"),
        }
    }
}
