//! Error types for the protocol layer.
//!
//! Each crate in Kitty War defines its own error enum. A `ProtocolError`
//! always means the bytes on the wire could not be turned into a
//! [`Message`](crate::Message) (or a [`Response`](crate::Response) could not
//! be turned into bytes). The session treats every one of them as fatal to
//! the connection.

/// Errors that can occur while encoding or decoding wire frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Reading from the underlying stream failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A WebSocket message (or raw body) announced more bytes than we
    /// are willing to buffer.
    #[error("frame of {0} bytes exceeds the {limit} byte limit", limit = crate::MAX_MESSAGE_LEN)]
    FrameTooLarge(u64),

    /// A fragmented WebSocket message ended up shorter than a flag + token.
    #[error("payload of {0} bytes is too short to hold a flag and token")]
    Truncated(usize),

    /// The 24-byte token field contained non-ASCII bytes.
    #[error("token is not ASCII")]
    InvalidToken,

    /// A response body does not fit the 3-byte length field.
    #[error("response body of {0} bytes does not fit a 3-byte length")]
    BodyTooLarge(usize),
}
