//! Wire protocol for Kitty War.
//!
//! This crate defines the "language" that game clients and the server
//! speak:
//!
//! - **Flags** ([`Flag`], [`ResultCode`]) — the closed table of one-byte
//!   message kinds and the result codes carried in response bodies.
//! - **Messages** ([`Message`], [`Response`], [`Body`], [`Token`]) — what
//!   travels on the wire, independent of framing.
//! - **Codecs** ([`raw`], [`websocket`], [`WireFormat`]) — how those
//!   messages become bytes for plain TCP and for WebSocket clients.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding/decoding. Every one of them ends the connection.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (sockets) and session
//! (player identity). It doesn't know about connections or matches. It
//! only turns bytes into messages and responses into bytes.
//!
//! ```text
//! Transport (bytes) → Protocol (Message / Response) → Session (player)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
mod flag;
mod message;
pub mod raw;
pub mod websocket;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::WireFormat;
pub use error::ProtocolError;
pub use flag::{Flag, ResultCode};
pub use message::{Body, Message, Response, TOKEN_LEN, Token};

/// Largest client message (after joining WebSocket fragments) the server
/// will buffer.
pub const MAX_MESSAGE_LEN: u64 = 16 * 1024 * 1024;
