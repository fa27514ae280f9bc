//! Unified error type for the Kitty War server.

use kittywar_match::MatchError;
use kittywar_protocol::ProtocolError;
use kittywar_session::SessionError;
use kittywar_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum KittyWarError {
    /// A transport-level error (bind, accept, handshake, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (oversized frame, truncated payload).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (store, login, catalog or profile JSON).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The matchmaker is gone.
    #[error(transparent)]
    Match(#[from] MatchError),

    /// Reading a catalog or profile file at startup.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
