//! Error types for the session layer.

/// Errors that can occur while authenticating a player or talking to the
/// profile store.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The backing store could not answer. The client gets a `FAILURE`
    /// for that one request; the connection stays open.
    #[error("profile store error: {0}")]
    Store(String),

    /// No account exists for the username. Accounts are created outside
    /// the game server, so this client is not who it claims to be.
    #[error("no account for username {0:?}")]
    UnknownUser(String),

    /// The token sent with the login does not match the stored one (or
    /// the stored one was already cleared by a logout).
    #[error("token mismatch for {0:?}")]
    TokenMismatch(String),

    /// The operation needs a logged-in session.
    #[error("session is not authenticated")]
    NotAuthenticated,

    /// Catalog or profile JSON could not be parsed or produced.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}
