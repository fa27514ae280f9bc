//! # Kitty War
//!
//! Server for Kitty War, a two-player card game about cats.
//!
//! Clients connect over plain TCP or WebSocket on the same port, log in
//! with a token issued by the account website, ask for a match, and then
//! play it out phase by phase. The server is the sole authority on match
//! state; clients only ever send requests and receive notifications.
//!
//! ## Layers
//!
//! ```text
//! kittywar (this crate)   ← builder, accept loop, per-connection dispatch
//!     ↕
//! kittywar-match          ← matchmaker and the match state machine
//!     ↕
//! kittywar-session        ← login, profiles, card catalog
//!     ↕
//! kittywar-protocol       ← flags, tokens, raw and WebSocket framing
//!     ↕
//! kittywar-transport      ← TCP listener, transport detection, writer task
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kittywar::prelude::*;
//!
//! # async fn run() -> Result<(), KittyWarError> {
//! let server = KittyWarServerBuilder::new()
//!     .bind("0.0.0.0:2056")
//!     .build(MemoryProfileStore::new())
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::KittyWarError;
pub use server::{
    DEFAULT_BIND_ADDR, DEFAULT_SHUTDOWN_TIMEOUT, KittyWarServer, KittyWarServerBuilder, ServerConfig,
};

/// Convenience re-exports for embedding the server.
pub mod prelude {
    pub use crate::{
        DEFAULT_BIND_ADDR, DEFAULT_SHUTDOWN_TIMEOUT, KittyWarError, KittyWarServer,
        KittyWarServerBuilder, ServerConfig,
    };
    pub use kittywar_protocol::{Flag, Response, ResultCode};
    pub use kittywar_session::{
        Account, CardCatalog, MemoryProfileStore, Profile, ProfileStore, SessionError, UserId,
    };
}
