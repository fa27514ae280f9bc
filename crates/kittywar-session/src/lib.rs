//! Player sessions for Kitty War.
//!
//! This crate handles who is on the other end of a connection:
//!
//! 1. **Authentication** — checking a login token against the account
//!    database through the [`ProfileStore`] trait
//! 2. **Session state** — the per-connection [`Session`] (anonymous →
//!    authenticated, cached [`Profile`])
//! 3. **Card catalog** — the read-only [`CardCatalog`] served to clients
//!
//! # How it fits in the stack
//!
//! ```text
//! Match Layer (above)  ← pairs authenticated players and runs the game
//!     ↕
//! Session Layer (this crate)  ← knows who each connection belongs to
//!     ↕
//! Protocol Layer (below)  ← provides Token and the flag table
//! ```

#![allow(async_fn_in_trait)]

mod catalog;
mod error;
mod session;
mod store;

pub use catalog::{AbilityCard, CardCatalog, CatCard, CatalogSection, ChanceCard, MoveCard};
pub use error::SessionError;
pub use session::{ANONYMOUS, Session};
pub use store::{Account, MemoryProfileStore, Profile, ProfileStore, UserId};
