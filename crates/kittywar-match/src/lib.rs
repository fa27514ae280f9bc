//! Match engine and matchmaking for Kitty War.
//!
//! A match is a two-player, turn-based card game. Both players act in
//! the same phase and the match only moves on when both have sent
//! `READY`:
//!
//! 1. **Setup**: each player picks a cat; the match then hands out a
//!    random bonus ability and two chance cards
//! 2. **Prelude**: round state resets, cooldowns tick, prelude abilities
//! 3. **Enact strategies**: pick a move (PURR, GUARD, SCRATCH, SKIP) and
//!    optionally a chance card matching it
//! 4. **Show cards**: each side sees the other's picks
//! 5. **Settle strategies**: chance cards and [`handle_combat`] run, health
//!    is reported, and the win condition is checked
//! 6. **Postlude**: postlude abilities, then back to prelude
//!
//! # Key types
//!
//! - [`Match`]: the state machine, shared by both sessions as a
//!   [`SharedMatch`]
//! - [`Player`] and [`Seat`]: per-player state and which side it is on
//! - [`MatchmakerHandle`]: queue a player and wait for an [`Assignment`]
//! - [`Cat`], [`Move`], [`Ability`], [`Chance`]: the closed catalog
//!
//! # How it fits in the stack
//!
//! ```text
//! Server (above)  ← routes in-match flags to Match::handle
//!     ↕
//! Match Layer (this crate)
//!     ↕
//! Protocol Layer (below)  ← provides Flag and Response
//! ```

mod ability;
mod catalog;
mod chance;
mod combat;
mod error;
mod game;
mod matchmaker;
mod phase;
mod player;

pub use catalog::{Ability, Cat, Chance, Move, Timing};
pub use combat::handle_combat;
pub use error::{ActionError, MatchError};
pub use game::{Match, MatchId, Outcome, STARTING_CHANCES, SharedMatch, WINNING_HEALTH};
pub use matchmaker::{Assignment, MatchmakerHandle, spawn_matchmaker};
pub use phase::Phase;
pub use player::{Player, PlayerSender, Seat};
