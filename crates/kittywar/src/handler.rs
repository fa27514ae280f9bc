//! Per-connection session dispatcher.
//!
//! Each established connection gets its own Tokio task running this
//! handler. The flow is:
//!   1. Receive a message → look up its flag (unknown flag closes)
//!   2. Session flags (login, logout, profile, catalog, find match) are
//!      answered here
//!   3. Everything else goes to the attached match, under its lock
//!   4. On exit (client gone, protocol error, or server shutdown): forfeit
//!      any running match, clear the login token, flush and close the socket

use std::sync::Arc;

use kittywar_match::{Assignment, MatchError};
use kittywar_protocol::{Flag, Message, Response, ResultCode};
use kittywar_session::{CatalogSection, ProfileStore, Session, SessionError};
use kittywar_transport::Connection;
use tokio::sync::watch;

use crate::KittyWarError;
use crate::server::{ServerState, stopped};

/// Whether the session keeps serving after a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Continue,
    Close,
}

/// Serves one connection from establishment to close.
pub(crate) async fn handle_connection<S: ProfileStore>(
    conn: Connection,
    state: Arc<ServerState<S>>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), KittyWarError> {
    let id = conn.id();
    tracing::debug!(%id, peer = %conn.peer_addr(), wire = %conn.wire_format(), "session started");

    let mut dispatcher = Dispatcher {
        conn,
        state,
        session: Session::new(),
        current: None,
        shutdown,
    };
    let result = dispatcher.serve().await;
    dispatcher.terminate().await;
    result
}

struct Dispatcher<S: ProfileStore> {
    conn: Connection,
    state: Arc<ServerState<S>>,
    session: Session,
    /// The match this session is playing in, if any.
    current: Option<Assignment>,
    shutdown: watch::Receiver<bool>,
}

impl<S: ProfileStore> Dispatcher<S> {
    async fn serve(&mut self) -> Result<(), KittyWarError> {
        loop {
            let received = tokio::select! {
                received = self.conn.recv() => received,
                () = stopped(&mut self.shutdown) => {
                    tracing::info!(username = self.session.username(), "server shutting down");
                    return Ok(());
                }
            };
            let msg = match received {
                Ok(Some(msg)) => msg,
                Ok(None) => {
                    tracing::info!(username = self.session.username(), "client disconnected");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        username = self.session.username(),
                        error = %e,
                        "undecodable message, closing connection"
                    );
                    return Err(e.into());
                }
            };

            if self.dispatch(msg).await? == Control::Close {
                return Ok(());
            }
        }
    }

    async fn dispatch(&mut self, msg: Message) -> Result<Control, KittyWarError> {
        let Ok(flag) = Flag::try_from(msg.flag) else {
            tracing::warn!(
                username = self.session.username(),
                flag = msg.flag,
                "unsupported flag, closing connection"
            );
            return Ok(Control::Close);
        };
        tracing::debug!(username = self.session.username(), %flag, "request");

        match flag {
            Flag::Login => self.login(&msg).await,
            Flag::Logout => {
                self.logout().await;
                Ok(Control::Close)
            }
            Flag::FindMatch => self.find_match().await,
            Flag::UserProfile => self.user_profile().await,
            Flag::AllCards => self.send_catalog(flag, CatalogSection::All),
            Flag::CatCards => self.send_catalog(flag, CatalogSection::Cats),
            Flag::BasicCards => self.send_catalog(flag, CatalogSection::Moves),
            Flag::ChanceCards => self.send_catalog(flag, CatalogSection::Chances),
            Flag::AbilityCards => self.send_catalog(flag, CatalogSection::Abilities),
            _ => {
                self.forward(flag, &msg).await;
                Ok(Control::Continue)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Session requests
    // -----------------------------------------------------------------------

    async fn login(&mut self, msg: &Message) -> Result<Control, KittyWarError> {
        let Some(username) = msg.body_str() else {
            tracing::warn!("login without a username, closing connection");
            return Ok(Control::Close);
        };

        match self.session.login(&self.state.store, username, &msg.token).await {
            Ok(()) => {
                self.reply(Flag::Login, ResultCode::Success)?;
                Ok(Control::Continue)
            }
            Err(e @ SessionError::Store(_)) => {
                tracing::warn!(username, error = %e, "login lookup failed");
                self.reply(Flag::Login, ResultCode::Failure)?;
                Ok(Control::Continue)
            }
            Err(e) => {
                tracing::info!(username, error = %e, "login rejected, closing connection");
                self.reply(Flag::Login, ResultCode::Failure)?;
                Ok(Control::Close)
            }
        }
    }

    async fn logout(&mut self) {
        if let Err(e) = self.session.logout(&self.state.store).await {
            tracing::warn!(username = self.session.username(), error = %e, "could not clear token");
        }
    }

    async fn user_profile(&mut self) -> Result<Control, KittyWarError> {
        let profile = self
            .session
            .load_profile(&self.state.store)
            .await
            .and_then(|profile| profile.to_json());
        match profile {
            Ok(json) => self.conn.send(Response::text(Flag::UserProfile, json))?,
            Err(e) => {
                tracing::debug!(username = self.session.username(), error = %e, "profile unavailable");
                self.reply(Flag::UserProfile, ResultCode::Failure)?;
            }
        }
        Ok(Control::Continue)
    }

    fn send_catalog(&self, flag: Flag, section: CatalogSection) -> Result<Control, KittyWarError> {
        match self.state.catalog.section_json(section) {
            Ok(json) => self.conn.send(Response::text(flag, json))?,
            Err(e) => {
                tracing::error!(error = %e, ?section, "catalog could not be serialized");
                self.reply(flag, ResultCode::Failure)?;
            }
        }
        Ok(Control::Continue)
    }

    /// Queues for a match and parks until paired or disconnected.
    async fn find_match(&mut self) -> Result<Control, KittyWarError> {
        if !self.session.is_authenticated() || self.in_match().await {
            self.reply(Flag::FindMatch, ResultCode::Failure)?;
            return Ok(Control::Continue);
        }

        let cats = match self.session.ensure_profile(&self.state.store).await {
            Ok(profile) => profile.cats.clone(),
            Err(e) => {
                tracing::warn!(username = self.session.username(), error = %e, "profile load failed");
                self.reply(Flag::FindMatch, ResultCode::Failure)?;
                return Ok(Control::Continue);
            }
        };

        let username = self.session.username().to_owned();
        let mut waiting = self
            .state
            .matchmaker
            .enqueue(username.as_str(), cats, self.conn.sender())
            .await?;
        tracing::info!(%username, "finding a match");

        let assigned = tokio::select! {
            assigned = &mut waiting => Some(assigned),
            closed = self.conn.wait_closed() => {
                if let Err(e) = closed {
                    tracing::debug!(%username, error = %e, "read failed while queued");
                }
                tracing::info!(%username, "disconnected while queued");
                None
            }
            () = stopped(&mut self.shutdown) => {
                tracing::info!(%username, "server shutting down while queued");
                None
            }
        };

        let Some(assigned) = assigned else {
            // Paired in the same instant: the opponent still needs to hear
            // that this side is gone.
            waiting.close();
            if let Ok(late) = waiting.try_recv() {
                late.game.lock().await.disconnect(late.seat);
            }
            return Ok(Control::Close);
        };
        let assignment = assigned.map_err(|_| MatchError::MatchmakerClosed)?;

        // Queued before the match lock is touched, so FIND_MATCH always
        // reaches the client ahead of anything the match sends.
        self.reply(Flag::FindMatch, ResultCode::Success)?;
        let match_id = assignment.game.lock().await.id();
        tracing::info!(%username, %match_id, seat = %assignment.seat, "match found");
        self.current = Some(assignment);
        Ok(Control::Continue)
    }

    // -----------------------------------------------------------------------
    // Match forwarding
    // -----------------------------------------------------------------------

    /// Hands a match flag to the attached match. Detaches once the match
    /// reports it has ended.
    async fn forward(&mut self, flag: Flag, msg: &Message) {
        let Some(assignment) = &self.current else {
            tracing::debug!(username = self.session.username(), %flag, "no match attached, ignoring");
            return;
        };

        let valid = assignment
            .game
            .lock()
            .await
            .handle(assignment.seat, flag, msg.body_int());
        if !valid {
            tracing::debug!(username = self.session.username(), "match over, detaching");
            self.current = None;
        }
    }

    /// Returns `true` if a still-running match is attached. Drops the
    /// attachment if that match has since ended.
    async fn in_match(&mut self) -> bool {
        let Some(assignment) = &self.current else {
            return false;
        };
        let valid = assignment.game.lock().await.is_valid();
        if !valid {
            self.current = None;
        }
        valid
    }

    fn reply(&self, flag: Flag, code: ResultCode) -> Result<(), KittyWarError> {
        Ok(self.conn.send(Response::result(flag, code))?)
    }

    // -----------------------------------------------------------------------
    // Termination
    // -----------------------------------------------------------------------

    async fn terminate(mut self) {
        if let Some(assignment) = self.current.take() {
            assignment.game.lock().await.disconnect(assignment.seat);
        }
        self.logout().await;
        let username = self.session.username().to_owned();
        self.conn.close().await;
        tracing::info!(%username, "session ended");
    }
}
