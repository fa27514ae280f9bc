//! Per-connection session state.
//!
//! A "session" is the server's record of who is on the other end of one
//! connection. It starts anonymous, becomes authenticated after a
//! successful `LOGIN`, and caches the user's profile once loaded. It does
//! no I/O of its own beyond the [`ProfileStore`] calls; the dispatcher
//! decides what to send back.

use kittywar_protocol::Token;

use crate::{Profile, ProfileStore, SessionError, UserId};

/// Name used in logs before a client has said who they are.
pub const ANONYMOUS: &str = "Anonymous";

/// Identity and profile of the user behind one connection.
#[derive(Debug, Default)]
pub struct Session {
    username: Option<String>,
    user_id: Option<UserId>,
    authenticated: bool,
    profile: Option<Profile>,
}

impl Session {
    /// Creates an anonymous, unauthenticated session.
    pub fn new() -> Self {
        Self::default()
    }

    /// The username the client claimed, or [`ANONYMOUS`].
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(ANONYMOUS)
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// The cached profile, if it has been loaded.
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Checks `token` against the one stored for `username`.
    ///
    /// The claimed username is remembered even on failure so later log
    /// lines say who tried.
    ///
    /// # Errors
    /// - [`SessionError::UnknownUser`] if no account has that name.
    /// - [`SessionError::TokenMismatch`] if the tokens differ or the
    ///   stored token has been cleared.
    /// - [`SessionError::Store`] if the store could not answer.
    pub async fn login<S: ProfileStore>(
        &mut self,
        store: &S,
        username: &str,
        token: &Token,
    ) -> Result<(), SessionError> {
        self.username = Some(username.to_owned());

        let user = store
            .lookup(username)
            .await?
            .ok_or_else(|| SessionError::UnknownUser(username.to_owned()))?;

        match store.lookup_token(user).await? {
            Some(stored) if stored == token.as_str() => {
                self.user_id = Some(user);
                self.authenticated = true;
                tracing::info!(username, %user, "authenticated");
                Ok(())
            }
            _ => Err(SessionError::TokenMismatch(username.to_owned())),
        }
    }

    /// Clears the stored token if this session is logged in.
    ///
    /// Safe to call on an anonymous session; it does nothing.
    pub async fn logout<S: ProfileStore>(&mut self, store: &S) -> Result<(), SessionError> {
        if !self.authenticated {
            return Ok(());
        }
        self.authenticated = false;
        if let Some(user) = self.user_id {
            tracing::info!(username = self.username(), "logging out");
            store.clear_token(user).await?;
        }
        Ok(())
    }

    /// Reloads the profile from the store and caches it.
    pub async fn load_profile<S: ProfileStore>(
        &mut self,
        store: &S,
    ) -> Result<&Profile, SessionError> {
        let user = self.authenticated_user()?;
        let profile = store.load_profile(user).await?;
        Ok(self.profile.insert(profile))
    }

    /// Returns the cached profile, loading it first if needed.
    pub async fn ensure_profile<S: ProfileStore>(
        &mut self,
        store: &S,
    ) -> Result<&Profile, SessionError> {
        if self.profile.is_none() {
            self.load_profile(store).await?;
        }
        self.profile.as_ref().ok_or(SessionError::NotAuthenticated)
    }

    fn authenticated_user(&self) -> Result<UserId, SessionError> {
        match (self.authenticated, self.user_id) {
            (true, Some(user)) => Ok(user),
            _ => Err(SessionError::NotAuthenticated),
        }
    }
}
