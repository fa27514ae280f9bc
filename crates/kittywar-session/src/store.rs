//! The query interface to the account database.
//!
//! Kitty War doesn't own user accounts. Users sign up and log in through
//! a separate web service, which writes a login token next to the user's
//! profile. The game server only ever asks four questions of that
//! database, and [`ProfileStore`] is exactly those four questions.
//!
//! [`MemoryProfileStore`] answers them from a `HashMap`. It is what the
//! bundled binary and the tests use; a deployment backed by a real
//! database implements the trait over its own client.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::SessionError;

/// Database id of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user-{}", self.0)
    }
}

/// A user's statistics and owned cats, as sent for `USER_PROFILE`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub wins: u32,
    pub loss: u32,
    pub draw: u32,
    pub matches: u32,
    /// Ids of the cats this user may pick during setup.
    pub cats: Vec<u8>,
}

impl Profile {
    /// The JSON text body sent to clients.
    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Read access (plus token clearing) to the account database.
///
/// # Trait bounds
///
/// - `Send + Sync` → one store is shared by every connection task.
/// - `'static` → it lives as long as the server.
///
/// Each method returns `impl Future + Send` rather than being an
/// `async fn` in the trait, so callers can hold the future across
/// `tokio::spawn`. Implementors can still write plain `async fn`.
pub trait ProfileStore: Send + Sync + 'static {
    /// Finds the account id for a username.
    fn lookup(
        &self,
        username: &str,
    ) -> impl std::future::Future<Output = Result<Option<UserId>, SessionError>> + Send;

    /// Returns the user's current login token, if one is set.
    fn lookup_token(
        &self,
        user: UserId,
    ) -> impl std::future::Future<Output = Result<Option<String>, SessionError>> + Send;

    /// Erases the user's login token, ending their login everywhere.
    fn clear_token(
        &self,
        user: UserId,
    ) -> impl std::future::Future<Output = Result<(), SessionError>> + Send;

    /// Loads statistics and owned cats.
    fn load_profile(
        &self,
        user: UserId,
    ) -> impl std::future::Future<Output = Result<Profile, SessionError>> + Send;
}

// ---------------------------------------------------------------------------
// MemoryProfileStore
// ---------------------------------------------------------------------------

/// One account row, as seeded from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: UserId,
    pub username: String,
    /// Empty means "logged out".
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub profile: Profile,
}

/// A [`ProfileStore`] kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    accounts: Mutex<HashMap<UserId, Account>>,
}

impl MemoryProfileStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given accounts.
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let accounts = accounts.into_iter().map(|a| (a.user_id, a)).collect();
        Self {
            accounts: Mutex::new(accounts),
        }
    }

    /// Parses a JSON array of accounts:
    ///
    /// ```json
    /// [{"user_id": 1, "username": "alice", "token": "...", "profile": {"cats": [0, 1]}}]
    /// ```
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        let accounts: Vec<Account> = serde_json::from_str(json)?;
        Ok(Self::with_accounts(accounts))
    }

    /// Adds or replaces an account.
    pub async fn insert(&self, account: Account) {
        self.accounts.lock().await.insert(account.user_id, account);
    }

    /// Number of accounts held.
    pub async fn len(&self) -> usize {
        self.accounts.lock().await.len()
    }

    /// Returns `true` if no accounts are held.
    pub async fn is_empty(&self) -> bool {
        self.accounts.lock().await.is_empty()
    }
}

impl ProfileStore for MemoryProfileStore {
    async fn lookup(&self, username: &str) -> Result<Option<UserId>, SessionError> {
        let accounts = self.accounts.lock().await;
        Ok(accounts
            .values()
            .find(|a| a.username == username)
            .map(|a| a.user_id))
    }

    async fn lookup_token(&self, user: UserId) -> Result<Option<String>, SessionError> {
        let accounts = self.accounts.lock().await;
        Ok(accounts
            .get(&user)
            .map(|a| a.token.clone())
            .filter(|t| !t.is_empty()))
    }

    async fn clear_token(&self, user: UserId) -> Result<(), SessionError> {
        let mut accounts = self.accounts.lock().await;
        match accounts.get_mut(&user) {
            Some(account) => {
                account.token.clear();
                Ok(())
            }
            None => Err(SessionError::Store(format!("{user} does not exist"))),
        }
    }

    async fn load_profile(&self, user: UserId) -> Result<Profile, SessionError> {
        let accounts = self.accounts.lock().await;
        accounts
            .get(&user)
            .map(|a| a.profile.clone())
            .ok_or_else(|| SessionError::Store(format!("{user} has no profile")))
    }
}

/// A shared store, so the embedding program can keep a handle to the
/// same accounts the server reads.
impl<T: ProfileStore> ProfileStore for Arc<T> {
    fn lookup(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<UserId>, SessionError>> + Send {
        (**self).lookup(username)
    }

    fn lookup_token(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Option<String>, SessionError>> + Send {
        (**self).lookup_token(user)
    }

    fn clear_token(&self, user: UserId) -> impl Future<Output = Result<(), SessionError>> + Send {
        (**self).clear_token(user)
    }

    fn load_profile(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Profile, SessionError>> + Send {
        (**self).load_profile(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Account {
        Account {
            user_id: UserId(1),
            username: "alice".into(),
            token: "tok-alice".into(),
            profile: Profile {
                wins: 3,
                cats: vec![0, 1],
                ..Profile::default()
            },
        }
    }

    #[tokio::test]
    async fn test_lookup_finds_user_by_name() {
        let store = MemoryProfileStore::with_accounts([alice()]);
        assert_eq!(store.lookup("alice").await.unwrap(), Some(UserId(1)));
        assert_eq!(store.lookup("bob").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_token_makes_lookup_token_none() {
        let store = MemoryProfileStore::with_accounts([alice()]);
        assert_eq!(
            store.lookup_token(UserId(1)).await.unwrap().as_deref(),
            Some("tok-alice")
        );
        store.clear_token(UserId(1)).await.unwrap();
        assert_eq!(store.lookup_token(UserId(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_shared_store_sees_cleared_token() {
        let store = Arc::new(MemoryProfileStore::with_accounts([alice()]));
        let shared = Arc::clone(&store);
        shared.clear_token(UserId(1)).await.unwrap();
        assert_eq!(store.lookup_token(UserId(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_token_unknown_user_is_store_error() {
        let store = MemoryProfileStore::new();
        let result = store.clear_token(UserId(9)).await;
        assert!(matches!(result, Err(SessionError::Store(_))));
    }

    #[tokio::test]
    async fn test_load_profile_returns_seeded_profile() {
        let store = MemoryProfileStore::with_accounts([alice()]);
        let profile = store.load_profile(UserId(1)).await.unwrap();
        assert_eq!(profile.wins, 3);
        assert_eq!(profile.cats, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_from_json_defaults_missing_fields() {
        let json = r#"[
            {"user_id": 1, "username": "alice", "token": "t1", "profile": {"wins": 1, "loss": 0, "draw": 0, "matches": 1, "cats": [2]}},
            {"user_id": 2, "username": "bob"}
        ]"#;
        let store = MemoryProfileStore::from_json(json).unwrap();
        assert_eq!(store.len().await, 2);
        assert_eq!(store.lookup_token(UserId(2)).await.unwrap(), None);
        assert_eq!(store.load_profile(UserId(2)).await.unwrap(), Profile::default());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            MemoryProfileStore::from_json("{not json"),
            Err(SessionError::Json(_))
        ));
    }

    #[test]
    fn test_profile_json_uses_wire_keys() {
        let json = alice().profile.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for key in ["wins", "loss", "draw", "matches", "cats"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }
}
