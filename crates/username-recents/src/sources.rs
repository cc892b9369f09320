//! Collaborators consulted when a user's list is seeded.
//!
//! The identity source lists stored credentials; the account directory knows
//! the signed-in account and every account's profile email. Both are owned
//! elsewhere and only their contracts live here, together with mock
//! implementations for tests and local development.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

use crate::error::{RecentsError, Result};
use crate::types::{AccountProfile, ActiveAccount, Credential, UserId};

/// Supplies a user's stored credentials.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    /// All credentials belonging to `user`, in the source's natural order.
    async fn list_credentials(&self, user: &UserId) -> Result<Vec<Credential>>;
}

/// Supplies the active account and account profiles.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Watch the signed-in account; `None` while signed out.
    fn active_account(&self) -> watch::Receiver<Option<ActiveAccount>>;

    /// Every known account profile keyed by user.
    async fn accounts_by_id(&self) -> Result<HashMap<UserId, AccountProfile>>;

    /// Profile for a single user.
    async fn account(&self, user: &UserId) -> Result<Option<AccountProfile>> {
        Ok(self.accounts_by_id().await?.remove(user))
    }
}

/// Mock identity source for testing.
pub struct MockIdentitySource {
    credentials: DashMap<UserId, Vec<Credential>>,

    /// Whether to simulate errors.
    pub simulate_error: bool,

    calls: AtomicUsize,
}

impl MockIdentitySource {
    /// Create a source with no credentials.
    pub fn new() -> Self {
        Self {
            credentials: DashMap::new(),
            simulate_error: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a source that fails every query.
    pub fn with_errors() -> Self {
        Self {
            simulate_error: true,
            ..Self::new()
        }
    }

    /// Register credentials for a user, replacing earlier ones.
    pub fn with_credentials(self, user: UserId, credentials: Vec<Credential>) -> Self {
        self.credentials.insert(user, credentials);
        self
    }

    /// Number of `list_credentials` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockIdentitySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentitySource for MockIdentitySource {
    async fn list_credentials(&self, user: &UserId) -> Result<Vec<Credential>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.simulate_error {
            return Err(RecentsError::IdentitySource("simulated error".to_string()));
        }

        Ok(self
            .credentials
            .get(user)
            .map(|c| c.clone())
            .unwrap_or_default())
    }
}

/// Mock account directory for testing.
pub struct MockAccountDirectory {
    accounts: DashMap<UserId, AccountProfile>,
    active: watch::Sender<Option<ActiveAccount>>,

    /// Whether `accounts_by_id` should fail.
    pub simulate_error: bool,
}

impl MockAccountDirectory {
    /// Create a directory with no accounts and nobody signed in.
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            active: watch::channel(None).0,
            simulate_error: false,
        }
    }

    /// Create a directory whose account lookups fail.
    pub fn with_errors() -> Self {
        Self {
            simulate_error: true,
            ..Self::new()
        }
    }

    /// Register an account profile.
    pub fn with_account(self, user: UserId, profile: AccountProfile) -> Self {
        self.accounts.insert(user, profile);
        self
    }

    /// Switch the signed-in account.
    pub fn set_active(&self, account: Option<ActiveAccount>) {
        self.active.send_replace(account);
    }

    /// Sign in a registered user, copying the profile email.
    pub fn activate(&self, user: UserId) {
        let email = self.accounts.get(&user).and_then(|p| p.email.clone());
        self.set_active(Some(ActiveAccount { id: user, email }));
    }
}

impl Default for MockAccountDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountDirectory for MockAccountDirectory {
    fn active_account(&self) -> watch::Receiver<Option<ActiveAccount>> {
        self.active.subscribe()
    }

    async fn accounts_by_id(&self) -> Result<HashMap<UserId, AccountProfile>> {
        if self.simulate_error {
            return Err(RecentsError::AccountDirectory("simulated error".to_string()));
        }

        Ok(self
            .accounts
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_identity_source_counts_calls() {
        let user = UserId::generate();
        let source = MockIdentitySource::new()
            .with_credentials(user, vec![Credential::with_identity_email("c1", "a@x.io")]);

        let credentials = source.list_credentials(&user).await.unwrap();
        let other = source.list_credentials(&UserId::generate()).await.unwrap();

        assert_eq!(credentials.len(), 1);
        assert!(other.is_empty());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_identity_source_errors() {
        let source = MockIdentitySource::with_errors();
        assert!(source.list_credentials(&UserId::generate()).await.is_err());
    }

    #[tokio::test]
    async fn test_account_lookup_by_id() {
        let user = UserId::generate();
        let directory =
            MockAccountDirectory::new().with_account(user, AccountProfile::with_email("e@x.io"));

        let profile = directory.account(&user).await.unwrap();
        assert_eq!(profile, Some(AccountProfile::with_email("e@x.io")));
        assert_eq!(directory.account(&UserId::generate()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_activate_publishes_active_account() {
        let user = UserId::generate();
        let directory =
            MockAccountDirectory::new().with_account(user, AccountProfile::with_email("e@x.io"));
        let mut rx = directory.active_account();
        assert_eq!(*rx.borrow(), None);

        directory.activate(user);

        rx.changed().await.unwrap();
        let active = rx.borrow_and_update().clone().unwrap();
        assert_eq!(active.id, user);
        assert_eq!(active.email.as_deref(), Some("e@x.io"));
    }
}
