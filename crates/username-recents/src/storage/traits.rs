//! Storage trait definition.
//!
//! A slot per user holds `Option<Vec<String>>`. `None` means the list was
//! never written; `Some(vec![])` means it was written and is empty. Seeding
//! depends on that distinction, so backends must preserve it.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::Result;
use crate::types::UserId;

/// Read-modify-write function applied by [`RecentUsernameStorage::update`].
///
/// Receives the current slot value and returns the value to store. Backends
/// may call it more than once when they retry a conflicting write.
pub type UpdateFn<'a> = &'a (dyn Fn(Option<&[String]>) -> Vec<String> + Send + Sync);

/// Trait for recent-username storage backends.
#[async_trait]
pub trait RecentUsernameStorage: Send + Sync {
    /// Read the user's list, `None` if it was never written.
    async fn get(&self, user: &UserId) -> Result<Option<Vec<String>>>;

    /// Atomically replace the user's list with `apply(current)`.
    ///
    /// `apply` must see a consistent snapshot and its result must not be
    /// overwritten by a concurrent update that read an older value.
    /// Returns the stored value.
    async fn update(&self, user: &UserId, apply: UpdateFn<'_>) -> Result<Vec<String>>;

    /// Watch the user's slot. The receiver starts at the current value and
    /// sees every later committed write.
    async fn subscribe(&self, user: &UserId) -> Result<watch::Receiver<Option<Vec<String>>>>;

    /// Overwrite the user's list.
    async fn set(&self, user: &UserId, usernames: Vec<String>) -> Result<()> {
        self.update(user, &move |_: Option<&[String]>| usernames.clone())
            .await?;
        Ok(())
    }

    /// Check whether the user's list has ever been written.
    async fn exists(&self, user: &UserId) -> Result<bool> {
        Ok(self.get(user).await?.is_some())
    }
}
