//! Recent Username Manager - main facade for recent-username operations.
//!
//! Every public operation is best-effort. Invalid input is ignored and any
//! storage or collaborator failure is logged, broadcast as
//! [`RecentsEvent::OperationFailed`] and turned into an empty or no-op
//! result. Callers never see an error, so a broken store can cost the user
//! their suggestions but never block the credential form.

use futures::stream::{self, BoxStream, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, instrument, warn};

use crate::config::RecentsConfig;
use crate::error::Result;
use crate::list::{take_recent, RecencyList};
use crate::seeding::{SeedSource, Seeder};
use crate::sources::{AccountDirectory, IdentitySource};
use crate::storage::RecentUsernameStorage;
use crate::types::{ActiveAccount, UserId};

/// Operations reported in failure events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    AddUsername,
    GetRecent,
    Clear,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::AddUsername => write!(f, "add_username"),
            Operation::GetRecent => write!(f, "get_recent"),
            Operation::Clear => write!(f, "clear"),
        }
    }
}

/// Events emitted by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecentsEvent {
    /// A username was moved to the front of a user's list.
    UsernameRecorded { user_id: UserId, username: String },

    /// A user's list was emptied.
    Cleared { user_id: UserId },

    /// A never-initialized list was seeded.
    Seeded {
        user_id: UserId,
        source: SeedSource,
        count: usize,
    },

    /// An operation failed and was absorbed.
    OperationFailed {
        user_id: UserId,
        operation: Operation,
        reason: String,
    },
}

/// Tracks each user's most recently used login usernames.
pub struct RecentUsernameManager {
    /// Configuration.
    config: RecentsConfig,

    /// Persisted lists.
    storage: Arc<dyn RecentUsernameStorage>,

    /// Source of the active account.
    accounts: Arc<dyn AccountDirectory>,

    /// First-use seeding.
    seeder: Seeder,

    /// Event broadcaster.
    event_tx: broadcast::Sender<RecentsEvent>,
}

impl RecentUsernameManager {
    /// Create a new manager.
    pub fn new(
        config: RecentsConfig,
        storage: Arc<dyn RecentUsernameStorage>,
        identities: Arc<dyn IdentitySource>,
        accounts: Arc<dyn AccountDirectory>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        let seeder = Seeder::new(identities, accounts.clone(), config.capacity());

        Self {
            config,
            storage,
            accounts,
            seeder,
            event_tx,
        }
    }

    /// Subscribe to manager events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<RecentsEvent> {
        self.event_tx.subscribe()
    }

    pub fn config(&self) -> &RecentsConfig {
        &self.config
    }

    /// Move `username` to the front of the user's list.
    ///
    /// The username is trimmed; blank input is ignored. The list is updated
    /// in a single storage transaction and capped at the configured size.
    /// Storage failures are logged and swallowed.
    #[instrument(skip(self, username), fields(user_id = %user))]
    pub async fn add_username(&self, user: &UserId, username: &str) {
        let username = username.trim();
        if username.is_empty() {
            return;
        }

        match self.try_add_username(user, username).await {
            Ok(stored) => {
                debug!(len = stored.len(), "Recorded username");
                self.emit_event(RecentsEvent::UsernameRecorded {
                    user_id: *user,
                    username: username.to_string(),
                });
            }
            Err(e) => self.absorb(user, Operation::AddUsername, e),
        }
    }

    /// The user's `limit` most recent usernames, most recent first.
    ///
    /// A list that was never written is seeded first; a list that was
    /// cleared is returned as is. Any failure yields an empty list.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn get_recent(&self, user: &UserId, limit: usize) -> Vec<String> {
        match self.try_get_recent(user, limit).await {
            Ok(recent) => recent,
            Err(e) => {
                self.absorb(user, Operation::GetRecent, e);
                Vec::new()
            }
        }
    }

    /// [`get_recent`](Self::get_recent) with the configured default limit.
    pub async fn get_recent_default(&self, user: &UserId) -> Vec<String> {
        self.get_recent(user, self.config.default_limit).await
    }

    /// Replace the user's list with an empty one.
    ///
    /// A cleared list counts as initialized and is never re-seeded.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn clear(&self, user: &UserId) {
        match self.storage.set(user, Vec::new()).await {
            Ok(()) => {
                info!("Cleared recent usernames");
                self.emit_event(RecentsEvent::Cleared { user_id: *user });
            }
            Err(e) => self.absorb(user, Operation::Clear, e),
        }
    }

    /// Stream the active user's `limit` most recent usernames.
    ///
    /// Emits immediately, then again whenever the signed-in user changes or
    /// that user's stored list changes. Emits an empty list while nobody is
    /// signed in, while the user's list is absent, or when storage fails.
    /// This view only observes: it never seeds a list, only
    /// [`get_recent`](Self::get_recent) does. The stream ends when the
    /// account directory goes away.
    pub fn watch_active_recent(&self, limit: usize) -> BoxStream<'static, Vec<String>> {
        let view = ActiveView {
            storage: self.storage.clone(),
            active: self.accounts.active_account(),
            current_user: None,
            list: None,
            limit,
            started: false,
        };

        stream::unfold(view, |mut view| async move {
            let next = view.next().await?;
            Some((next, view))
        })
        .boxed()
    }

    async fn try_add_username(&self, user: &UserId, username: &str) -> Result<Vec<String>> {
        let capacity = self.config.capacity();
        self.storage
            .update(user, &|current: Option<&[String]>| {
                let mut list = RecencyList::from_stored(current, capacity);
                list.record(username);
                list.into_vec()
            })
            .await
    }

    async fn try_get_recent(&self, user: &UserId, limit: usize) -> Result<Vec<String>> {
        if let Some(stored) = self.storage.get(user).await? {
            return Ok(take_recent(&stored, limit));
        }

        let Some(plan) = self.seeder.plan(user).await else {
            debug!("Nothing to seed from, list stays absent");
            return Ok(Vec::new());
        };

        // Re-check absence inside the transaction so a list written since the
        // read above is kept rather than replaced by the seed.
        let seeded = AtomicBool::new(false);
        let stored = self
            .storage
            .update(user, &|current: Option<&[String]>| match current {
                Some(existing) => {
                    seeded.store(false, Ordering::SeqCst);
                    existing.to_vec()
                }
                None => {
                    seeded.store(true, Ordering::SeqCst);
                    plan.usernames.clone()
                }
            })
            .await?;

        if seeded.load(Ordering::SeqCst) {
            info!(source = %plan.source, count = stored.len(), "Seeded recent usernames");
            self.emit_event(RecentsEvent::Seeded {
                user_id: *user,
                source: plan.source,
                count: stored.len(),
            });
        } else {
            debug!("List was initialized concurrently, keeping it");
        }

        Ok(take_recent(&stored, limit))
    }

    fn absorb(&self, user: &UserId, operation: Operation, error: crate::error::RecentsError) {
        warn!(user_id = %user, %operation, error = %error, "Recent usernames unavailable");
        self.emit_event(RecentsEvent::OperationFailed {
            user_id: *user,
            operation,
            reason: error.to_string(),
        });
    }

    fn emit_event(&self, event: RecentsEvent) {
        let _ = self.event_tx.send(event);
    }
}

/// State behind [`RecentUsernameManager::watch_active_recent`].
struct ActiveView {
    storage: Arc<dyn RecentUsernameStorage>,
    active: watch::Receiver<Option<ActiveAccount>>,
    current_user: Option<UserId>,
    list: Option<watch::Receiver<Option<Vec<String>>>>,
    limit: usize,
    started: bool,
}

impl ActiveView {
    async fn next(&mut self) -> Option<Vec<String>> {
        if !self.started {
            self.started = true;
            let user = self.active.borrow_and_update().as_ref().map(|a| a.id);
            return Some(self.switch_to(user).await);
        }

        loop {
            tokio::select! {
                changed = self.active.changed() => {
                    changed.ok()?;
                    let user = self.active.borrow_and_update().as_ref().map(|a| a.id);
                    if user == self.current_user {
                        continue;
                    }
                    return Some(self.switch_to(user).await);
                }
                changed = list_changed(&mut self.list) => {
                    if changed.is_err() {
                        self.list = None;
                        return Some(Vec::new());
                    }
                    return Some(self.current_value());
                }
            }
        }
    }

    async fn switch_to(&mut self, user: Option<UserId>) -> Vec<String> {
        self.current_user = user;
        self.list = None;

        let Some(user) = user else {
            return Vec::new();
        };

        match self.storage.subscribe(&user).await {
            Ok(rx) => {
                self.list = Some(rx);
                self.current_value()
            }
            Err(e) => {
                warn!(user_id = %user, error = %e, "Cannot watch recent usernames");
                Vec::new()
            }
        }
    }

    fn current_value(&mut self) -> Vec<String> {
        let stored = match self.list.as_mut() {
            Some(rx) => rx.borrow_and_update().clone(),
            None => None,
        };
        stored
            .map(|stored| take_recent(&stored, self.limit))
            .unwrap_or_default()
    }
}

async fn list_changed(
    list: &mut Option<watch::Receiver<Option<Vec<String>>>>,
) -> std::result::Result<(), watch::error::RecvError> {
    match list {
        Some(rx) => rx.changed().await,
        None => std::future::pending().await,
    }
}
