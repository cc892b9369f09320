//! In-memory recent-username storage.
//!
//! Each user's slot is a `watch` sender, so the stored value and its change
//! feed are the same object. Nothing survives a process restart.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::watch;

use super::traits::{RecentUsernameStorage, UpdateFn};
use crate::error::Result;
use crate::types::UserId;

type Slot = watch::Sender<Option<Vec<String>>>;

/// In-memory storage implementation.
#[derive(Clone)]
pub struct InMemoryRecentUsernameStorage {
    /// One slot per user; `None` inside the slot means never written.
    slots: Arc<DashMap<UserId, Slot>>,
}

impl InMemoryRecentUsernameStorage {
    /// Create a new in-memory storage.
    pub fn new() -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
        }
    }

    /// Number of users with a slot, written or merely watched.
    pub fn user_count(&self) -> usize {
        self.slots.len()
    }

    /// Return every slot to the never-written state.
    ///
    /// Existing subscribers stay connected and observe `None`.
    pub fn reset(&self) {
        for slot in self.slots.iter() {
            slot.send_replace(None);
        }
    }
}

impl Default for InMemoryRecentUsernameStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecentUsernameStorage for InMemoryRecentUsernameStorage {
    async fn get(&self, user: &UserId) -> Result<Option<Vec<String>>> {
        Ok(self.slots.get(user).and_then(|slot| slot.borrow().clone()))
    }

    async fn update(&self, user: &UserId, apply: UpdateFn<'_>) -> Result<Vec<String>> {
        // The entry guard holds the shard lock for the whole read-modify-write.
        let slot = self
            .slots
            .entry(*user)
            .or_insert_with(|| watch::channel(None).0);

        let mut stored = Vec::new();
        slot.send_modify(|value| {
            let next = apply(value.as_deref());
            stored = next.clone();
            *value = Some(next);
        });

        Ok(stored)
    }

    async fn subscribe(&self, user: &UserId) -> Result<watch::Receiver<Option<Vec<String>>>> {
        let slot = self
            .slots
            .entry(*user)
            .or_insert_with(|| watch::channel(None).0);
        Ok(slot.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_absent_until_written() {
        let storage = InMemoryRecentUsernameStorage::new();
        let user = UserId::generate();

        assert_eq!(storage.get(&user).await.unwrap(), None);
        assert!(!storage.exists(&user).await.unwrap());

        storage.set(&user, Vec::new()).await.unwrap();

        assert_eq!(storage.get(&user).await.unwrap(), Some(Vec::new()));
        assert!(storage.exists(&user).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_sees_previous_value() {
        let storage = InMemoryRecentUsernameStorage::new();
        let user = UserId::generate();

        let first = storage
            .update(&user, &|current: Option<&[String]>| {
                assert!(current.is_none());
                names(&["a"])
            })
            .await
            .unwrap();
        assert_eq!(first, names(&["a"]));

        let second = storage
            .update(&user, &|current: Option<&[String]>| {
                let mut next = names(&["b"]);
                next.extend(current.unwrap_or_default().iter().cloned());
                next
            })
            .await
            .unwrap();
        assert_eq!(second, names(&["b", "a"]));
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let storage = InMemoryRecentUsernameStorage::new();
        let alice = UserId::generate();
        let bob = UserId::generate();

        storage.set(&alice, names(&["alice"])).await.unwrap();

        assert_eq!(storage.get(&bob).await.unwrap(), None);
        assert_eq!(storage.get(&alice).await.unwrap(), Some(names(&["alice"])));
    }

    #[tokio::test]
    async fn test_subscribe_observes_writes() {
        let storage = InMemoryRecentUsernameStorage::new();
        let user = UserId::generate();

        let mut rx = storage.subscribe(&user).await.unwrap();
        assert_eq!(*rx.borrow(), None);

        storage.set(&user, names(&["a"])).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(names(&["a"])));
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_not_lost() {
        let storage = InMemoryRecentUsernameStorage::new();
        let user = UserId::generate();

        let mut handles = Vec::new();
        for i in 0..16 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                let name = format!("u{i}");
                storage
                    .update(&user, &move |current: Option<&[String]>| {
                        let mut next = vec![name.clone()];
                        next.extend(current.unwrap_or_default().iter().cloned());
                        next
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(storage.get(&user).await.unwrap().unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_reset_returns_slots_to_absent() {
        let storage = InMemoryRecentUsernameStorage::new();
        let user = UserId::generate();
        storage.set(&user, names(&["a"])).await.unwrap();
        let mut rx = storage.subscribe(&user).await.unwrap();

        storage.reset();

        assert_eq!(storage.user_count(), 1);
        assert_eq!(storage.get(&user).await.unwrap(), None);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), None);
    }
}
