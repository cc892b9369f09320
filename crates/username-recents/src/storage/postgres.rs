//! PostgreSQL recent-username storage.
//!
//! Lists are stored as JSONB arrays, one row per user. A missing row is the
//! never-written state. Each write bumps a row version. Change notification
//! is process-local: subscribers are fed after each commit made through this
//! handle, in row-version order.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::traits::{RecentUsernameStorage, UpdateFn};
use crate::error::{RecentsError, Result};
use crate::types::UserId;

/// Attempts made when two writers race to create the same row.
const MAX_INSERT_ATTEMPTS: usize = 3;

/// Row version of a user that has never been written.
const ABSENT_VERSION: i64 = 0;

/// Local feed for one user's list.
///
/// `version` is the row version last published. Older versions are dropped,
/// so commits that finish out of order cannot roll subscribers back.
struct Watcher {
    tx: watch::Sender<Option<Vec<String>>>,
    version: i64,
}

impl Watcher {
    fn new() -> Self {
        Self {
            tx: watch::channel(None).0,
            version: ABSENT_VERSION - 1,
        }
    }

    /// Publish `value` if `version` is newer than the last one seen.
    /// Subscribers are only woken when the value actually changes.
    fn publish(&mut self, version: i64, value: Option<Vec<String>>) -> bool {
        if version <= self.version {
            return false;
        }
        self.version = version;
        self.tx.send_if_modified(|slot| {
            if *slot == value {
                return false;
            }
            *slot = value;
            true
        })
    }
}

/// PostgreSQL-backed storage.
#[derive(Clone)]
pub struct PostgresRecentUsernameStorage {
    pool: PgPool,
    watchers: Arc<DashMap<UserId, Watcher>>,
}

impl PostgresRecentUsernameStorage {
    /// Connect to PostgreSQL and initialize schema.
    pub async fn new(url: &str, max_connections: u32, connect_timeout_secs: u64) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(connect_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| RecentsError::Connection(e.to_string()))?;

        Self::from_pool(pool).await
    }

    /// Use an existing pool. The schema is created if missing.
    pub async fn from_pool(pool: PgPool) -> Result<Self> {
        let storage = Self::with_pool(pool);
        storage.initialize_schema().await?;
        Ok(storage)
    }

    fn with_pool(pool: PgPool) -> Self {
        Self {
            pool,
            watchers: Arc::new(DashMap::new()),
        }
    }

    async fn initialize_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS recent_usernames (
                user_id UUID PRIMARY KEY,
                usernames JSONB NOT NULL,
                version BIGINT NOT NULL DEFAULT 1,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RecentsError::Storage(e.to_string()))?;

        sqlx::query(
            "ALTER TABLE recent_usernames ADD COLUMN IF NOT EXISTS version BIGINT NOT NULL DEFAULT 1",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RecentsError::Storage(e.to_string()))?;

        Ok(())
    }

    fn decode(value: Value) -> Result<Vec<String>> {
        Ok(serde_json::from_value(value)?)
    }

    fn encode(usernames: &[String]) -> Result<Value> {
        Ok(serde_json::to_value(usernames)?)
    }

    fn decode_row(row: &PgRow) -> Result<(i64, Vec<String>)> {
        let value: Value = row
            .try_get("usernames")
            .map_err(|e| RecentsError::Storage(e.to_string()))?;
        let version: i64 = row
            .try_get("version")
            .map_err(|e| RecentsError::Storage(e.to_string()))?;
        Ok((version, Self::decode(value)?))
    }

    /// Current list and row version; a missing row is [`ABSENT_VERSION`].
    async fn fetch(&self, user: &UserId) -> Result<(i64, Option<Vec<String>>)> {
        let row = sqlx::query("SELECT usernames, version FROM recent_usernames WHERE user_id = $1")
            .bind(*user.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RecentsError::Storage(e.to_string()))?;

        match row {
            Some(row) => {
                let (version, usernames) = Self::decode_row(&row)?;
                Ok((version, Some(usernames)))
            }
            None => Ok((ABSENT_VERSION, None)),
        }
    }

    async fn select_for_update(
        tx: &mut Transaction<'_, Postgres>,
        user: &UserId,
    ) -> Result<Option<Vec<String>>> {
        let row = sqlx::query(
            "SELECT usernames, version FROM recent_usernames WHERE user_id = $1 FOR UPDATE",
        )
        .bind(*user.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| RecentsError::Storage(e.to_string()))?;

        row.map(|row| Self::decode_row(&row).map(|(_, usernames)| usernames))
            .transpose()
    }

    /// Run one read-modify-write transaction.
    ///
    /// Returns the committed list and its new row version, or `None` when the
    /// row was absent and another writer inserted it first; the caller
    /// retries against the new row.
    async fn try_update(
        &self,
        user: &UserId,
        apply: UpdateFn<'_>,
    ) -> Result<Option<(i64, Vec<String>)>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RecentsError::Storage(e.to_string()))?;

        let current = Self::select_for_update(&mut tx, user).await?;
        let next = apply(current.as_deref());
        let encoded = Self::encode(&next)?;

        let version: i64 = if current.is_some() {
            sqlx::query_scalar(
                "UPDATE recent_usernames \
                 SET usernames = $2, version = version + 1, updated_at = NOW() \
                 WHERE user_id = $1 RETURNING version",
            )
            .bind(*user.as_uuid())
            .bind(encoded)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| RecentsError::Storage(e.to_string()))?
        } else {
            let inserted: Option<i64> = sqlx::query_scalar(
                "INSERT INTO recent_usernames (user_id, usernames, version) VALUES ($1, $2, 1) \
                 ON CONFLICT (user_id) DO NOTHING RETURNING version",
            )
            .bind(*user.as_uuid())
            .bind(encoded)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| RecentsError::Storage(e.to_string()))?;

            match inserted {
                Some(version) => version,
                None => {
                    tx.rollback()
                        .await
                        .map_err(|e| RecentsError::Storage(e.to_string()))?;
                    return Ok(None);
                }
            }
        };

        tx.commit()
            .await
            .map_err(|e| RecentsError::Storage(e.to_string()))?;

        Ok(Some((version, next)))
    }

    /// Feed a committed value to local subscribers. Feeds nobody listens to
    /// any more are dropped.
    fn notify(&self, user: &UserId, version: i64, usernames: Option<Vec<String>>) {
        self.watchers.remove_if(user, |_, watcher| watcher.tx.receiver_count() == 0);
        if let Some(mut watcher) = self.watchers.get_mut(user) {
            watcher.publish(version, usernames);
        }
    }

    /// Number of users with a live local feed.
    pub fn watched_users(&self) -> usize {
        self.watchers.len()
    }
}

#[async_trait]
impl RecentUsernameStorage for PostgresRecentUsernameStorage {
    async fn get(&self, user: &UserId) -> Result<Option<Vec<String>>> {
        Ok(self.fetch(user).await?.1)
    }

    async fn update(&self, user: &UserId, apply: UpdateFn<'_>) -> Result<Vec<String>> {
        for attempt in 1..=MAX_INSERT_ATTEMPTS {
            if let Some((version, stored)) = self.try_update(user, apply).await? {
                self.notify(user, version, Some(stored.clone()));
                return Ok(stored);
            }
            debug!(user_id = %user, attempt, "Concurrent insert, retrying update");
        }

        warn!(user_id = %user, "Giving up on contended update");
        Err(RecentsError::Storage(format!(
            "update for {user} lost {MAX_INSERT_ATTEMPTS} insert races"
        )))
    }

    async fn subscribe(&self, user: &UserId) -> Result<watch::Receiver<Option<Vec<String>>>> {
        self.watchers
            .retain(|watched, watcher| watched == user || watcher.tx.receiver_count() > 0);

        // Register before reading so a commit landing in between is either
        // published to this feed or visible to the read below.
        let rx = self
            .watchers
            .entry(*user)
            .or_insert_with(Watcher::new)
            .tx
            .subscribe();

        let (version, current) = self.fetch(user).await?;
        self.notify(user, version, current);
        Ok(rx)
    }
}
