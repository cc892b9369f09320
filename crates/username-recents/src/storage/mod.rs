//! Recent-username storage backends.
//!
//! Provides the persistence contract the manager consumes plus an in-memory
//! and an optional PostgreSQL implementation.

pub mod memory;
pub mod traits;

#[cfg(feature = "postgres")]
pub mod postgres;

use std::sync::Arc;

pub use memory::InMemoryRecentUsernameStorage;
pub use traits::{RecentUsernameStorage, UpdateFn};

#[cfg(feature = "postgres")]
pub use postgres::PostgresRecentUsernameStorage;

use crate::config::StorageConfig;
use crate::error::Result;

/// Build the storage backend selected by configuration.
pub async fn connect(config: &StorageConfig) -> Result<Arc<dyn RecentUsernameStorage>> {
    match config {
        StorageConfig::Memory => Ok(Arc::new(InMemoryRecentUsernameStorage::new())),
        #[cfg(feature = "postgres")]
        StorageConfig::Postgres {
            url,
            max_connections,
            connect_timeout_secs,
        } => {
            let storage =
                PostgresRecentUsernameStorage::new(url, *max_connections, *connect_timeout_secs)
                    .await?;
            Ok(Arc::new(storage))
        }
        #[cfg(not(feature = "postgres"))]
        StorageConfig::Postgres { .. } => Err(crate::error::RecentsError::Connection(
            "postgres storage requires the `postgres` feature".to_string(),
        )),
    }
}
