//! Configuration for recent-username tracking.

use serde::{Deserialize, Serialize};

use crate::list::{DEFAULT_LIMIT, MAX_USERNAMES};

/// Manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentsConfig {
    /// Usernames remembered per user, at most [`MAX_USERNAMES`]
    #[serde(default = "default_max_usernames")]
    pub max_usernames: usize,

    /// Suggestions returned when no limit is given
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl RecentsConfig {
    /// Capacity actually applied to lists, between 1 and [`MAX_USERNAMES`].
    pub fn capacity(&self) -> usize {
        self.max_usernames.clamp(1, MAX_USERNAMES)
    }
}

impl Default for RecentsConfig {
    fn default() -> Self {
        Self {
            max_usernames: MAX_USERNAMES,
            default_limit: DEFAULT_LIMIT,
            storage: StorageConfig::default(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (for development/testing)
    Memory,

    /// PostgreSQL storage
    Postgres {
        /// Connection URL
        url: String,

        /// Maximum connections in pool
        #[serde(default = "default_pool_size")]
        max_connections: u32,

        /// Connection timeout in seconds
        #[serde(default = "default_connection_timeout")]
        connect_timeout_secs: u64,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory
    }
}

fn default_max_usernames() -> usize {
    MAX_USERNAMES
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_pool_size() -> u32 {
    5
}

fn default_connection_timeout() -> u64 {
    5
}
