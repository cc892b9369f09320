//! # Username Recents - Recently Used Login Usernames
//!
//! This crate keeps, per user, a short most-recently-used list of the
//! usernames typed into a credential form so the form can offer them as
//! autocomplete suggestions.
//!
//! ## Overview
//!
//! - **Recording**: a submitted username moves to the front of the list;
//!   duplicates are removed and the list is capped at [`MAX_USERNAMES`]
//! - **Suggestions**: the first few entries, most recent first
//! - **Seeding**: a list that has never been written is populated on first
//!   read from credential identity emails, falling back to the account email
//! - **Clearing**: an explicitly emptied list stays empty and is not seeded
//! - **Watching**: a stream of the signed-in user's list
//!
//! ## Architectural Boundaries
//!
//! - **storage backends** own persistence and atomic read-modify-write
//! - **identity source** owns stored credentials
//! - **account directory** owns the active account and account profiles
//! - **username-recents** owns the list rules and the seeding order
//!
//! ## Best-effort contract
//!
//! Suggestions are a convenience. [`RecentUsernameManager`] never returns an
//! error: failures are logged with `tracing`, broadcast as
//! [`RecentsEvent::OperationFailed`] and turned into an empty result or a
//! no-op.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use username_recents::{
//!     RecentUsernameManager, RecentsConfig, UserId,
//!     sources::{MockAccountDirectory, MockIdentitySource},
//!     storage::InMemoryRecentUsernameStorage,
//! };
//!
//! # async fn example() {
//! let manager = RecentUsernameManager::new(
//!     RecentsConfig::default(),
//!     Arc::new(InMemoryRecentUsernameStorage::new()),
//!     Arc::new(MockIdentitySource::new()),
//!     Arc::new(MockAccountDirectory::new()),
//! );
//!
//! let user = UserId::generate();
//! manager.add_username(&user, "alice@example.com").await;
//!
//! let suggestions = manager.get_recent(&user, 3).await;
//! assert_eq!(suggestions, vec!["alice@example.com"]);
//! # }
//! ```

pub mod config;
pub mod error;
pub mod list;
pub mod manager;
pub mod seeding;
pub mod sources;
pub mod storage;
pub mod types;

// Re-export main types
pub use config::{RecentsConfig, StorageConfig};
pub use error::{RecentsError, Result};
pub use list::{RecencyList, DEFAULT_LIMIT, MAX_USERNAMES};
pub use manager::{Operation, RecentUsernameManager, RecentsEvent};
pub use seeding::{SeedPlan, SeedSource, Seeder};
pub use sources::{AccountDirectory, IdentitySource};
pub use storage::{InMemoryRecentUsernameStorage, RecentUsernameStorage};
pub use types::{AccountProfile, ActiveAccount, Credential, UserId};
