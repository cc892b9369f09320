//! First-use seeding of a user's recency list.
//!
//! Tiers, first non-empty wins:
//!
//! 1. identity emails from the user's stored credentials, folded in order so
//!    the last one ends up first
//! 2. the user's account email as the only entry
//!
//! The seeder only computes the list. Writing it, and only when the slot is
//! still absent, is the manager's job.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::list::RecencyList;
use crate::sources::{AccountDirectory, IdentitySource};
use crate::types::{Credential, UserId};

/// Where a seeded list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedSource {
    Credentials,
    AccountEmail,
}

impl std::fmt::Display for SeedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedSource::Credentials => write!(f, "credentials"),
            SeedSource::AccountEmail => write!(f, "account_email"),
        }
    }
}

/// A list ready to be stored for a never-initialized user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedPlan {
    pub source: SeedSource,
    pub usernames: Vec<String>,
}

/// Computes seed lists from the identity source and account directory.
pub struct Seeder {
    identities: Arc<dyn IdentitySource>,
    accounts: Arc<dyn AccountDirectory>,
    capacity: usize,
}

impl Seeder {
    pub fn new(
        identities: Arc<dyn IdentitySource>,
        accounts: Arc<dyn AccountDirectory>,
        capacity: usize,
    ) -> Self {
        Self {
            identities,
            accounts,
            capacity,
        }
    }

    /// Work out the seed for `user`, or `None` if no tier produced anything.
    ///
    /// A failing collaborator counts as producing nothing for its tier.
    pub async fn plan(&self, user: &UserId) -> Option<SeedPlan> {
        match self.identities.list_credentials(user).await {
            Ok(credentials) => {
                let usernames = fold_identity_emails(&credentials, self.capacity);
                if !usernames.is_empty() {
                    return Some(SeedPlan {
                        source: SeedSource::Credentials,
                        usernames,
                    });
                }
                debug!(user_id = %user, "No identity emails to seed from");
            }
            Err(e) => {
                warn!(user_id = %user, error = %e, "Identity source failed during seeding");
            }
        }

        match self.accounts.account(user).await {
            Ok(Some(profile)) => profile.usable_email().map(|email| SeedPlan {
                source: SeedSource::AccountEmail,
                usernames: vec![email.to_string()],
            }),
            Ok(None) => {
                debug!(user_id = %user, "No account profile to seed from");
                None
            }
            Err(e) => {
                warn!(user_id = %user, error = %e, "Account directory failed during seeding");
                None
            }
        }
    }
}

/// Fold credential identity emails into a recency list in one pass.
pub fn fold_identity_emails(credentials: &[Credential], capacity: usize) -> Vec<String> {
    let mut list = RecencyList::new(capacity);
    list.record_all(credentials.iter().filter_map(Credential::usable_email));
    list.into_vec()
}
