//! Identity and collaborator value types.

use serde::{Deserialize, Serialize};

/// Opaque user identifier.
///
/// Keys the persisted recency list, the credential query and the account
/// directory lookup for the same person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(uuid::Uuid);

impl UserId {
    /// Generate a new random user ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Create from a UUID.
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

/// A stored credential record, reduced to the one field seeding reads.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Credential {
    /// Record identifier in the owning vault.
    pub id: String,

    /// Email carried by an identity-type record, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_email: Option<String>,
}

impl Credential {
    /// Credential without an identity email.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            identity_email: None,
        }
    }

    /// Credential carrying an identity email.
    pub fn with_identity_email(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            identity_email: Some(email.into()),
        }
    }

    /// The identity email, trimmed, if it is non-empty.
    pub fn usable_email(&self) -> Option<&str> {
        non_blank(self.identity_email.as_deref())
    }
}

/// Account profile as listed by the account directory.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountProfile {
    pub email: Option<String>,
}

impl AccountProfile {
    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
        }
    }

    /// The account email, trimmed, if it is non-empty.
    pub fn usable_email(&self) -> Option<&str> {
        non_blank(self.email.as_deref())
    }
}

/// The account currently signed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveAccount {
    pub id: UserId,
    pub email: Option<String>,
}

impl ActiveAccount {
    pub fn new(id: UserId) -> Self {
        Self { id, email: None }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_display_round_trips_through_from_str() {
        let id = UserId::generate();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_usable_email_trims_and_rejects_blank() {
        assert_eq!(
            Credential::with_identity_email("c1", "  a@example.com ").usable_email(),
            Some("a@example.com")
        );
        assert_eq!(Credential::with_identity_email("c2", "   ").usable_email(), None);
        assert_eq!(Credential::new("c3").usable_email(), None);
        assert_eq!(AccountProfile::default().usable_email(), None);
        assert_eq!(
            AccountProfile::with_email("e@example.com").usable_email(),
            Some("e@example.com")
        );
    }

    #[test]
    fn test_credential_serde_omits_missing_email() {
        let json = serde_json::to_string(&Credential::new("c1")).unwrap();
        assert_eq!(json, r#"{"id":"c1"}"#);
    }
}
