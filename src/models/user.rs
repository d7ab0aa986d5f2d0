// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User, role and invitation models for storage.

use serde::{Deserialize, Serialize};

/// Name of the role assigned to newly registered accounts.
pub const DEFAULT_ROLE: &str = "user";

/// Name of the role required for catalog writes (schools, professors).
pub const ADMIN_ROLE: &str = "admin";

/// Capability level. Higher `level` means more privilege.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: u64,
    /// Role name (also used as document ID)
    pub name: String,
    pub description: String,
    pub level: i32,
}

impl Role {
    /// Roles every deployment starts with.
    pub fn defaults() -> Vec<Role> {
        vec![
            Role {
                id: 1,
                name: DEFAULT_ROLE.to_string(),
                description: "A user can write reviews and upload notes".to_string(),
                level: 1,
            },
            Role {
                id: 2,
                name: "moderator".to_string(),
                description: "A moderator can curate reviews and notes".to_string(),
                level: 2,
            },
            Role {
                id: 3,
                name: ADMIN_ROLE.to_string(),
                description: "An admin can manage schools and professors".to_string(),
                level: 3,
            },
        ]
    }
}

/// User account stored in the data store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Numeric user ID (also used as document ID)
    pub id: u64,
    pub username: String,
    pub email: String,
    /// Argon2id PHC string. `None` for accounts created through Google sign-in.
    pub password_hash: Option<String>,
    /// False until the activation link from the invitation email is used
    pub is_active: bool,
    /// Role snapshot taken when the account was created
    pub role: Role,
    /// When the account was created (RFC 3339)
    pub created_at: String,
}

/// Fields supplied when creating a user; the store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub role: Role,
}

impl NewUser {
    pub fn into_user(self, id: u64, created_at: String) -> User {
        User {
            id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            is_active: self.is_active,
            role: self.role,
            created_at,
        }
    }
}

/// Pending account activation.
///
/// Only the SHA-256 digest of the emailed token is stored; the digest is the
/// document ID so activation is a point lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub token_hash: String,
    pub user_id: u64,
    /// Expiry (RFC 3339)
    pub expires_at: String,
}

impl Invitation {
    /// Whether the invitation can still be redeemed at `now`.
    pub fn is_valid_at(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        chrono::DateTime::parse_from_rfc3339(&self.expires_at)
            .map(|expiry| expiry.with_timezone(&chrono::Utc) > now)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn invitation_expiry_is_exclusive() {
        let now = Utc::now();
        let invitation = Invitation {
            token_hash: "abc".to_string(),
            user_id: 1,
            expires_at: crate::time_utils::format_utc_rfc3339(now + Duration::hours(1)),
        };
        assert!(invitation.is_valid_at(now));
        assert!(!invitation.is_valid_at(now + Duration::hours(2)));
    }

    #[test]
    fn invitation_with_garbage_expiry_is_invalid() {
        let invitation = Invitation {
            token_hash: "abc".to_string(),
            user_id: 1,
            expires_at: "tomorrow".to_string(),
        };
        assert!(!invitation.is_valid_at(Utc::now()));
    }

    #[test]
    fn default_roles_are_ordered() {
        let roles = Role::defaults();
        let user = roles.iter().find(|r| r.name == DEFAULT_ROLE).unwrap();
        let admin = roles.iter().find(|r| r.name == ADMIN_ROLE).unwrap();
        assert!(admin.level > user.level);

        let levels: Vec<_> = roles.iter().map(|r| (r.name.as_str(), r.level)).collect();
        assert_eq!(levels, vec![("user", 1), ("moderator", 2), ("admin", 3)]);
    }
}
