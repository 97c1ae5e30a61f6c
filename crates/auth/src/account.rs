//! Account model.
//!
//! Accounts are owned by the account repository; this module only describes
//! their shape and the field-level rules every writer must respect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use userdesk_core::{AccountId, DomainError, Entity};

use crate::Role;

/// Per-account profile, created together with the account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Reference to the profile picture (path or URL); upload handling lives
    /// outside this service.
    pub image: Option<String>,
}

/// A stored user account.
///
/// # Invariants
/// - `email` and `username` are unique (enforced by the repository).
/// - `role` only ever comes from a signed invite claim or an admin request.
/// - `password_hash` is a PHC string, never plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub city: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    /// Session tokens carry the epoch they were issued under; bumping it
    /// revokes every outstanding session.
    pub session_epoch: i64,
    pub profile: Profile,
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Fields needed to create an account (everything but the password).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub city: String,
    pub role: Role,
}

impl Account {
    /// Build a fresh, active account with an empty profile.
    pub fn create(
        new: NewAccount,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        validate_email(&new.email)?;
        validate_username(&new.username)?;
        if password_hash.is_empty() {
            return Err(DomainError::invariant("account requires a password hash"));
        }

        Ok(Self {
            id: AccountId::new(),
            email: new.email.trim().to_string(),
            username: new.username.trim().to_string(),
            first_name: new.first_name.trim().to_string(),
            last_name: new.last_name.trim().to_string(),
            city: new.city.trim().to_string(),
            password_hash,
            role: new.role,
            is_active: true,
            date_joined: now,
            last_login: None,
            session_epoch: 0,
            profile: Profile::default(),
        })
    }

    /// Invalidate every session issued so far.
    pub fn end_sessions(&mut self) {
        self.session_epoch = self.session_epoch.saturating_add(1);
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Apply a partial update, validating every changed field.
    pub fn apply_changes(&mut self, changes: AccountChanges) -> Result<(), DomainError> {
        if let Some(email) = &changes.email {
            validate_email(email)?;
        }
        if let Some(username) = &changes.username {
            validate_username(username)?;
        }

        if let Some(v) = changes.email {
            self.email = v.trim().to_string();
        }
        if let Some(v) = changes.username {
            self.username = v.trim().to_string();
        }
        if let Some(v) = changes.first_name {
            self.first_name = v.trim().to_string();
        }
        if let Some(v) = changes.last_name {
            self.last_name = v.trim().to_string();
        }
        if let Some(v) = changes.city {
            self.city = v.trim().to_string();
        }
        if let Some(v) = changes.role {
            self.role = v;
        }
        if let Some(v) = changes.is_active {
            self.is_active = v;
        }
        if let Some(v) = changes.profile_image {
            self.profile.image = v.filter(|s| !s.trim().is_empty());
        }
        Ok(())
    }
}

/// Admin-side partial update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountChanges {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub city: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub profile_image: Option<Option<String>>,
}

/// Self-service partial update: role and activity are not reachable from here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub city: Option<String>,
    pub image: Option<Option<String>>,
}

impl From<ProfileChanges> for AccountChanges {
    fn from(value: ProfileChanges) -> Self {
        Self {
            email: value.email,
            username: value.username,
            first_name: value.first_name,
            last_name: value.last_name,
            city: value.city,
            role: None,
            is_active: None,
            profile_image: value.image,
        }
    }
}

/// Basic shape check; deliverability is proven by the invite/reset mail itself.
pub fn validate_email(email: &str) -> Result<(), DomainError> {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(DomainError::validation("Enter a valid email address."));
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') || email.len() > 254 {
        return Err(DomainError::validation("Enter a valid email address."));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), DomainError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(DomainError::validation("username cannot be empty"));
    }
    if username.len() > 150 {
        return Err(DomainError::validation(
            "username must be 150 characters or fewer",
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(DomainError::validation(
            "username may contain only letters, digits and @/./+/-/_",
        ));
    }
    Ok(())
}
