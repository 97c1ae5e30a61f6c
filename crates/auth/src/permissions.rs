use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "users.invite").
/// A special wildcard permission `"*"` is granted to administrators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

pub const WILDCARD: Permission = Permission::from_static("*");

/// Admin directory permissions.
pub mod users {
    use super::Permission;

    pub const INVITE: Permission = Permission::from_static("users.invite");
    pub const LIST: Permission = Permission::from_static("users.list");
    pub const READ: Permission = Permission::from_static("users.read");
    pub const CREATE: Permission = Permission::from_static("users.create");
    pub const UPDATE: Permission = Permission::from_static("users.update");
    pub const DELETE: Permission = Permission::from_static("users.delete");
}

/// Self-service permissions held by every signed-in account.
pub mod profile {
    use super::Permission;

    pub const READ: Permission = Permission::from_static("profile.read");
    pub const UPDATE: Permission = Permission::from_static("profile.update");
}

pub const HOME_READ: Permission = Permission::from_static("home.read");
