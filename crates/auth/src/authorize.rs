use std::collections::HashSet;

use thiserror::Error;

use userdesk_core::AccountId;

use crate::permissions::{self, Permission};
use crate::Role;

/// A signed-in account as seen by authorization decisions.
///
/// Built from the stored account behind a verified session token; never
/// from request bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub account_id: AccountId,
    pub role: Role,
}

impl Principal {
    pub fn new(account_id: AccountId, role: Role) -> Self {
        Self { account_id, role }
    }

    pub fn permissions(&self) -> Vec<Permission> {
        role_permissions(self.role)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Role → permission mapping.
pub fn role_permissions(role: Role) -> Vec<Permission> {
    match role {
        Role::Admin => vec![permissions::WILDCARD],
        Role::Customer => vec![
            permissions::profile::READ,
            permissions::profile::UPDATE,
            permissions::HOME_READ,
        ],
    }
}

/// Authorize a principal for a single permission.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let granted = principal.permissions();
    let perms: HashSet<&str> = granted.iter().map(|p| p.as_str()).collect();

    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}
