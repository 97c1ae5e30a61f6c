//! Admin user directory, profile self-service and home statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use userdesk_auth::permissions::{self, users};
use userdesk_auth::{
    authorize, hash_password, Account, AccountChanges, AuthzError, NewAccount, PasswordError,
    PolicyContext, Principal, ProfileChanges, Role,
};
use userdesk_core::{AccountId, DomainError};

use super::onboarding::domain_message;
use super::AccountServices;
use crate::accounts::RepositoryError;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    #[error("user not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("{field} already registered")]
    Conflict { field: &'static str },

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for DirectoryError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Uniqueness { field } => Self::Conflict { field },
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

impl From<DomainError> for DirectoryError {
    fn from(err: DomainError) -> Self {
        Self::Validation(domain_message(err))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HomeStats {
    pub admin_count: u64,
    pub customer_count: u64,
}

/// Admin-side account creation (role and password chosen by the admin).
#[derive(Debug, Clone, Deserialize)]
pub struct NewUserForm {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub city: String,
    pub role: Role,
    pub password: String,
}

impl AccountServices {
    pub async fn home_stats(&self, principal: &Principal) -> Result<HomeStats, DirectoryError> {
        authorize(principal, &permissions::HOME_READ)?;
        Ok(HomeStats {
            admin_count: self.repo.count_by_role(Role::Admin).await?,
            customer_count: self.repo.count_by_role(Role::Customer).await?,
        })
    }

    pub async fn list_users(&self, principal: &Principal) -> Result<Vec<Account>, DirectoryError> {
        authorize(principal, &users::LIST)?;
        Ok(self.repo.list().await?)
    }

    pub async fn get_user(
        &self,
        principal: &Principal,
        id: AccountId,
    ) -> Result<Account, DirectoryError> {
        authorize(principal, &users::READ)?;
        self.repo.find_by_id(id).await?.ok_or(DirectoryError::NotFound)
    }

    #[instrument(skip_all, fields(actor = %principal.account_id), err)]
    pub async fn create_user(
        &self,
        principal: &Principal,
        form: NewUserForm,
        now: DateTime<Utc>,
    ) -> Result<Account, DirectoryError> {
        authorize(principal, &users::CREATE)?;

        self.policy.validate(
            &form.password,
            &PolicyContext {
                username: &form.username,
                email: &form.email,
                first_name: &form.first_name,
                last_name: &form.last_name,
            },
        )?;
        let password_hash = hash_password(&form.password)?;

        let account = Account::create(
            NewAccount {
                email: form.email,
                username: form.username,
                first_name: form.first_name,
                last_name: form.last_name,
                city: form.city,
                role: form.role,
            },
            password_hash,
            now,
        )?;
        let account = self.repo.create(account).await?;

        tracing::info!(account_id = %account.id, role = %account.role, "account created by admin");
        Ok(account)
    }

    #[instrument(skip(self, principal, changes), fields(actor = %principal.account_id), err)]
    pub async fn update_user(
        &self,
        principal: &Principal,
        id: AccountId,
        changes: AccountChanges,
    ) -> Result<Account, DirectoryError> {
        authorize(principal, &users::UPDATE)?;

        let mut account = self.repo.find_by_id(id).await?.ok_or(DirectoryError::NotFound)?;
        account.apply_changes(changes)?;
        Ok(self.repo.update(account).await?)
    }

    #[instrument(skip(self, principal), fields(actor = %principal.account_id), err)]
    pub async fn delete_user(
        &self,
        principal: &Principal,
        id: AccountId,
    ) -> Result<Account, DirectoryError> {
        authorize(principal, &users::DELETE)?;

        let account = self.repo.find_by_id(id).await?.ok_or(DirectoryError::NotFound)?;
        self.repo.delete(id).await?;
        Ok(account)
    }

    pub async fn profile(&self, principal: &Principal) -> Result<Account, DirectoryError> {
        authorize(principal, &permissions::profile::READ)?;
        self.repo
            .find_by_id(principal.account_id)
            .await?
            .ok_or(DirectoryError::NotFound)
    }

    /// Self-service update; role and activity are out of reach by type.
    #[instrument(skip_all, fields(actor = %principal.account_id), err)]
    pub async fn update_profile(
        &self,
        principal: &Principal,
        changes: ProfileChanges,
    ) -> Result<Account, DirectoryError> {
        authorize(principal, &permissions::profile::UPDATE)?;

        let mut account = self
            .repo
            .find_by_id(principal.account_id)
            .await?
            .ok_or(DirectoryError::NotFound)?;
        account.apply_changes(changes.into())?;
        Ok(self.repo.update(account).await?)
    }
}
