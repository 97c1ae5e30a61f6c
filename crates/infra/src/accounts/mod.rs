//! Account persistence.
//!
//! The repository owns uniqueness: email (case-insensitive) and username
//! (exact). Callers never pre-check and then write; they write and map
//! `RepositoryError::Uniqueness`.

use std::sync::Arc;

use thiserror::Error;

use userdesk_auth::{Account, Role};
use userdesk_core::AccountId;

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryAccountRepository;
#[cfg(feature = "postgres")]
pub use postgres::PostgresAccountRepository;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// A unique column already holds this value.
    #[error("{field} already registered")]
    Uniqueness { field: &'static str },

    #[error("account not found")]
    NotFound,

    #[error("repository backend error: {0}")]
    Backend(String),
}

#[async_trait::async_trait]
pub trait AccountRepository: Send + Sync {
    /// All accounts whose email matches case-insensitively.
    async fn find_by_email(&self, email: &str) -> Result<Vec<Account>, RepositoryError>;

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, RepositoryError>;

    /// Every account, oldest first.
    async fn list(&self) -> Result<Vec<Account>, RepositoryError>;

    async fn count_by_role(&self, role: Role) -> Result<u64, RepositoryError>;

    async fn create(&self, account: Account) -> Result<Account, RepositoryError>;

    /// Replace the stored record with the same id.
    async fn update(&self, account: Account) -> Result<Account, RepositoryError>;

    async fn delete(&self, id: AccountId) -> Result<(), RepositoryError>;
}

#[async_trait::async_trait]
impl<R> AccountRepository for Arc<R>
where
    R: AccountRepository + ?Sized,
{
    async fn find_by_email(&self, email: &str) -> Result<Vec<Account>, RepositoryError> {
        (**self).find_by_email(email).await
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        (**self).find_by_id(id).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, RepositoryError> {
        (**self).find_by_username(username).await
    }

    async fn list(&self) -> Result<Vec<Account>, RepositoryError> {
        (**self).list().await
    }

    async fn count_by_role(&self, role: Role) -> Result<u64, RepositoryError> {
        (**self).count_by_role(role).await
    }

    async fn create(&self, account: Account) -> Result<Account, RepositoryError> {
        (**self).create(account).await
    }

    async fn update(&self, account: Account) -> Result<Account, RepositoryError> {
        (**self).update(account).await
    }

    async fn delete(&self, id: AccountId) -> Result<(), RepositoryError> {
        (**self).delete(id).await
    }
}
