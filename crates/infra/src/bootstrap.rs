//! Startup wiring: repository selection and first-admin seeding.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use userdesk_auth::{hash_password, Account, NewAccount, Role};

use crate::accounts::{AccountRepository, InMemoryAccountRepository, RepositoryError};
use crate::config::{AppConfig, BootstrapAdmin};

/// Pick the account store: Postgres when `DATABASE_URL` is set (and the
/// feature is on), in-memory otherwise.
pub async fn account_repository(config: &AppConfig) -> anyhow::Result<Arc<dyn AccountRepository>> {
    match &config.database_url {
        #[cfg(feature = "postgres")]
        Some(url) => {
            let repo = crate::accounts::PostgresAccountRepository::connect(url)
                .await
                .context("failed to connect account store")?;
            tracing::info!("using postgres account store");
            Ok(Arc::new(repo))
        }
        #[cfg(not(feature = "postgres"))]
        Some(_) => anyhow::bail!("DATABASE_URL is set but this build lacks the postgres feature"),
        None => {
            tracing::warn!("DATABASE_URL not set; accounts are kept in memory");
            Ok(Arc::new(InMemoryAccountRepository::new()))
        }
    }
}

/// Create the configured admin unless the username is already taken.
///
/// The password skips the strength policy; it is operator-supplied.
pub async fn seed_admin(
    repo: &dyn AccountRepository,
    admin: &BootstrapAdmin,
) -> anyhow::Result<Option<Account>> {
    if repo.find_by_username(&admin.username).await?.is_some() {
        tracing::debug!(username = %admin.username, "bootstrap admin already present");
        return Ok(None);
    }

    let password_hash = hash_password(&admin.password).context("failed to hash bootstrap password")?;
    let account = Account::create(
        NewAccount {
            email: admin.email.clone(),
            username: admin.username.clone(),
            first_name: String::new(),
            last_name: String::new(),
            city: String::new(),
            role: Role::Admin,
        },
        password_hash,
        Utc::now(),
    )
    .context("invalid bootstrap admin")?;

    match repo.create(account).await {
        Ok(account) => {
            tracing::info!(account_id = %account.id, username = %account.username, "bootstrap admin created");
            Ok(Some(account))
        }
        Err(RepositoryError::Uniqueness { field }) => {
            tracing::warn!(field, "bootstrap admin collides with an existing account; skipped");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> BootstrapAdmin {
        BootstrapAdmin {
            email: "ops@example.com".to_string(),
            username: "ops".to_string(),
            password: "Ops-Password-1".to_string(),
        }
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let repo = InMemoryAccountRepository::new();
        let first = seed_admin(&repo, &admin()).await.unwrap();
        assert_eq!(first.map(|a| a.role), Some(Role::Admin));

        let second = seed_admin(&repo, &admin()).await.unwrap();
        assert!(second.is_none());
        assert_eq!(repo.count_by_role(Role::Admin).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn in_memory_store_without_database_url() {
        let config = AppConfig::new("http://localhost", "secret");
        let repo = account_repository(&config).await.unwrap();
        assert!(repo.list().await.unwrap().is_empty());
    }
}
