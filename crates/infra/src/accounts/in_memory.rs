use std::collections::HashMap;
use std::sync::RwLock;

use userdesk_auth::{Account, Role};
use userdesk_core::AccountId;

use super::{AccountRepository, RepositoryError};

/// In-memory account store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAccountRepository {
    inner: RwLock<HashMap<AccountId, Account>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> RepositoryError {
        RepositoryError::Backend("account store lock poisoned".to_string())
    }

    /// Uniqueness against every record except `except`.
    fn check_unique(
        map: &HashMap<AccountId, Account>,
        candidate: &Account,
        except: Option<AccountId>,
    ) -> Result<(), RepositoryError> {
        for existing in map.values() {
            if Some(existing.id) == except {
                continue;
            }
            if existing.email.eq_ignore_ascii_case(&candidate.email) {
                return Err(RepositoryError::Uniqueness { field: "email" });
            }
            if existing.username == candidate.username {
                return Err(RepositoryError::Uniqueness { field: "username" });
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_email(&self, email: &str) -> Result<Vec<Account>, RepositoryError> {
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        let mut found: Vec<Account> = map
            .values()
            .filter(|a| a.email.eq_ignore_ascii_case(email))
            .cloned()
            .collect();
        found.sort_by_key(|a| a.date_joined);
        Ok(found)
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, RepositoryError> {
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(map.values().find(|a| a.username == username).cloned())
    }

    async fn list(&self) -> Result<Vec<Account>, RepositoryError> {
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        let mut all: Vec<Account> = map.values().cloned().collect();
        all.sort_by(|a, b| a.date_joined.cmp(&b.date_joined).then(a.id.as_uuid().cmp(b.id.as_uuid())));
        Ok(all)
    }

    async fn count_by_role(&self, role: Role) -> Result<u64, RepositoryError> {
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(map.values().filter(|a| a.role == role).count() as u64)
    }

    async fn create(&self, account: Account) -> Result<Account, RepositoryError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        if map.contains_key(&account.id) {
            return Err(RepositoryError::Uniqueness { field: "id" });
        }
        Self::check_unique(&map, &account, None)?;
        map.insert(account.id, account.clone());
        Ok(account)
    }

    async fn update(&self, account: Account) -> Result<Account, RepositoryError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        if !map.contains_key(&account.id) {
            return Err(RepositoryError::NotFound);
        }
        Self::check_unique(&map, &account, Some(account.id))?;
        map.insert(account.id, account.clone());
        Ok(account)
    }

    async fn delete(&self, id: AccountId) -> Result<(), RepositoryError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        map.remove(&id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use userdesk_auth::NewAccount;

    use super::*;

    fn account(email: &str, username: &str, role: Role) -> Account {
        Account::create(
            NewAccount {
                email: email.to_string(),
                username: username.to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                city: String::new(),
                role,
            },
            "$argon2id$placeholder".to_string(),
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn email_uniqueness_ignores_case() {
        let repo = InMemoryAccountRepository::new();
        repo.create(account("bob@example.com", "bob", Role::Customer))
            .await
            .unwrap();

        let err = repo
            .create(account("BOB@example.com", "bobby", Role::Customer))
            .await
            .unwrap_err();
        assert_eq!(err, RepositoryError::Uniqueness { field: "email" });

        let found = repo.find_by_email("Bob@Example.com").await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn username_uniqueness_on_update() {
        let repo = InMemoryAccountRepository::new();
        repo.create(account("a@example.com", "alice", Role::Admin))
            .await
            .unwrap();
        let mut bob = repo
            .create(account("b@example.com", "bob", Role::Customer))
            .await
            .unwrap();

        bob.username = "alice".to_string();
        let err = repo.update(bob.clone()).await.unwrap_err();
        assert_eq!(err, RepositoryError::Uniqueness { field: "username" });

        // Updating a record to its own values is fine.
        bob.username = "bob".to_string();
        bob.city = "Multan".to_string();
        assert_eq!(repo.update(bob).await.unwrap().city, "Multan");
    }

    #[tokio::test]
    async fn counts_and_delete() {
        let repo = InMemoryAccountRepository::new();
        let admin = repo
            .create(account("a@example.com", "admin", Role::Admin))
            .await
            .unwrap();
        repo.create(account("c@example.com", "carol", Role::Customer))
            .await
            .unwrap();

        assert_eq!(repo.count_by_role(Role::Admin).await.unwrap(), 1);
        assert_eq!(repo.count_by_role(Role::Customer).await.unwrap(), 1);

        repo.delete(admin.id).await.unwrap();
        assert_eq!(repo.delete(admin.id).await, Err(RepositoryError::NotFound));
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }
}
