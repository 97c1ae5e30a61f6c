//! Application services: the flows the HTTP layer drives.
//!
//! Every method takes `now` explicitly so token windows are testable.

use std::sync::Arc;

use chrono::Duration;
use userdesk_auth::{
    DefaultPasswordPolicy, Hs256JwtValidator, InviteTokens, PasswordPolicy, ResetTokenGenerator,
};

use crate::accounts::AccountRepository;
use crate::config::AppConfig;
use crate::mail::Mailer;

pub mod directory;
pub mod login;
pub mod onboarding;
pub mod password_reset;

pub use directory::{DirectoryError, HomeStats, NewUserForm};
pub use login::{LoginError, Session, SessionError};
pub use onboarding::{InviteError, RegistrationError, RegistrationFields, RegistrationForm};
pub use password_reset::{PendingDelivery, ResetError};

pub const REGISTRATION_EXPIRED_MESSAGE: &str = "The registration link has expired.";
pub const RESET_LINK_INVALID_MESSAGE: &str =
    "The password reset link was invalid, possibly because it has already been used.";

/// Shared handle over the repository, the mailer and the token schemes.
#[derive(Clone)]
pub struct AccountServices {
    repo: Arc<dyn AccountRepository>,
    mailer: Arc<dyn Mailer>,
    invites: InviteTokens,
    resets: ResetTokenGenerator,
    sessions: Arc<Hs256JwtValidator>,
    session_ttl: Duration,
    policy: Arc<dyn PasswordPolicy>,
    base_url: String,
    from_email: String,
    site_name: String,
}

impl AccountServices {
    pub fn new(
        config: &AppConfig,
        repo: Arc<dyn AccountRepository>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let secret = config.token_secret.as_bytes();
        Self {
            repo,
            mailer,
            invites: InviteTokens::new(secret, config.invite_ttl),
            resets: ResetTokenGenerator::new(secret, config.reset_timeout),
            sessions: Arc::new(Hs256JwtValidator::new(secret, config.session_ttl)),
            session_ttl: config.session_ttl,
            policy: Arc::new(DefaultPasswordPolicy::default()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            from_email: config.default_from_email.clone(),
            site_name: config.site_name.clone(),
        }
    }

    /// Validator for bearer session tokens (shared with the HTTP middleware).
    pub fn session_validator(&self) -> Arc<Hs256JwtValidator> {
        self.sessions.clone()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::{DateTime, Utc};
    use userdesk_auth::{hash_password, Account, NewAccount, Role};
    use userdesk_core::AccountId;

    use super::AccountServices;
    use crate::accounts::{AccountRepository, InMemoryAccountRepository, RepositoryError};
    use crate::config::AppConfig;
    use crate::mail::MemoryMailer;

    /// Wraps the in-memory store and counts writes.
    #[derive(Default)]
    pub struct CountingRepository {
        pub inner: InMemoryAccountRepository,
        pub creates: AtomicUsize,
        pub updates: AtomicUsize,
    }

    impl CountingRepository {
        pub fn creates(&self) -> usize {
            self.creates.load(Ordering::SeqCst)
        }

        pub fn updates(&self) -> usize {
            self.updates.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl AccountRepository for CountingRepository {
        async fn find_by_email(&self, email: &str) -> Result<Vec<Account>, RepositoryError> {
            self.inner.find_by_email(email).await
        }

        async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
            self.inner.find_by_id(id).await
        }

        async fn find_by_username(
            &self,
            username: &str,
        ) -> Result<Option<Account>, RepositoryError> {
            self.inner.find_by_username(username).await
        }

        async fn list(&self) -> Result<Vec<Account>, RepositoryError> {
            self.inner.list().await
        }

        async fn count_by_role(&self, role: Role) -> Result<u64, RepositoryError> {
            self.inner.count_by_role(role).await
        }

        async fn create(&self, account: Account) -> Result<Account, RepositoryError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            self.inner.create(account).await
        }

        async fn update(&self, account: Account) -> Result<Account, RepositoryError> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            self.inner.update(account).await
        }

        async fn delete(&self, id: AccountId) -> Result<(), RepositoryError> {
            self.inner.delete(id).await
        }
    }

    pub struct Harness {
        pub services: AccountServices,
        pub repo: Arc<CountingRepository>,
        pub mailer: Arc<MemoryMailer>,
    }

    pub fn harness() -> Harness {
        let config = AppConfig::new("http://testserver", "test-secret");
        let repo = Arc::new(CountingRepository::default());
        let mailer = Arc::new(MemoryMailer::new());
        let services = AccountServices::new(&config, repo.clone(), mailer.clone());
        Harness {
            services,
            repo,
            mailer,
        }
    }

    /// Insert an account directly, bypassing the write counters.
    pub async fn seed(
        harness: &Harness,
        email: &str,
        username: &str,
        password: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Account {
        let account = Account::create(
            NewAccount {
                email: email.to_string(),
                username: username.to_string(),
                first_name: "Seed".to_string(),
                last_name: "Account".to_string(),
                city: String::new(),
                role,
            },
            hash_password(password).unwrap(),
            now,
        )
        .unwrap();
        harness.repo.inner.create(account).await.unwrap()
    }

    /// Pull the single `http://testserver/...` link out of a mail body.
    pub fn link_in(body: &str) -> String {
        body.split_whitespace()
            .find(|w| w.starts_with("http://testserver/"))
            .unwrap()
            .to_string()
    }
}
