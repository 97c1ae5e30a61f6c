use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use userdesk_auth::{verify_password, Principal, Role, SessionClaims, TokenError};
use userdesk_core::AccountId;

use super::AccountServices;
use crate::accounts::RepositoryError;

/// Verified against when the username is unknown, so both paths pay for one
/// argon2 verification.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$J2Qm4cC1cO6Q0kM0yq7T3bqkKJm8m0i7o8nq1G7xj1s";

#[derive(Debug, Error)]
pub enum LoginError {
    /// Unknown username, inactive account and wrong password all look alike.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("failed to issue session token: {0}")]
    Token(TokenError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A session token that no longer maps to a usable account.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Account deleted, deactivated or signed out since the token was issued.
    #[error("session has been revoked")]
    Revoked,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub account_id: AccountId,
    pub username: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl AccountServices {
    #[instrument(skip(self, password, now), err)]
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, LoginError> {
        let Some(mut account) = self.repo.find_by_username(username.trim()).await? else {
            let _ = verify_password(password, DUMMY_HASH);
            return Err(LoginError::InvalidCredentials);
        };

        if !verify_password(password, &account.password_hash) || !account.is_active {
            return Err(LoginError::InvalidCredentials);
        }

        let expires_at = now
            .checked_add_signed(self.session_ttl)
            .ok_or_else(|| LoginError::Token(TokenError::Encoding("session expiry out of range".into())))?;

        account.last_login = Some(now);
        let account = self.repo.update(account).await?;

        let token = self
            .sessions
            .issue(account.id, account.role, account.session_epoch, now)
            .map_err(LoginError::Token)?;

        tracing::info!(account_id = %account.id, "login succeeded");
        Ok(Session {
            token,
            account_id: account.id,
            username: account.username,
            role: account.role,
            expires_at,
        })
    }

    /// Resolve verified session claims against the stored account.
    ///
    /// The principal's role is the account's current role, not the one signed
    /// into the token.
    #[instrument(skip_all, fields(account_id = %claims.sub), err)]
    pub async fn resume_session(&self, claims: &SessionClaims) -> Result<Principal, SessionError> {
        let account = self
            .repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(SessionError::Revoked)?;

        if !account.is_active || account.session_epoch != claims.epoch {
            return Err(SessionError::Revoked);
        }
        Ok(Principal::new(account.id, account.role))
    }

    /// End every session of the signed-in account.
    #[instrument(skip_all, fields(account_id = %principal.account_id), err)]
    pub async fn logout(&self, principal: &Principal) -> Result<(), SessionError> {
        let mut account = self
            .repo
            .find_by_id(principal.account_id)
            .await?
            .ok_or(SessionError::Revoked)?;

        account.end_sessions();
        self.repo.update(account).await.map_err(|e| match e {
            RepositoryError::NotFound => SessionError::Revoked,
            other => SessionError::Repository(other),
        })?;

        tracing::info!("signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use userdesk_auth::{JwtValidator, Role};

    use super::*;
    use crate::accounts::AccountRepository;
    use crate::services::testing::{harness, seed};

    #[tokio::test]
    async fn login_issues_a_valid_session() {
        let h = harness();
        let now = Utc::now();
        let acc = seed(&h, "f@example.com", "frank", "Frank-Pass-123", Role::Customer, now).await;

        let session = h.services.login("frank", "Frank-Pass-123", now).await.unwrap();
        let claims = h.services.session_validator().validate(&session.token, now).unwrap();
        assert_eq!(claims.sub, acc.id);
        assert_eq!(claims.role, Role::Customer);

        let stored = h.repo.inner.find_by_id(acc.id).await.unwrap().unwrap();
        assert_eq!(stored.last_login, Some(now));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_are_the_same_error() {
        let h = harness();
        let now = Utc::now();
        seed(&h, "f@example.com", "frank", "Frank-Pass-123", Role::Customer, now).await;

        let wrong = h.services.login("frank", "nope", now).await.unwrap_err();
        let unknown = h.services.login("ghost", "nope", now).await.unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert!(matches!(wrong, LoginError::InvalidCredentials));
        assert!(matches!(unknown, LoginError::InvalidCredentials));
        assert_eq!(h.repo.updates(), 0);
    }

    #[tokio::test]
    async fn oversized_session_ttl_is_an_error_not_a_panic() {
        let h = harness();
        let now = Utc::now();
        seed(&h, "f@example.com", "frank", "Frank-Pass-123", Role::Customer, now).await;

        let mut config = crate::config::AppConfig::new("http://testserver", "test-secret");
        config.session_ttl = chrono::Duration::MAX;
        let services = AccountServices::new(&config, h.repo.clone(), h.mailer.clone());

        let err = services.login("frank", "Frank-Pass-123", now).await.unwrap_err();
        assert!(matches!(err, LoginError::Token(_)));
    }

    #[tokio::test]
    async fn resumed_session_uses_the_stored_role() {
        let h = harness();
        let now = Utc::now();
        let mut acc = seed(&h, "a@example.com", "ann", "Ann-Pass-12345", Role::Admin, now).await;
        let session = h.services.login("ann", "Ann-Pass-12345", now).await.unwrap();
        let claims = h.services.session_validator().validate(&session.token, now).unwrap();

        acc = h.repo.inner.find_by_id(acc.id).await.unwrap().unwrap();
        acc.role = Role::Customer;
        h.repo.inner.update(acc.clone()).await.unwrap();

        let principal = h.services.resume_session(&claims).await.unwrap();
        assert_eq!(principal, Principal::new(acc.id, Role::Customer));
    }

    #[tokio::test]
    async fn deactivated_or_deleted_accounts_lose_their_sessions() {
        let h = harness();
        let now = Utc::now();
        let acc = seed(&h, "a@example.com", "ann", "Ann-Pass-12345", Role::Admin, now).await;
        let session = h.services.login("ann", "Ann-Pass-12345", now).await.unwrap();
        let claims = h.services.session_validator().validate(&session.token, now).unwrap();

        let mut stored = h.repo.inner.find_by_id(acc.id).await.unwrap().unwrap();
        stored.is_active = false;
        h.repo.inner.update(stored).await.unwrap();
        assert!(matches!(
            h.services.resume_session(&claims).await,
            Err(SessionError::Revoked)
        ));

        h.repo.inner.delete(acc.id).await.unwrap();
        assert!(matches!(
            h.services.resume_session(&claims).await,
            Err(SessionError::Revoked)
        ));
    }

    #[tokio::test]
    async fn logout_revokes_earlier_tokens_only() {
        let h = harness();
        let now = Utc::now();
        seed(&h, "f@example.com", "frank", "Frank-Pass-123", Role::Customer, now).await;
        let before = h.services.login("frank", "Frank-Pass-123", now).await.unwrap();
        let before = h.services.session_validator().validate(&before.token, now).unwrap();

        let principal = h.services.resume_session(&before).await.unwrap();
        h.services.logout(&principal).await.unwrap();
        assert!(matches!(
            h.services.resume_session(&before).await,
            Err(SessionError::Revoked)
        ));

        let after = h.services.login("frank", "Frank-Pass-123", now).await.unwrap();
        let after = h.services.session_validator().validate(&after.token, now).unwrap();
        assert_eq!(h.services.resume_session(&after).await.unwrap(), principal);
    }

    #[tokio::test]
    async fn inactive_accounts_cannot_log_in() {
        let h = harness();
        let now = Utc::now();
        let mut acc = seed(&h, "f@example.com", "frank", "Frank-Pass-123", Role::Customer, now).await;
        acc.is_active = false;
        h.repo.inner.update(acc).await.unwrap();

        let err = h.services.login("frank", "Frank-Pass-123", now).await.unwrap_err();
        assert!(matches!(err, LoginError::InvalidCredentials));
    }
}
