//! Password reset: request → emailed link → confirm.
//!
//! Nothing is stored between the steps. The token is bound to the account's
//! current password hash, so a completed reset invalidates it.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{instrument, Instrument};

use userdesk_auth::{decode_uid, encode_uid, hash_password, Account, PasswordError, PolicyContext};

use super::AccountServices;
use crate::accounts::RepositoryError;
use crate::mail::OutboundEmail;

#[derive(Debug, Error)]
pub enum ResetError {
    /// Malformed uid, unknown/inactive account, bad signature or expired.
    #[error("password reset link is invalid")]
    InvalidLink,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Reset mails still being sent in the background.
///
/// Dropping it leaves delivery running.
#[derive(Debug)]
pub struct PendingDelivery(Option<JoinHandle<()>>);

impl PendingDelivery {
    /// Wait until every reset mail has been handed to the mailer.
    pub async fn finished(self) {
        if let Some(handle) = self.0 {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "reset mail task failed");
            }
        }
    }
}

impl AccountServices {
    /// Email a reset link to every active account registered under `email`.
    ///
    /// The outcome is the same whether zero or several accounts match. Mail is
    /// handed to a background task so a known address answers as fast as an
    /// unknown one; per-account delivery failures are only logged.
    #[instrument(skip_all, err)]
    pub async fn request_reset(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<PendingDelivery, ResetError> {
        let matches = self.repo.find_by_email(email.trim()).await?;

        let mut outgoing = Vec::new();
        for account in matches.iter().filter(|a| a.is_active && !a.password_hash.is_empty()) {
            let token = match self.resets.make_token(account, now) {
                Ok(token) => token,
                Err(e) => {
                    tracing::error!(account_id = %account.id, error = %e, "failed to make reset token");
                    continue;
                }
            };
            let url = format!("{}/reset/{}/{}/", self.base_url, encode_uid(&account.id), token);
            let body = format!(
                "You're receiving this email because you requested a password reset \
                 for your user account at {site}.\n\n\
                 Please go to the following page and choose a new password:\n\n{url}\n\n\
                 Your username, in case you've forgotten: {username}\n",
                site = self.site_name,
                username = account.username,
            );

            outgoing.push((
                account.id,
                OutboundEmail {
                    subject: format!("Password reset on {}", self.site_name),
                    body,
                    from: self.from_email.clone(),
                    to: vec![account.email.clone()],
                },
            ));
        }

        if outgoing.is_empty() {
            return Ok(PendingDelivery(None));
        }

        let mailer = self.mailer.clone();
        let handle = tokio::spawn(
            async move {
                for (account_id, email) in outgoing {
                    if let Err(e) = mailer.send(email).await {
                        tracing::error!(%account_id, error = %e, "failed to deliver reset email");
                    }
                }
            }
            .in_current_span(),
        );
        Ok(PendingDelivery(Some(handle)))
    }

    /// Resolve a reset link to its account, or reject it.
    pub async fn check_reset_link(
        &self,
        uidb64: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Account, ResetError> {
        let id = decode_uid(uidb64).map_err(|_| ResetError::InvalidLink)?;
        let account = self
            .repo
            .find_by_id(id)
            .await?
            .filter(|a| a.is_active)
            .ok_or(ResetError::InvalidLink)?;

        self.resets
            .check_token(&account, token, now)
            .map_err(|_| ResetError::InvalidLink)?;
        Ok(account)
    }

    /// Set a new password through a reset link.
    #[instrument(skip_all, err)]
    pub async fn confirm_reset(
        &self,
        uidb64: &str,
        token: &str,
        new_password1: &str,
        new_password2: &str,
        now: DateTime<Utc>,
    ) -> Result<Account, ResetError> {
        let mut account = self.check_reset_link(uidb64, token, now).await?;

        if new_password1 != new_password2 {
            return Err(PasswordError::Mismatch.into());
        }
        self.policy.validate(
            new_password1,
            &PolicyContext {
                username: &account.username,
                email: &account.email,
                first_name: &account.first_name,
                last_name: &account.last_name,
            },
        )?;

        account.password_hash = hash_password(new_password1)?;
        account.end_sessions();
        let account = self.repo.update(account).await?;

        tracing::info!(account_id = %account.id, "password reset completed");
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use userdesk_auth::{verify_password, Role};

    use super::*;
    use crate::accounts::AccountRepository;
    use crate::services::testing::{harness, link_in, seed, Harness};

    const NEW_PASSWORD: &str = "Fresh-Lantern-42";

    fn split_link(url: &str) -> (String, String) {
        let path = url.trim_start_matches("http://testserver/reset/");
        let mut parts = path.trim_end_matches('/').splitn(2, '/');
        (
            parts.next().unwrap().to_string(),
            parts.next().unwrap().to_string(),
        )
    }

    async fn request(h: &Harness, email: &str, now: DateTime<Utc>) {
        h.services.request_reset(email, now).await.unwrap().finished().await;
    }

    async fn deactivate(h: &Harness, account: &Account) {
        let mut stored = h.repo.inner.find_by_id(account.id).await.unwrap().unwrap();
        stored.is_active = false;
        h.repo.inner.update(stored).await.unwrap();
    }

    #[tokio::test]
    async fn known_and_unknown_emails_look_the_same() {
        let h = harness();
        let now = Utc::now();
        seed(&h, "erin@example.com", "erin", "Old-Password-1", Role::Customer, now).await;

        let known = h.services.request_reset("ERIN@example.com", now).await;
        let unknown = h.services.request_reset("nobody@example.com", now).await;

        assert!(unknown.is_ok());
        known.unwrap().finished().await;
        assert_eq!(h.mailer.outbox().len(), 1);
        assert_eq!(h.mailer.outbox()[0].subject, "Password reset on userdesk");
    }

    #[tokio::test]
    async fn delivery_failure_is_not_surfaced() {
        let h = harness();
        let now = Utc::now();
        seed(&h, "erin@example.com", "erin", "Old-Password-1", Role::Customer, now).await;
        h.mailer.set_failing(true);

        let pending = h.services.request_reset("erin@example.com", now).await;
        assert!(pending.is_ok());
        pending.unwrap().finished().await;
        assert!(h.mailer.outbox().is_empty());
    }

    #[tokio::test]
    async fn inactive_accounts_get_no_reset_mail() {
        let h = harness();
        let now = Utc::now();
        let erin = seed(&h, "erin@example.com", "erin", "Old-Password-1", Role::Customer, now).await;
        deactivate(&h, &erin).await;

        request(&h, "erin@example.com", now).await;
        assert!(h.mailer.outbox().is_empty());
    }

    #[tokio::test]
    async fn link_stops_working_once_account_is_deactivated() {
        let h = harness();
        let now = Utc::now();
        let erin = seed(&h, "erin@example.com", "erin", "Old-Password-1", Role::Customer, now).await;
        request(&h, "erin@example.com", now).await;
        let (uid, token) = split_link(&link_in(&h.mailer.outbox()[0].body));
        h.services.check_reset_link(&uid, &token, now).await.unwrap();

        deactivate(&h, &erin).await;
        assert!(matches!(
            h.services.check_reset_link(&uid, &token, now).await,
            Err(ResetError::InvalidLink)
        ));
        assert!(matches!(
            h.services
                .confirm_reset(&uid, &token, NEW_PASSWORD, NEW_PASSWORD, now)
                .await,
            Err(ResetError::InvalidLink)
        ));
    }

    #[tokio::test]
    async fn confirm_changes_password_and_burns_token() {
        let h = harness();
        let now = Utc::now();
        seed(&h, "erin@example.com", "erin", "Old-Password-1", Role::Customer, now).await;
        request(&h, "erin@example.com", now).await;

        let link = link_in(&h.mailer.outbox()[0].body);
        let (uid, token) = split_link(&link);

        h.services.check_reset_link(&uid, &token, now).await.unwrap();
        let updated = h
            .services
            .confirm_reset(&uid, &token, NEW_PASSWORD, NEW_PASSWORD, now)
            .await
            .unwrap();
        assert!(verify_password(NEW_PASSWORD, &updated.password_hash));
        assert_eq!(updated.session_epoch, 1);

        let replay = h
            .services
            .confirm_reset(&uid, &token, "Other-Lantern-43", "Other-Lantern-43", now)
            .await;
        assert!(matches!(replay, Err(ResetError::InvalidLink)));
        assert_eq!(h.repo.updates(), 1);
    }

    #[tokio::test]
    async fn mismatch_and_policy_leave_account_untouched() {
        let h = harness();
        let now = Utc::now();
        seed(&h, "erin@example.com", "erin", "Old-Password-1", Role::Customer, now).await;
        request(&h, "erin@example.com", now).await;
        let (uid, token) = split_link(&link_in(&h.mailer.outbox()[0].body));

        let mismatch = h
            .services
            .confirm_reset(&uid, &token, NEW_PASSWORD, "something-else", now)
            .await;
        assert!(matches!(
            mismatch,
            Err(ResetError::Password(PasswordError::Mismatch))
        ));

        let weak = h
            .services
            .confirm_reset(&uid, &token, "erin1234", "erin1234", now)
            .await;
        assert!(matches!(
            weak,
            Err(ResetError::Password(PasswordError::Policy(_)))
        ));
        assert_eq!(h.repo.updates(), 0);
    }

    #[tokio::test]
    async fn expired_or_garbled_links_are_invalid() {
        let h = harness();
        let now = Utc::now();
        seed(&h, "erin@example.com", "erin", "Old-Password-1", Role::Customer, now).await;
        request(&h, "erin@example.com", now).await;
        let (uid, token) = split_link(&link_in(&h.mailer.outbox()[0].body));

        let later = now + Duration::days(3) + Duration::seconds(5);
        assert!(matches!(
            h.services.check_reset_link(&uid, &token, later).await,
            Err(ResetError::InvalidLink)
        ));
        assert!(matches!(
            h.services.check_reset_link("not-base64!", &token, now).await,
            Err(ResetError::InvalidLink)
        ));
        assert!(matches!(
            h.services.check_reset_link(&uid, "1-AAAA", now).await,
            Err(ResetError::InvalidLink)
        ));
    }
}
