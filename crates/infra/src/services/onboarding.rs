//! Invite-and-register.
//!
//! An admin asks for an invite (email + role); the invitee receives a signed
//! link and registers through it. The role of the new account comes from the
//! signed claim and nothing else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use userdesk_auth::account::validate_email;
use userdesk_auth::permissions::users;
use userdesk_auth::{
    authorize, hash_password, Account, AuthzError, InviteClaim, NewAccount, PasswordError,
    PolicyContext, Principal, Role, TokenError,
};
use userdesk_core::DomainError;

use super::AccountServices;
use crate::accounts::RepositoryError;
use crate::mail::{DeliveryError, OutboundEmail};

pub const INVITE_SUBJECT: &str = "Invite to Register";

#[derive(Debug, Error)]
pub enum InviteError {
    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    #[error("{0}")]
    Validation(String),

    #[error("failed to issue invite token: {0}")]
    Encoding(TokenError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Registration form as submitted. There is deliberately no role field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub city: String,
}

/// Submitted values echoed back on rejection (never the password).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationFields {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub city: String,
}

impl From<&RegistrationForm> for RegistrationFields {
    fn from(form: &RegistrationForm) -> Self {
        Self {
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            username: form.username.clone(),
            email: form.email.clone(),
            city: form.city.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("registration requires an invite token")]
    MissingToken,

    #[error("invite token is invalid")]
    TokenInvalid,

    #[error("invite token has expired")]
    TokenExpired,

    #[error("email does not match the invited address")]
    EmailMismatch { fields: RegistrationFields },

    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
        fields: RegistrationFields,
    },

    #[error("{error}")]
    Password {
        #[source]
        error: PasswordError,
        fields: RegistrationFields,
    },

    #[error("{field} already registered")]
    AlreadyRegistered {
        field: &'static str,
        fields: RegistrationFields,
    },

    #[error(transparent)]
    Repository(RepositoryError),
}

impl RegistrationError {
    /// Token-level rejections share one user-facing outcome.
    pub fn is_link_rejection(&self) -> bool {
        matches!(
            self,
            Self::MissingToken | Self::TokenInvalid | Self::TokenExpired
        )
    }
}

impl From<TokenError> for RegistrationError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::TokenExpired,
            TokenError::Invalid(_) | TokenError::Encoding(_) => Self::TokenInvalid,
        }
    }
}

impl AccountServices {
    /// Issue an invite for `email` and mail the registration link to it.
    ///
    /// Returns the registration URL.
    #[instrument(skip_all, fields(role = %role, actor = %principal.account_id), err)]
    pub async fn issue_invite(
        &self,
        principal: &Principal,
        email: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<String, InviteError> {
        authorize(principal, &users::INVITE)?;

        let email = email.trim();
        validate_email(email).map_err(|e| InviteError::Validation(domain_message(e)))?;

        let claim = InviteClaim::new(email, role);
        let token = self
            .invites
            .issue(&claim, now)
            .map_err(InviteError::Encoding)?;
        let url = format!("{}/user/register?token={}", self.base_url, token);

        let hours = self.invites.codec().ttl().num_hours();
        let body = format!(
            "Hi,\n\nYou have been invited to join {site} as {role}.\n\
             Complete your registration here:\n\n{url}\n\n\
             This link expires in {hours} hours.\n",
            site = self.site_name,
        );

        self.mailer
            .send(OutboundEmail {
                subject: INVITE_SUBJECT.to_string(),
                body,
                from: self.from_email.clone(),
                to: vec![email.to_string()],
            })
            .await?;

        tracing::info!(invite_subject = %claim.subject_binding, "invite sent");
        Ok(url)
    }

    /// Validate an invite token and return its claim (registration pre-fill).
    pub fn check_invite(
        &self,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<InviteClaim, RegistrationError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(RegistrationError::MissingToken)?;
        Ok(self.invites.redeem(token, now)?)
    }

    /// Create an account from an invite token and the registration form.
    ///
    /// No account is written unless the token verifies and the submitted
    /// email equals the invited one exactly.
    #[instrument(skip_all, err)]
    pub async fn register(
        &self,
        token: Option<&str>,
        form: RegistrationForm,
        now: DateTime<Utc>,
    ) -> Result<Account, RegistrationError> {
        let claim = self.check_invite(token, now)?;
        let fields = RegistrationFields::from(&form);

        if form.email != claim.email {
            tracing::warn!(invite_subject = %claim.subject_binding, "registration email mismatch");
            return Err(RegistrationError::EmailMismatch { fields });
        }

        let ctx = PolicyContext {
            username: &form.username,
            email: &form.email,
            first_name: &form.first_name,
            last_name: &form.last_name,
        };
        if let Err(error) = self.policy.validate(&form.password, &ctx) {
            return Err(RegistrationError::Password { error, fields });
        }
        let password_hash = hash_password(&form.password).map_err(|error| {
            RegistrationError::Password {
                error,
                fields: fields.clone(),
            }
        })?;

        let account = Account::create(
            NewAccount {
                email: form.email,
                username: form.username,
                first_name: form.first_name,
                last_name: form.last_name,
                city: form.city,
                role: claim.role,
            },
            password_hash,
            now,
        )
        .map_err(|e| RegistrationError::Validation {
            field: validation_field(&e),
            message: domain_message(e),
            fields: fields.clone(),
        })?;

        let account = self.repo.create(account).await.map_err(|e| match e {
            RepositoryError::Uniqueness { field } => {
                RegistrationError::AlreadyRegistered { field, fields }
            }
            other => RegistrationError::Repository(other),
        })?;

        tracing::info!(account_id = %account.id, role = %account.role, "account registered from invite");
        Ok(account)
    }
}

pub(crate) fn domain_message(err: DomainError) -> String {
    match err {
        DomainError::Validation(msg)
        | DomainError::InvariantViolation(msg)
        | DomainError::InvalidId(msg) => msg,
        DomainError::NotFound => "not found".to_string(),
    }
}

fn validation_field(err: &DomainError) -> &'static str {
    match err {
        DomainError::Validation(msg) if msg.contains("email") => "email",
        DomainError::Validation(msg) if msg.contains("username") => "username",
        _ => "__all__",
    }
}
