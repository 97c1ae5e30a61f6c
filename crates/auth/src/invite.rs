//! Invite tokens: a signed `{email, role}` pair addressed to someone without
//! an account.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use userdesk_core::InviteSubject;

use crate::{Role, TokenCodec, TokenError, TokenPurpose};

const EMAIL_CLAIM: &str = "email";
const ROLE_CLAIM: &str = "role";

/// Claims carried by an invite token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteClaim {
    /// The address the registrant must submit, byte for byte.
    pub email: String,
    pub role: Role,
    pub subject_binding: InviteSubject,
}

impl InviteClaim {
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            role,
            subject_binding: InviteSubject::new(),
        }
    }

    pub fn to_claims(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (EMAIL_CLAIM.to_string(), self.email.clone()),
            (ROLE_CLAIM.to_string(), self.role.as_str().to_string()),
        ])
    }
}

/// Issues and redeems invite tokens.
#[derive(Debug, Clone)]
pub struct InviteTokens {
    codec: TokenCodec,
}

impl InviteTokens {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            codec: TokenCodec::new(secret, TokenPurpose::Invite, ttl),
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn issue(&self, claim: &InviteClaim, now: DateTime<Utc>) -> Result<String, TokenError> {
        self.codec
            .issue(&claim.subject_binding.to_string(), &claim.to_claims(), now)
    }

    /// Verify the token and extract its claims.
    ///
    /// A token that verifies but lacks a well-formed email/role pair is
    /// treated as invalid.
    pub fn redeem(&self, token: &str, now: DateTime<Utc>) -> Result<InviteClaim, TokenError> {
        let decoded = self.codec.validate_and_decode(token, now)?;

        let email = decoded
            .claim(EMAIL_CLAIM)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| TokenError::invalid("invite token has no email"))?
            .to_string();
        let role: Role = decoded
            .claim(ROLE_CLAIM)
            .ok_or_else(|| TokenError::invalid("invite token has no role"))?
            .parse()
            .map_err(|_| TokenError::invalid("invite role is unknown"))?;
        let subject_binding: InviteSubject = decoded
            .subject
            .parse()
            .map_err(|_| TokenError::invalid("invite subject is malformed"))?;

        Ok(InviteClaim {
            email,
            role,
            subject_binding,
        })
    }
}
