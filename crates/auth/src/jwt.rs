//! Session tokens (bearer JWTs issued at login).

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use userdesk_core::AccountId;

use crate::{Role, SessionClaims, TokenCodec, TokenError, TokenPurpose};

/// Validates bearer session tokens for the HTTP layer.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError>;
}

/// HS256 session token issuer/validator.
#[derive(Debug, Clone)]
pub struct Hs256JwtValidator {
    codec: TokenCodec,
}

impl Hs256JwtValidator {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            codec: TokenCodec::new(secret, TokenPurpose::Session, ttl),
        }
    }

    pub fn issue(
        &self,
        account_id: AccountId,
        role: Role,
        epoch: i64,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = BTreeMap::from([
            ("role".to_string(), role.as_str().to_string()),
            ("epoch".to_string(), epoch.to_string()),
        ]);
        self.codec.issue(&account_id.to_string(), &claims, now)
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let decoded = self.codec.validate_and_decode(token, now)?;

        let sub: AccountId = decoded
            .subject
            .parse()
            .map_err(|_| TokenError::invalid("session subject is not an account id"))?;
        let role: Role = decoded
            .claim("role")
            .ok_or_else(|| TokenError::invalid("session token has no role"))?
            .parse()
            .map_err(|_| TokenError::invalid("session role is unknown"))?;
        let epoch: i64 = decoded
            .claim("epoch")
            .ok_or_else(|| TokenError::invalid("session token has no epoch"))?
            .parse()
            .map_err(|_| TokenError::invalid("session epoch is not a number"))?;

        Ok(SessionClaims {
            sub,
            role,
            epoch,
            issued_at: decoded.issued_at,
            expires_at: decoded.expires_at,
        })
    }
}
