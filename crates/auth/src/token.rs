//! HS256 token codec.
//!
//! Every token carries a purpose tag (`typ`) so a token minted for one flow
//! (e.g. an invite) is rejected by every other flow (e.g. session auth), even
//! though they share the process-wide secret.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::claims::{validate_window, TokenValidationError};

/// Registered claim names; application claims may not shadow them.
pub const RESERVED_CLAIMS: &[&str] = &["sub", "typ", "iat", "exp", "nbf", "jti", "iss", "aud"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Bad signature, malformed structure, wrong purpose or not-yet-valid.
    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("token has expired")]
    Expired,

    /// A claim could not be represented in the token.
    #[error("token encoding failed: {0}")]
    Encoding(String),
}

impl TokenError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

impl From<TokenValidationError> for TokenError {
    fn from(value: TokenValidationError) -> Self {
        match value {
            TokenValidationError::Expired => TokenError::Expired,
            other => TokenError::Invalid(other.to_string()),
        }
    }
}

/// Which flow a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    Invite,
    Session,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::Invite => "invite",
            TokenPurpose::Session => "session",
        }
    }
}

/// Verified token contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    pub subject: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub claims: BTreeMap<String, String>,
}

impl DecodedToken {
    pub fn claim(&self, name: &str) -> Option<&str> {
        self.claims.get(name).map(String::as_str)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    sub: String,
    typ: String,
    iat: i64,
    exp: i64,
    #[serde(flatten)]
    claims: BTreeMap<String, String>,
}

/// Signs and verifies compact tokens carrying a small string→string claim map.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    purpose: TokenPurpose,
    ttl: Duration,
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("purpose", &self.purpose)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8], purpose: TokenPurpose, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            purpose,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign `claims` for `subject`, valid from `now` for the codec's TTL.
    ///
    /// Same inputs produce the same token.
    pub fn issue(
        &self,
        subject: &str,
        claims: &BTreeMap<String, String>,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        if let Some(key) = claims
            .keys()
            .find(|k| k.is_empty() || RESERVED_CLAIMS.contains(&k.as_str()))
        {
            return Err(TokenError::Encoding(format!(
                "claim name '{key}' is empty or reserved"
            )));
        }

        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Encoding("token expiry out of range".to_string()))?;
        let wire = WireClaims {
            sub: subject.to_string(),
            typ: self.purpose.as_str().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            claims: claims.clone(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &wire, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify signature, purpose and validity window; return the claims.
    pub fn validate_and_decode(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<DecodedToken, TokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::invalid("empty token"));
        }

        // Expiry is checked below against the caller's clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<WireClaims>(token, &self.decoding, &validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        let wire = data.claims;

        if wire.typ != self.purpose.as_str() {
            return Err(TokenError::Invalid(format!(
                "token purpose '{}' does not match '{}'",
                wire.typ,
                self.purpose.as_str()
            )));
        }

        let issued_at = DateTime::<Utc>::from_timestamp(wire.iat, 0)
            .ok_or_else(|| TokenError::invalid("issued-at out of range"))?;
        let expires_at = DateTime::<Utc>::from_timestamp(wire.exp, 0)
            .ok_or_else(|| TokenError::invalid("expiry out of range"))?;

        validate_window(issued_at, expires_at, now)?;

        Ok(DecodedToken {
            subject: wire.sub,
            issued_at,
            expires_at,
            claims: wire.claims,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(purpose: TokenPurpose) -> TokenCodec {
        TokenCodec::new(b"test-secret", purpose, Duration::minutes(10))
    }

    fn claims() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("email".to_string(), "a@x.com".to_string()),
            ("role".to_string(), "customer".to_string()),
        ])
    }

    // Whole seconds, the resolution tokens carry.
    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(Utc::now().timestamp(), 0).unwrap()
    }

    #[test]
    fn issue_then_decode_returns_claims() {
        let codec = codec(TokenPurpose::Invite);
        let now = now();
        let token = codec.issue("subject-1", &claims(), now).unwrap();

        let decoded = codec.validate_and_decode(&token, now).unwrap();
        assert_eq!(decoded.subject, "subject-1");
        assert_eq!(decoded.claims, claims());
        assert_eq!(decoded.issued_at, now);
        assert_eq!(decoded.expires_at, now + Duration::minutes(10));
    }

    #[test]
    fn issue_is_deterministic() {
        let codec = codec(TokenPurpose::Invite);
        let now = now();
        assert_eq!(
            codec.issue("s", &claims(), now).unwrap(),
            codec.issue("s", &claims(), now).unwrap()
        );
    }

    #[test]
    fn reserved_claim_names_are_encoding_errors() {
        let codec = codec(TokenPurpose::Invite);
        let mut bad = claims();
        bad.insert("exp".to_string(), "never".to_string());
        assert!(matches!(
            codec.issue("s", &bad, now()),
            Err(TokenError::Encoding(_))
        ));
    }

    #[test]
    fn unrepresentable_expiry_is_an_encoding_error() {
        let codec = TokenCodec::new(b"test-secret", TokenPurpose::Invite, Duration::MAX);
        assert!(matches!(
            codec.issue("s", &claims(), now()),
            Err(TokenError::Encoding(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let codec = codec(TokenPurpose::Invite);
        let issued = now();
        let token = codec.issue("s", &claims(), issued).unwrap();

        let later = issued + Duration::minutes(10);
        assert_eq!(codec.validate_and_decode(&token, later), Err(TokenError::Expired));
    }

    #[test]
    fn tampered_payload_is_invalid() {
        let codec = codec(TokenPurpose::Invite);
        let now = now();
        let token = codec.issue("s", &claims(), now).unwrap();

        let forged = codec
            .issue("s", &BTreeMap::from([("role".to_string(), "admin".to_string())]), now)
            .unwrap();
        let forged_payload = forged.split('.').nth(1).unwrap();

        // Original header and signature around a different payload.
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = forged_payload;
        let tampered = parts.join(".");

        assert!(matches!(
            codec.validate_and_decode(&tampered, now),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let now = now();
        let token = codec(TokenPurpose::Invite).issue("s", &claims(), now).unwrap();
        let other = TokenCodec::new(b"other-secret", TokenPurpose::Invite, Duration::minutes(10));
        assert!(matches!(
            other.validate_and_decode(&token, now),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn purpose_mismatch_is_invalid() {
        let now = now();
        let token = codec(TokenPurpose::Invite).issue("s", &claims(), now).unwrap();
        assert!(matches!(
            codec(TokenPurpose::Session).validate_and_decode(&token, now),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        let codec = codec(TokenPurpose::Invite);
        assert!(matches!(
            codec.validate_and_decode("not.a.jwt", now()),
            Err(TokenError::Invalid(_))
        ));
        assert!(matches!(
            codec.validate_and_decode("   ", now()),
            Err(TokenError::Invalid(_))
        ));
    }
}
