use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use userdesk_core::AccountId;

use crate::Role;

/// Session claims model (transport-agnostic).
///
/// This is the minimal set of claims expected once a session token has been
/// decoded/verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the signed-in account.
    pub sub: AccountId,

    /// Role of the account at login time.
    pub role: Role,

    /// Account session epoch the token was issued under.
    pub epoch: i64,

    /// Issued-at timestamp.
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate a token's validity window.
///
/// Note: this validates the *window* only. Signature verification happens in
/// [`crate::TokenCodec`].
pub fn validate_window(
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), TokenValidationError> {
    if expires_at <= issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn window_boundaries() {
        let iat = Utc::now();
        let exp = iat + Duration::minutes(5);

        assert_eq!(validate_window(iat, exp, iat), Ok(()));
        assert_eq!(
            validate_window(iat, exp, exp),
            Err(TokenValidationError::Expired)
        );
        assert_eq!(
            validate_window(iat, exp, iat - Duration::seconds(1)),
            Err(TokenValidationError::NotYetValid)
        );
        assert_eq!(
            validate_window(exp, iat, iat),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }
}
