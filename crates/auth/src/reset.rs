//! Password-reset tokens.
//!
//! A reset token is `<timestamp base36>-<mac base64url>`. The MAC covers the
//! account id, its current password hash, its last login time and its email,
//! so the token dies as soon as any of them changes. Nothing is stored
//! server-side.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use userdesk_core::AccountId;

use crate::{Account, TokenError};

type HmacSha256 = Hmac<Sha256>;

const KEY_SALT: &[u8] = b"userdesk.auth.reset.ResetTokenGenerator";

/// Seconds are counted from 2001-01-01 to keep the base36 prefix short.
fn reference_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

#[derive(Clone)]
pub struct ResetTokenGenerator {
    key: Vec<u8>,
    timeout: Duration,
}

impl core::fmt::Debug for ResetTokenGenerator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ResetTokenGenerator")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ResetTokenGenerator {
    pub fn new(secret: &[u8], timeout: Duration) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(KEY_SALT);
        hasher.update(secret);
        Self {
            key: hasher.finalize().to_vec(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn make_token(&self, account: &Account, now: DateTime<Utc>) -> Result<String, TokenError> {
        let ts = (now - reference_epoch()).num_seconds();
        if ts < 0 {
            return Err(TokenError::Encoding("clock is before the token epoch".to_string()));
        }
        let mac = self.mac(account, ts)?;
        let sig = mac.finalize().into_bytes();
        Ok(format!("{}-{}", to_base36(ts as u64), URL_SAFE_NO_PAD.encode(sig)))
    }

    /// Verify `token` for `account` as of `now`.
    pub fn check_token(
        &self,
        account: &Account,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(), TokenError> {
        let (ts_b36, sig_b64) = token
            .split_once('-')
            .ok_or_else(|| TokenError::invalid("malformed reset token"))?;

        let ts = i64::from_str_radix(ts_b36, 36)
            .map_err(|_| TokenError::invalid("malformed reset token timestamp"))?;
        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64.as_bytes())
            .map_err(|_| TokenError::invalid("malformed reset token signature"))?;

        self.mac(account, ts)?
            .verify_slice(&sig)
            .map_err(|_| TokenError::invalid("reset token signature mismatch"))?;

        let age = (now - reference_epoch()).num_seconds() - ts;
        if age > self.timeout.num_seconds() {
            return Err(TokenError::Expired);
        }
        Ok(())
    }

    fn mac(&self, account: &Account, ts: i64) -> Result<HmacSha256, TokenError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;
        let last_login = account
            .last_login
            .map(|t| t.timestamp_micros().to_string())
            .unwrap_or_default();

        for part in [
            account.id.to_string(),
            account.password_hash.clone(),
            last_login,
            ts.to_string(),
            account.email.clone(),
        ] {
            mac.update(part.as_bytes());
            // Field separator so adjacent fields cannot bleed into each other.
            mac.update(&[0u8]);
        }
        Ok(mac)
    }
}

/// Encode an account id for the reset URL path.
pub fn encode_uid(id: &AccountId) -> String {
    URL_SAFE_NO_PAD.encode(id.to_string())
}

pub fn decode_uid(uidb64: &str) -> Result<AccountId, TokenError> {
    let raw = URL_SAFE_NO_PAD
        .decode(uidb64.as_bytes())
        .map_err(|_| TokenError::invalid("malformed uid"))?;
    let text = String::from_utf8(raw).map_err(|_| TokenError::invalid("malformed uid"))?;
    text.parse().map_err(|_| TokenError::invalid("malformed uid"))
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NewAccount, Role};

    fn account() -> Account {
        Account::create(
            NewAccount {
                email: "bob@example.com".to_string(),
                username: "bob".to_string(),
                first_name: "Bob".to_string(),
                last_name: String::new(),
                city: String::new(),
                role: Role::Customer,
            },
            "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            Utc::now(),
        )
        .unwrap()
    }

    fn generator() -> ResetTokenGenerator {
        ResetTokenGenerator::new(b"reset-secret", Duration::days(3))
    }

    #[test]
    fn fresh_token_checks_out() {
        let acc = account();
        let now = Utc::now();
        let token = generator().make_token(&acc, now).unwrap();
        assert!(generator().check_token(&acc, &token, now).is_ok());
    }

    #[test]
    fn password_change_invalidates_token() {
        let mut acc = account();
        let now = Utc::now();
        let token = generator().make_token(&acc, now).unwrap();

        acc.password_hash = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$b3RoZXI".to_string();
        assert!(matches!(
            generator().check_token(&acc, &token, now),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn login_invalidates_token() {
        let mut acc = account();
        let now = Utc::now();
        let token = generator().make_token(&acc, now).unwrap();

        acc.last_login = Some(now);
        assert!(generator().check_token(&acc, &token, now).is_err());
    }

    #[test]
    fn token_expires_after_timeout() {
        let acc = account();
        let issued = Utc::now();
        let token = generator().make_token(&acc, issued).unwrap();

        assert!(generator().check_token(&acc, &token, issued + Duration::days(3)).is_ok());
        assert_eq!(
            generator().check_token(&acc, &token, issued + Duration::days(3) + Duration::seconds(2)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn token_is_bound_to_the_account() {
        let acc = account();
        let other = account();
        let now = Utc::now();
        let token = generator().make_token(&acc, now).unwrap();
        assert!(generator().check_token(&other, &token, now).is_err());
    }

    #[test]
    fn malformed_tokens_are_invalid() {
        let acc = account();
        let now = Utc::now();
        for bad in ["", "nodash", "zz-", "-abc", "!!-abc", "1a-***"] {
            assert!(
                matches!(generator().check_token(&acc, bad, now), Err(TokenError::Invalid(_))),
                "{bad} should be invalid"
            );
        }
    }

    #[test]
    fn uid_round_trips_and_rejects_garbage() {
        let id = AccountId::new();
        assert_eq!(decode_uid(&encode_uid(&id)).unwrap(), id);
        assert!(decode_uid("@@@").is_err());
        assert!(decode_uid(&URL_SAFE_NO_PAD.encode("42")).is_err());
    }

    #[test]
    fn base36_matches_known_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
