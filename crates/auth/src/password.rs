//! Password hashing (argon2id, PHC strings) and strength policy.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// One message per failed rule.
    #[error("password rejected: {}", .0.join(" "))]
    Policy(Vec<String>),

    #[error("The two password fields didn't match.")]
    Mismatch,

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Hash a password into a self-describing PHC string.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Check a password against a stored PHC string.
///
/// Malformed hashes never verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Account attributes a password must not resemble.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyContext<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

/// Password strength rules applied before hashing.
pub trait PasswordPolicy: Send + Sync {
    fn validate(&self, password: &str, ctx: &PolicyContext<'_>) -> Result<(), PasswordError>;
}

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "123456", "12345678", "123456789", "1234567890",
    "qwerty", "qwerty123", "abc123", "111111", "letmein", "welcome", "iloveyou", "admin",
    "admin123", "monkey", "dragon", "football", "baseball", "sunshine", "princess", "passw0rd",
    "trustno1", "master", "superman", "starwars", "whatever", "shadow", "1q2w3e4r",
];

/// Minimum length, not entirely numeric, not common, not close to the
/// account's own attributes.
#[derive(Debug, Clone)]
pub struct DefaultPasswordPolicy {
    pub min_length: usize,
}

impl Default for DefaultPasswordPolicy {
    fn default() -> Self {
        Self { min_length: 8 }
    }
}

impl DefaultPasswordPolicy {
    fn too_similar(password: &str, attribute: &str) -> bool {
        let attribute = attribute.trim().to_lowercase();
        if attribute.len() < 3 {
            return false;
        }
        password.contains(&attribute) || attribute.contains(password)
    }
}

impl PasswordPolicy for DefaultPasswordPolicy {
    fn validate(&self, password: &str, ctx: &PolicyContext<'_>) -> Result<(), PasswordError> {
        let mut problems = Vec::new();

        if password.chars().count() < self.min_length {
            problems.push(format!(
                "This password is too short. It must contain at least {} characters.",
                self.min_length
            ));
        }

        if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
            problems.push("This password is entirely numeric.".to_string());
        }

        let lowered = password.to_lowercase();
        if COMMON_PASSWORDS.contains(&lowered.as_str()) {
            problems.push("This password is too common.".to_string());
        }

        let email_local = ctx.email.split('@').next().unwrap_or_default();
        let attributes = [
            ("username", ctx.username),
            ("email address", email_local),
            ("first name", ctx.first_name),
            ("last name", ctx.last_name),
        ];
        if let Some((label, _)) = attributes
            .iter()
            .find(|(_, value)| Self::too_similar(&lowered, value))
        {
            problems.push(format!("The password is too similar to the {label}."));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(PasswordError::Policy(problems))
        }
    }
}
