//! Process configuration, loaded once at startup from environment variables.
//!
//! | variable | default |
//! |---|---|
//! | `BIND_ADDR` | `0.0.0.0:8080` |
//! | `BASE_URL` | `http://localhost:8080` |
//! | `TOKEN_SECRET` | insecure dev value (warns) |
//! | `DEFAULT_FROM_EMAIL` | `webmaster@localhost` |
//! | `SITE_NAME` | `userdesk` |
//! | `INVITE_TTL_SECS` | `259200` (3 days) |
//! | `SESSION_TTL_SECS` | `3600` |
//! | `PASSWORD_RESET_TIMEOUT_SECS` | `259200` (3 days) |
//! | `MAIL_BACKEND` | `log` (`log` or `http`) |
//! | `MAIL_RELAY_URL`, `MAIL_RELAY_API_KEY` | required for `http` |
//! | `DATABASE_URL` | unset: in-memory accounts |
//! | `BOOTSTRAP_ADMIN_EMAIL`, `_USERNAME`, `_PASSWORD` | unset: no seeding |
//!
//! Every `*_SECS` value must lie in `1..=MAX_TTL_SECS` (one year).

use chrono::Duration;
use thiserror::Error;

const DEV_TOKEN_SECRET: &str = "dev-secret-change-me";

/// Upper bound for every configured lifetime.
pub const MAX_TTL_SECS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Where outbound mail goes.
#[derive(Clone, PartialEq, Eq)]
pub enum MailConfig {
    /// Write a log line per message (dev).
    Log,
    /// POST each message to a JSON mail relay.
    Http { relay_url: String, api_key: String },
}

impl core::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MailConfig::Log => f.write_str("Log"),
            MailConfig::Http { relay_url, .. } => f
                .debug_struct("Http")
                .field("relay_url", relay_url)
                .field("api_key", &"<redacted>")
                .finish(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub email: String,
    pub username: String,
    pub password: String,
}

impl core::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Public origin used to build emailed links (no trailing slash).
    pub base_url: String,
    pub token_secret: String,
    pub default_from_email: String,
    pub site_name: String,
    pub invite_ttl: Duration,
    pub session_ttl: Duration,
    pub reset_timeout: Duration,
    pub mail: MailConfig,
    pub database_url: Option<String>,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("base_url", &self.base_url)
            .field("token_secret", &"<redacted>")
            .field("default_from_email", &self.default_from_email)
            .field("site_name", &self.site_name)
            .field("invite_ttl", &self.invite_ttl)
            .field("session_ttl", &self.session_ttl)
            .field("reset_timeout", &self.reset_timeout)
            .field("mail", &self.mail)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("bootstrap_admin", &self.bootstrap_admin)
            .finish()
    }
}

impl AppConfig {
    /// Defaults for everything except the public origin and the secret.
    pub fn new(base_url: impl Into<String>, token_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token_secret: token_secret.into(),
            default_from_email: "webmaster@localhost".to_string(),
            site_name: "userdesk".to_string(),
            invite_ttl: Duration::days(3),
            session_ttl: Duration::hours(1),
            reset_timeout: Duration::days(3),
            mail: MailConfig::Log,
            database_url: None,
            bootstrap_admin: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source (env, tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let token_secret = get("TOKEN_SECRET").unwrap_or_else(|| {
            tracing::warn!("TOKEN_SECRET not set; using insecure dev default");
            DEV_TOKEN_SECRET.to_string()
        });

        let mut cfg = Self::new(
            get("BASE_URL").unwrap_or_else(|| "http://localhost:8080".to_string()),
            token_secret,
        );

        if let Some(v) = get("BIND_ADDR") {
            cfg.bind_addr = v;
        }
        if let Some(v) = get("DEFAULT_FROM_EMAIL") {
            cfg.default_from_email = v;
        }
        if let Some(v) = get("SITE_NAME") {
            cfg.site_name = v;
        }
        if let Some(v) = get("INVITE_TTL_SECS") {
            cfg.invite_ttl = parse_secs("INVITE_TTL_SECS", &v)?;
        }
        if let Some(v) = get("SESSION_TTL_SECS") {
            cfg.session_ttl = parse_secs("SESSION_TTL_SECS", &v)?;
        }
        if let Some(v) = get("PASSWORD_RESET_TIMEOUT_SECS") {
            cfg.reset_timeout = parse_secs("PASSWORD_RESET_TIMEOUT_SECS", &v)?;
        }

        cfg.mail = match get("MAIL_BACKEND").as_deref() {
            None | Some("log") => MailConfig::Log,
            Some("http") => MailConfig::Http {
                relay_url: get("MAIL_RELAY_URL").ok_or(ConfigError::Missing("MAIL_RELAY_URL"))?,
                api_key: get("MAIL_RELAY_API_KEY")
                    .ok_or(ConfigError::Missing("MAIL_RELAY_API_KEY"))?,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "MAIL_BACKEND",
                    reason: format!("unknown backend '{other}' (expected log or http)"),
                });
            }
        };

        cfg.database_url = get("DATABASE_URL");

        cfg.bootstrap_admin = match (
            get("BOOTSTRAP_ADMIN_EMAIL"),
            get("BOOTSTRAP_ADMIN_USERNAME"),
            get("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(username), Some(password)) => Some(BootstrapAdmin {
                email,
                username,
                password,
            }),
            (None, None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    key: "BOOTSTRAP_ADMIN_EMAIL",
                    reason: "email, username and password must be set together".to_string(),
                });
            }
        };

        Ok(cfg)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.token_secret == DEV_TOKEN_SECRET
    }
}

fn parse_secs(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: i64 = raw.parse().map_err(|e| ConfigError::Invalid {
        key,
        reason: format!("{e}"),
    })?;
    if secs <= 0 {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be a positive number of seconds".to_string(),
        });
    }
    if secs > MAX_TTL_SECS {
        return Err(ConfigError::Invalid {
            key,
            reason: format!("must be at most {MAX_TTL_SECS} seconds"),
        });
    }
    Ok(Duration::seconds(secs))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn empty_environment_gives_dev_defaults() {
        let cfg = load(&[]).unwrap();
        assert!(cfg.uses_dev_secret());
        assert_eq!(cfg.mail, MailConfig::Log);
        assert_eq!(cfg.invite_ttl, Duration::days(3));
        assert!(cfg.bootstrap_admin.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = load(&[
            ("TOKEN_SECRET", "s3cret"),
            ("BASE_URL", "https://users.example.com/"),
            ("SESSION_TTL_SECS", "60"),
            ("MAIL_BACKEND", "http"),
            ("MAIL_RELAY_URL", "https://relay.example.com/send"),
            ("MAIL_RELAY_API_KEY", "key"),
        ])
        .unwrap();

        assert!(!cfg.uses_dev_secret());
        assert_eq!(cfg.base_url, "https://users.example.com");
        assert_eq!(cfg.session_ttl, Duration::seconds(60));
        assert!(matches!(cfg.mail, MailConfig::Http { .. }));
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(matches!(
            load(&[("INVITE_TTL_SECS", "soon")]),
            Err(ConfigError::Invalid { key: "INVITE_TTL_SECS", .. })
        ));
        assert!(matches!(
            load(&[("INVITE_TTL_SECS", "0")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert_eq!(
            load(&[("MAIL_BACKEND", "http")]).unwrap_err(),
            ConfigError::Missing("MAIL_RELAY_URL")
        );
        assert!(load(&[("BOOTSTRAP_ADMIN_EMAIL", "root@example.com")]).is_err());
    }

    #[test]
    fn lifetimes_are_capped_at_one_year() {
        let year = MAX_TTL_SECS.to_string();
        let over = (MAX_TTL_SECS + 1).to_string();

        let cfg = load(&[("SESSION_TTL_SECS", year.as_str())]).unwrap();
        assert_eq!(cfg.session_ttl, Duration::days(365));

        for key in ["SESSION_TTL_SECS", "INVITE_TTL_SECS", "PASSWORD_RESET_TIMEOUT_SECS"] {
            let err = load(&[(key, over.as_str())]).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { key: k, .. } if k == key));
        }
        assert!(matches!(
            load(&[("SESSION_TTL_SECS", "10000000000000")]),
            Err(ConfigError::Invalid { key: "SESSION_TTL_SECS", .. })
        ));
    }

    #[test]
    fn debug_output_never_contains_the_secret() {
        let cfg = load(&[("TOKEN_SECRET", "super-secret-value")]).unwrap();
        assert!(!format!("{cfg:?}").contains("super-secret-value"));
    }
}
