//! Infrastructure layer: config, account storage, mail dispatch and the
//! application services built on them.

pub mod accounts;
pub mod bootstrap;
pub mod config;
pub mod mail;
pub mod services;

pub use accounts::{AccountRepository, InMemoryAccountRepository, RepositoryError};
pub use config::{AppConfig, ConfigError, MailConfig};
pub use mail::{DeliveryError, Mailer, MemoryMailer, OutboundEmail};
pub use services::AccountServices;
