//! Outbound mail dispatch.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

pub mod http;
pub mod log;
pub mod memory;

pub use http::HttpRelayMailer;
pub use log::LogMailer;
pub use memory::MemoryMailer;

use crate::config::{AppConfig, MailConfig};

/// A single plain-text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: Vec<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("mail relay rejected message (status={status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("mail transport failed: {0}")]
    Transport(String),

    #[error("message has no recipients")]
    NoRecipients,
}

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<(), DeliveryError>;
}

#[async_trait::async_trait]
impl<M> Mailer for Arc<M>
where
    M: Mailer + ?Sized,
{
    async fn send(&self, email: OutboundEmail) -> Result<(), DeliveryError> {
        (**self).send(email).await
    }
}

/// Build the mailer selected by `MAIL_BACKEND`.
pub fn mailer_from_config(config: &AppConfig) -> Result<Arc<dyn Mailer>, DeliveryError> {
    let mailer: Arc<dyn Mailer> = match &config.mail {
        MailConfig::Log => Arc::new(LogMailer),
        MailConfig::Http { relay_url, api_key } => {
            Arc::new(HttpRelayMailer::new(relay_url.clone(), api_key.clone())?)
        }
    };
    Ok(mailer)
}
