//! JSON mail relay (Brevo-style `POST` with an `api-key` header).

use std::time::Duration;

use serde::Serialize;

use super::{DeliveryError, Mailer, OutboundEmail};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayAddress<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayBody<'a> {
    sender: RelayAddress<'a>,
    to: Vec<RelayAddress<'a>>,
    subject: &'a str,
    text_content: &'a str,
}

#[derive(Clone)]
pub struct HttpRelayMailer {
    client: reqwest::Client,
    relay_url: String,
    api_key: String,
}

impl core::fmt::Debug for HttpRelayMailer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HttpRelayMailer")
            .field("relay_url", &self.relay_url)
            .finish_non_exhaustive()
    }
}

impl HttpRelayMailer {
    pub fn new(relay_url: String, api_key: String) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DeliveryError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            relay_url,
            api_key,
        })
    }
}

#[async_trait::async_trait]
impl Mailer for HttpRelayMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), DeliveryError> {
        if email.to.is_empty() {
            return Err(DeliveryError::NoRecipients);
        }

        let body = RelayBody {
            sender: RelayAddress { email: &email.from },
            to: email.to.iter().map(|to| RelayAddress { email: to }).collect(),
            subject: &email.subject,
            text_content: &email.body,
        };

        let resp = self
            .client
            .post(&self.relay_url)
            .header("api-key", &self.api_key)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            tracing::debug!(subject = %email.subject, "mail relay accepted message");
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
