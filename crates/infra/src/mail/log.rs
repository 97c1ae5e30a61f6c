use super::{DeliveryError, Mailer, OutboundEmail};

/// Writes each message to the log instead of sending it. Dev only: bodies
/// carry live links.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), DeliveryError> {
        if email.to.is_empty() {
            return Err(DeliveryError::NoRecipients);
        }
        tracing::info!(
            from = %email.from,
            to = ?email.to,
            subject = %email.subject,
            body = %email.body,
            "outbound email"
        );
        Ok(())
    }
}
