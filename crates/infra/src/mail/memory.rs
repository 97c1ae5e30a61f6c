use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{DeliveryError, Mailer, OutboundEmail};

/// Captures messages in an outbox. Can be switched to fail every send.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<OutboundEmail>>,
    failing: AtomicBool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn outbox(&self) -> Vec<OutboundEmail> {
        self.outbox.lock().map(|o| o.clone()).unwrap_or_default()
    }

    /// Most recent message addressed to `to`.
    pub fn last_to(&self, to: &str) -> Option<OutboundEmail> {
        self.outbox()
            .into_iter()
            .rev()
            .find(|m| m.to.iter().any(|r| r == to))
    }
}

#[async_trait::async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), DeliveryError> {
        if email.to.is_empty() {
            return Err(DeliveryError::NoRecipients);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Transport("memory mailer set to fail".to_string()));
        }
        self.outbox
            .lock()
            .map_err(|_| DeliveryError::Transport("outbox lock poisoned".to_string()))?
            .push(email);
        Ok(())
    }
}
