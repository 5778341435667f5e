//! Outbound user notifications (verification and password-reset mail).
//!
//! Delivery is simulated: [`LogNotifier`] writes the message to the log and
//! [`MemoryNotifier`] keeps it in memory for local tooling and tests.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    EmailVerification,
    PasswordReset,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMessage {
    pub kind: MessageKind,
    pub to: String,
    pub subject: String,
    pub body: String,
    /// Link carrying the single-use token, e.g. `.../verify-email?token=...`.
    pub action_url: String,
}

impl OutboundMessage {
    /// Value of the `token` query parameter in `action_url`.
    pub fn token(&self) -> Option<&str> {
        self.action_url
            .split_once("token=")
            .map(|(_, rest)| rest.split('&').next().unwrap_or(rest))
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone)]
pub struct LogNotifier {
    from: String,
}

impl LogNotifier {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: OutboundMessage) -> Result<(), ServiceError> {
        info!(
            from = %self.from,
            to = %message.to,
            kind = ?message.kind,
            subject = %message.subject,
            "outbound mail (not delivered)"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Most recent message of `kind` addressed to `to`.
    pub fn last_to(&self, to: &str, kind: MessageKind) -> Option<OutboundMessage> {
        self.sent()
            .into_iter()
            .rev()
            .find(|m| m.kind == kind && m.to.eq_ignore_ascii_case(to))
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send(&self, message: OutboundMessage) -> Result<(), ServiceError> {
        self.sent
            .lock()
            .map_err(|_| ServiceError::InternalError("notifier mutex poisoned".into()))?
            .push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(kind: MessageKind, to: &str, url: &str) -> OutboundMessage {
        OutboundMessage {
            kind,
            to: to.into(),
            subject: "s".into(),
            body: "b".into(),
            action_url: url.into(),
        }
    }

    #[test]
    fn token_is_read_from_action_url() {
        let m = message(
            MessageKind::PasswordReset,
            "a@farm.test",
            "http://localhost:3000/reset-password?token=abc123&x=1",
        );
        assert_eq!(m.token(), Some("abc123"));
    }

    #[tokio::test]
    async fn memory_notifier_keeps_latest_per_recipient() {
        let notifier = MemoryNotifier::new();
        notifier
            .send(message(MessageKind::EmailVerification, "a@farm.test", "u?token=1"))
            .await
            .unwrap();
        notifier
            .send(message(MessageKind::EmailVerification, "A@farm.test", "u?token=2"))
            .await
            .unwrap();

        let last = notifier
            .last_to("a@farm.test", MessageKind::EmailVerification)
            .unwrap();
        assert_eq!(last.token(), Some("2"));
        assert!(notifier.last_to("a@farm.test", MessageKind::PasswordReset).is_none());
    }
}
