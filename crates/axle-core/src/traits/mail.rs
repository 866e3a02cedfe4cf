//! Mail delivery trait.

use async_trait::async_trait;

use crate::result::HostResult;

/// An outgoing mail message.
///
/// The sender address is supplied by the implementation (typically from
/// host configuration), not by the plugin.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MailMessage {
    /// Recipient addresses.
    pub to: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

impl MailMessage {
    /// Create a message to a single recipient.
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: vec![to.into()],
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Trait for mail delivery backends.
#[async_trait]
pub trait MailSender: Send + Sync + std::fmt::Debug + 'static {
    /// Deliver a message. Failures are reported to the calling plugin and
    /// never affect other plugins.
    async fn send(&self, message: &MailMessage) -> HostResult<()>;
}
