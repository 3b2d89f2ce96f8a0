//! Outbound mail.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// Template used for the sign-up activation email.
pub const ACTIVATION_TEMPLATE: &str = "user_welcome";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("template {0:?} is missing field {1:?}")]
    MissingField(String, &'static str),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// A templated message for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub recipient: String,
    pub template: String,
    pub data: BTreeMap<String, String>,
}

impl MailMessage {
    /// Activation email carrying the link the user follows to confirm.
    pub fn activation(recipient: &str, name: &str, link: String) -> Self {
        let data = BTreeMap::from([
            ("name".to_string(), name.to_string()),
            ("activationLink".to_string(), link),
        ]);
        Self {
            recipient: recipient.to_string(),
            template: ACTIVATION_TEMPLATE.to_string(),
            data,
        }
    }
}

/// Sends a message to a recipient using template data.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Mailer that writes messages to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogMailer {
    sender: String,
}

impl LogMailer {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        if message.template == ACTIVATION_TEMPLATE && !message.data.contains_key("activationLink") {
            return Err(MailError::MissingField(
                message.template.clone(),
                "activationLink",
            ));
        }
        info!(
            from = %self.sender,
            to = %message.recipient,
            template = %message.template,
            data = ?message.data,
            "mail sent"
        );
        Ok(())
    }
}
