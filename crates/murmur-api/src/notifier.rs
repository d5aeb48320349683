use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::NotifyConfig;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("mail request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("mail API returned status {0}")]
    Status(u16),
}

/// Delivers verification codes to the address being registered.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_verification_code(
        &self,
        email: &str,
        username: &str,
        code: &str,
    ) -> Result<(), NotifyError>;
}

/// Development notifier: writes the code to the log instead of mailing it.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_verification_code(
        &self,
        email: &str,
        username: &str,
        code: &str,
    ) -> Result<(), NotifyError> {
        info!("Verification code issued for {} <{}>", username, email);
        debug!("Verification code for {}: {}", username, code);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody {
    sender: EmailAddress,
    to: Vec<EmailAddress>,
    subject: String,
    html_content: String,
    text_content: String,
}

/// Transactional mail over a JSON HTTP API (Brevo-compatible body).
pub struct HttpNotifier {
    client: reqwest::Client,
    config: NotifyConfig,
}

impl HttpNotifier {
    pub fn new(config: NotifyConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send_verification_code(
        &self,
        email: &str,
        username: &str,
        code: &str,
    ) -> Result<(), NotifyError> {
        let body = SendEmailBody {
            sender: EmailAddress {
                email: self.config.sender.clone(),
                name: Some("murmur".into()),
            },
            to: vec![EmailAddress {
                email: email.to_string(),
                name: Some(username.to_string()),
            }],
            subject: "Your murmur verification code".into(),
            html_content: format!(
                "<p>Hello {username},</p><p>Your verification code is <strong>{code}</strong>.</p>\
                 <p>If you did not sign up, you can ignore this email.</p>"
            ),
            text_content: format!(
                "Hello {username},\n\nYour verification code is {code}.\n\n\
                 If you did not sign up, you can ignore this email."
            ),
        };

        let resp = self
            .client
            .post(&self.config.url)
            .header("api-key", &self.config.api_key)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }

        info!("Verification email sent to {}", email);
        Ok(())
    }
}
