//! Mail transports
//!
//! `HttpMailer` posts the envelope as JSON to a mail API with a bearer token.
//! `LogMailer` only logs, for local development without credentials.

use crate::config::RelayConfig;
use crate::contact::mail::MailEnvelope;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("failed to render email: {0}")]
    Render(String),

    #[error("mail API request failed: {0}")]
    Transport(String),

    #[error("mail API rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

impl From<reqwest::Error> for MailError {
    fn from(e: reqwest::Error) -> Self {
        MailError::Transport(e.to_string())
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, envelope: &MailEnvelope) -> Result<(), MailError>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, envelope: &MailEnvelope) -> Result<(), MailError> {
        tracing::info!(
            "Contact message for {} (reply-to {}): {}\n{}",
            envelope.to,
            envelope.reply_to,
            envelope.subject,
            envelope.text
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpMailer {
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, MailError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, envelope: &MailEnvelope) -> Result<(), MailError> {
        let mut request = self.client.post(&self.endpoint).json(envelope);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Pick the transport for a relay configuration
pub fn mailer_from_config(config: &RelayConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match &config.mail_api_url {
        Some(url) => {
            let mailer = HttpMailer::new(url, config.mail_api_key.clone(), Duration::from_secs(10))?;
            Ok(Arc::new(mailer))
        }
        None => {
            tracing::warn!("MAIL_API_URL not set; contact messages will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}
