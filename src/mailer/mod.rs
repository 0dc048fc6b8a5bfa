use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::errors::ServiceError;

/// Outbound transactional mail. Only password-reset mail today.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), ServiceError>;
}

pub type MailerHandle = Arc<dyn Mailer>;

/// Delivers mail through an HTTP mail provider (Resend-compatible API).
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: String, from: String) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ServiceError::MailerError(e.to_string()))?;

        Ok(Self {
            client,
            api_url,
            api_key,
            from,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    #[instrument(skip(self, html))]
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), ServiceError> {
        let payload = json!({
            "from": self.from,
            "to": to,
            "subject": subject,
            "html": html,
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ServiceError::MailerError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::MailerError(format!(
                "mail provider returned {status}: {body}"
            )));
        }

        info!(subject, "Mail dispatched");
        Ok(())
    }
}

/// Logs mail instead of sending it. Used when no provider key is configured
/// and in tests.
#[derive(Default)]
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> Result<(), ServiceError> {
        info!(to, subject, "Mail delivery skipped (no provider configured)");
        Ok(())
    }
}

/// Picks the mailer implementation based on configuration.
pub fn mailer_from_config(config: &AppConfig) -> Result<MailerHandle, ServiceError> {
    match &config.mail_api_key {
        Some(key) => Ok(Arc::new(HttpMailer::new(
            config.mail_api_url.clone(),
            key.clone(),
            config.mail_from.clone(),
        )?)),
        None => {
            warn!("mail_api_key not set; password-reset mail will be logged, not sent");
            Ok(Arc::new(NoopMailer))
        }
    }
}
