use crate::config::MailConfig;
use crate::error::{AppError, AppResult};
use crate::models::{EmailMessage, Notification};
use crate::services::NotificationSender;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SendEmailRequest<'a> {
    pub from: String,
    pub to: Vec<&'a str>,
    pub subject: &'a str,
    pub html: &'a str,
}

/// Sends notification emails through an HTTP email API.
#[derive(Clone)]
pub struct MailerService {
    client: Client,
    config: MailConfig,
}

impl MailerService {
    pub fn new(config: MailConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn sender_address(&self) -> String {
        format!("{} <{}>", self.config.from_name, self.config.from_address)
    }

    pub async fn send_email(&self, message: &EmailMessage) -> AppResult<()> {
        if !self.config.enabled {
            log::info!(
                "Mail disabled, skipping \"{}\" to {}",
                message.subject,
                message.to
            );
            return Ok(());
        }

        let body = SendEmailRequest {
            from: self.sender_address(),
            to: vec![message.to.as_str()],
            subject: &message.subject,
            html: &message.html,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            log::info!("Email \"{}\" sent to {}", message.subject, message.to);
            Ok(())
        } else {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("Email to {} failed: {status} {error_text}", message.to);
            Err(AppError::ExternalApiError(format!(
                "Email sending failed ({status}): {error_text}"
            )))
        }
    }
}

#[async_trait]
impl NotificationSender for MailerService {
    async fn send(&self, notification: &Notification) -> AppResult<()> {
        let message = notification.to_email(&self.config.from_name);
        self.send_email(&message).await
    }
}
