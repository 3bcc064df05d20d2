use crate::domain::ports::NotificationService;
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::error;

/// Thin client for the mail relay collaborator. Rendering and delivery are
/// its problem; this side only ships recipients, a subject, and the
/// structured booking summary.
pub struct HttpNotifier {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpNotifier {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
        }
    }
}

#[derive(Serialize)]
struct NotificationPayload<'a> {
    recipients: &'a [String],
    subject: &'a str,
    booking: &'a serde_json::Value,
}

#[async_trait]
impl NotificationService for HttpNotifier {
    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        summary: &serde_json::Value,
    ) -> Result<(), AppError> {
        let payload = NotificationPayload {
            recipients,
            subject,
            booking: summary,
        };

        let res = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Notification service connection error: {}", e);
                error!("{}", msg);
                AppError::InternalWithMsg(msg)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let msg = format!("Notification service failed. Status: {}, Body: {}", status, text);
            error!("{}", msg);
            return Err(AppError::InternalWithMsg(msg));
        }

        Ok(())
    }
}
