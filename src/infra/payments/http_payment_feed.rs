use crate::domain::models::payment::RawPaymentEvent;
use crate::domain::ports::PaymentFeed;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;
use tracing::error;

/// Client for the payment provider's paid-invoice feed, used by the
/// periodic reconciliation poll.
pub struct HttpPaymentFeed {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpPaymentFeed {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_url,
            api_key,
        }
    }
}

#[async_trait]
impl PaymentFeed for HttpPaymentFeed {
    async fn fetch_paid_since(&self, since: DateTime<Utc>) -> Result<Vec<RawPaymentEvent>, AppError> {
        let res = self
            .client
            .get(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .query(&[("paid_since", since.to_rfc3339())])
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Payment feed connection error: {}", e);
                error!("{}", msg);
                AppError::InternalWithMsg(msg)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let msg = format!("Payment feed failed. Status: {}, Body: {}", status, text);
            error!("{}", msg);
            return Err(AppError::InternalWithMsg(msg));
        }

        res.json::<Vec<RawPaymentEvent>>().await.map_err(|e| {
            error!("Failed to parse payment feed response: {:?}", e);
            AppError::InternalWithMsg("Payment feed response was not valid JSON".into())
        })
    }
}
