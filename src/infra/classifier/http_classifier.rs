use crate::domain::ports::SemanticClassifier;
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{error, warn};

/// Optional ML-backed fee-type classifier. Callers fail closed to
/// "unknown" on any error from here, so this client never retries.
pub struct HttpClassifier {
    client: Client,
    api_url: String,
}

impl HttpClassifier {
    pub fn new(api_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_url,
        }
    }
}

#[async_trait]
impl SemanticClassifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<String, AppError> {
        let res = self
            .client
            .post(&self.api_url)
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| {
                warn!("Classifier connection error: {}", e);
                AppError::InternalWithMsg(format!("Classifier connection error: {}", e))
            })?;

        if !res.status().is_success() {
            let status = res.status();
            warn!("Classifier returned status {}", status);
            return Err(AppError::InternalWithMsg(format!(
                "Classifier failed with status {}",
                status
            )));
        }

        let body: Value = res.json().await.map_err(|e| {
            error!("Failed to parse classifier response: {:?}", e);
            AppError::InternalWithMsg("Classifier response was not JSON".into())
        })?;

        body.get("fee_type")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| AppError::InternalWithMsg("Classifier response missing fee_type".into()))
    }
}
