use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::{Error, Result};

/// Exam credentials handed to a freshly provisioned candidate.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialDelivery {
    pub candidate_name: String,
    pub email: String,
    pub user_id: String,
    pub one_time_password: String,
    pub batch_title: String,
    pub exam_portal_url: String,
}

#[async_trait]
pub trait CredentialNotifier: Send + Sync {
    async fn deliver_credentials(&self, delivery: &CredentialDelivery) -> Result<()>;
}

/// Posts credentials as JSON to the configured webhook. When no webhook is
/// configured, deliveries are logged and dropped so provisioning still works
/// in local setups.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    target_url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(target_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            target_url,
        }
    }
}

#[async_trait]
impl CredentialNotifier for WebhookNotifier {
    async fn deliver_credentials(&self, delivery: &CredentialDelivery) -> Result<()> {
        let Some(url) = self.target_url.as_deref() else {
            tracing::info!(
                candidate = %delivery.user_id,
                "no credentials webhook configured, skipping delivery"
            );
            return Ok(());
        };

        let response = self
            .client
            .post(url)
            .json(delivery)
            .send()
            .await
            .map_err(|err| Error::Internal(format!("Credential delivery failed: {}", err)))?;

        if !response.status().is_success() {
            return Err(Error::Internal(format!(
                "Credential webhook returned status {}",
                response.status()
            )));
        }
        tracing::info!(candidate = %delivery.user_id, "credentials delivered");
        Ok(())
    }
}
