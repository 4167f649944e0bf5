use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::json;

/// Outcome of a single webhook submission as seen by the producer.
#[derive(Debug, Clone)]
pub struct Submission {
    pub status: StatusCode,
    pub body: String,
}

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub async fn post_webhook(&self, message: &str) -> Result<Submission> {
        self.post_raw(json!({ "message": message }).to_string()).await
    }

    /// Posts an arbitrary body, for checking how the server treats bad input.
    pub async fn post_raw(&self, body: String) -> Result<Submission> {
        let url = format!("{}/webhook", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .context("Failed to post webhook")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response body".to_string());

        Ok(Submission { status, body })
    }
}
