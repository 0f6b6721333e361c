//! Image hosting: single-attempt Pixhost client plus the retry loop around it.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::UploadConfig;
use crate::error::{ProxyError, Result};

#[cfg(test)]
use mockall::automock;

/// Remote image host accepting one upload per call
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload the image once and return the host's display URL
    async fn upload(&self, image_path: &Path) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    show_url: String,
}

/// Pixhost multipart upload client
pub struct PixhostClient {
    client: reqwest::Client,
    endpoint: String,
    content_type: String,
}

impl PixhostClient {
    pub fn new(config: &UploadConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            content_type: config.content_type.clone(),
        })
    }
}

#[async_trait]
impl ImageHost for PixhostClient {
    async fn upload(&self, image_path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(image_path).await?;
        let file_name = image_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "screenshot.jpg".to_string());

        let part = Part::bytes(bytes).file_name(file_name).mime_str("image/jpeg")?;
        let form = Form::new()
            .part("img", part)
            .text("content_type", self.content_type.clone());

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProxyError::Upload(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProxyError::Upload(format!("host returned {}: {}", status, body.trim())));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| ProxyError::Upload(format!("unparsable response: {}", e)))?;
        Ok(parsed.show_url)
    }
}

/// Attempts and linear backoff for uploads
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff_unit: Duration::from_secs(config.backoff_secs),
        }
    }

    /// Wait after the given failed attempt (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_unit * attempt
    }
}

/// Upload with retries. Attempt N failing waits N * backoff_unit before the next.
pub async fn upload_with_retry(host: &dyn ImageHost, image_path: &Path, policy: RetryPolicy) -> Result<String> {
    let mut last_error = None;

    for attempt in 1..=policy.max_attempts {
        info!(
            "Uploading {} (attempt {}/{})",
            image_path.display(),
            attempt,
            policy.max_attempts
        );
        match host.upload(image_path).await {
            Ok(url) => {
                info!("Upload succeeded: {}", url);
                return Ok(url);
            }
            Err(e) => {
                warn!("Upload attempt {} failed: {}", attempt, e);
                last_error = Some(e);
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.backoff(attempt)).await;
        }
    }

    Err(ProxyError::Upload(format!(
        "giving up after {} attempts: {}",
        policy.max_attempts,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}

/// Rewrite a display URL into the direct image URL. Idempotent.
pub fn direct_url(show_url: &str, config: &UploadConfig) -> String {
    show_url.replacen(&config.show_url_prefix, &config.direct_url_prefix, 1)
}
