use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::retry::{RetryPolicy, retry_with_backoff};
use crate::config::Config;
use crate::constants;
use crate::errors::ApiError;
use crate::models::{ContentKey, CourseId};

/// Server acknowledgement of a completion call. The server recomputes the
/// course progress percentage; older deployments return an empty body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionAck {
    #[serde(
        default,
        alias = "progressPercent",
        alias = "progress_percent",
        alias = "progress"
    )]
    pub course_percent: Option<f64>,
}

/// HTTP client for the completion-tracking endpoints.
///
/// The credential is an opaque bearer token issued elsewhere; it can be
/// swapped at any time (for instance after an out-of-band refresh).
pub struct LmsClient {
    client: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
    retry: RetryPolicy,
}

impl LmsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_settings(
            base_url,
            Duration::from_secs(constants::HTTP_TIMEOUT_SECS),
            RetryPolicy::default(),
        )
    }

    /// Build a client with the timeout and retry schedule from the loaded
    /// configuration.
    pub fn from_config(base_url: impl Into<String>, config: &Config) -> Self {
        Self::with_settings(
            base_url,
            Duration::from_secs(config.network.connection_timeout_secs),
            RetryPolicy {
                max_attempts: config.sync.max_attempts,
                base_delay: Duration::from_millis(config.sync.base_backoff_ms),
            },
        )
    }

    pub fn with_settings(
        base_url: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
            retry,
        }
    }

    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    pub async fn has_credential(&self) -> bool {
        self.token.read().await.is_some()
    }

    async fn credential(&self) -> Result<String, ApiError> {
        self.token
            .read()
            .await
            .clone()
            .ok_or(ApiError::MissingCredential)
    }

    fn content_url(&self, key: &ContentKey, suffix: &str) -> String {
        format!(
            "{}/courses/{}/modules/{}/contents/{}/{}",
            self.base_url, key.course_id, key.module_id, key.content_id, suffix
        )
    }

    /// Report accumulated watch-time for one content item.
    pub async fn record_watch_time(
        &self,
        key: &ContentKey,
        watch_time: f64,
        duration: f64,
    ) -> Result<(), ApiError> {
        let token = self.credential().await?;
        let url = self.content_url(key, "watch-time");
        let body = serde_json::json!({
            "moduleId": key.module_id,
            "contentId": key.content_id,
            "watchTime": watch_time,
            "duration": duration,
        });

        retry_with_backoff(&self.retry, "watch-time sync", || {
            self.send_watch_time(&url, &token, &body)
        })
        .await?;

        debug!("Synced {:.1}s of watch-time for {}", watch_time, key);
        Ok(())
    }

    async fn send_watch_time(
        &self,
        url: &str,
        token: &str,
        body: &serde_json::Value,
    ) -> Result<(), ApiError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            warn!("Watch-time sync rejected with status {}", status);
            Err(ApiError::from_status(status))
        }
    }

    /// Mark one content item complete. The auth header is the entire
    /// request; the path identifies the item.
    pub async fn mark_complete(&self, key: &ContentKey) -> Result<CompletionAck, ApiError> {
        let token = self.credential().await?;
        let url = self.content_url(key, "complete");

        retry_with_backoff(&self.retry, "mark complete", || {
            self.send_complete(&url, &token)
        })
        .await
    }

    async fn send_complete(&self, url: &str, token: &str) -> Result<CompletionAck, ApiError> {
        let response = self.client.post(url).bearer_auth(token).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Completion call rejected with status {}", status);
            return Err(ApiError::from_status(status));
        }

        match response.json::<CompletionAck>().await {
            Ok(ack) => Ok(ack),
            Err(e) => {
                debug!("Completion response had no parsable body: {}", e);
                Ok(CompletionAck::default())
            }
        }
    }

    /// Optional session-start pre-check. 403 means "confirmed not
    /// enrolled" rather than a failure here.
    pub async fn check_enrollment(&self, course_id: &CourseId) -> Result<bool, ApiError> {
        let token = self.credential().await?;
        let url = format!("{}/courses/{}/enrollment", self.base_url, course_id);

        retry_with_backoff(&self.retry, "enrollment check", || {
            self.send_enrollment_check(&url, &token)
        })
        .await
    }

    async fn send_enrollment_check(&self, url: &str, token: &str) -> Result<bool, ApiError> {
        let response = self.client.get(url).bearer_auth(token).send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(true)
        } else if status.as_u16() == 403 {
            Ok(false)
        } else {
            Err(ApiError::from_status(status))
        }
    }
}
