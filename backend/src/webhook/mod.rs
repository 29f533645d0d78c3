//! Outbound webhook delivery.
//!
//! Payloads are POSTed as JSON. Only HTTP 200 counts as delivered; any other
//! status (201 and 204 included) is a failure. Transport errors, timeouts and
//! non-2xx answers are retried. Other 2xx answers mean the body already
//! arrived, so they fail without a retry.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sheethook::{Config, WebhookClient};
//!
//! let config = Config::from_env()?;
//! let client = WebhookClient::from_config(&config);
//! let status = client.post("https://hooks.example.com/epics", &payload).await?;
//! ```

use reqwest::StatusCode;
use std::time::Duration;

use crate::api::logs::{log_info_indent, log_success_indent, log_warning};
use crate::config::Config;
use crate::error::{WebhookError, WebhookResult};
use crate::models::Payload;

/// Default number of attempts
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Delay between attempts in milliseconds
const RETRY_DELAY_MS: u64 = 1000;

/// Per-attempt timeout in milliseconds
const REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Longest response body echoed into an error
const MAX_ERROR_BODY: usize = 500;

/// Webhook HTTP client
#[derive(Clone)]
pub struct WebhookClient {
    http: reqwest::Client,
    max_attempts: u32,
    retry_delay: Duration,
    timeout: Duration,
}

impl WebhookClient {
    /// Create a client with default retry settings
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
            timeout: Duration::from_millis(REQUEST_TIMEOUT_MS),
        }
    }

    /// Create a client using the retry settings from `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .with_max_attempts(config.webhook_attempts)
            .with_retry_delay(Duration::from_millis(config.webhook_retry_delay_ms))
            .with_timeout(Duration::from_millis(config.webhook_timeout_ms))
    }

    /// Set the total number of attempts (at least one)
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the pause between attempts
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set how long a single attempt may take
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// POST `payload` to `url`, retrying until a 200 or the attempts run out
    ///
    /// # Returns
    /// The status code (always 200) on success, the last error otherwise
    pub async fn post(&self, url: &str, payload: &Payload) -> WebhookResult<u16> {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match self.try_post(url, payload).await {
                Ok(status) => return Ok(status),
                Err(e) if is_accepted(&e) => {
                    log_warning(format!("Webhook took the payload but answered: {}", e));
                    return Err(e);
                }
                Err(e) => {
                    log_warning(format!("Attempt {}/{} failed: {}", attempt, self.max_attempts, e));
                    last_error = Some(e);

                    if attempt < self.max_attempts {
                        log_info_indent(format!("Retrying in {}ms...", self.retry_delay.as_millis()), 1);
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| WebhookError::RequestFailed("no attempt made".to_string())))
    }

    /// Single delivery attempt
    async fn try_post(&self, url: &str, payload: &Payload) -> WebhookResult<u16> {
        log_info_indent(format!("POST {}", url), 1);

        let response = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .json(payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| WebhookError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::OK {
            log_success_indent(format!("Webhook accepted payload ({})", status), 1);
            return Ok(status.as_u16());
        }

        let body = response.text().await.unwrap_or_default();
        Err(WebhookError::UnexpectedStatus {
            status: status.as_u16(),
            body: truncate(&body, MAX_ERROR_BODY),
        })
    }
}

impl Default for WebhookClient {
    fn default() -> Self {
        Self::new()
    }
}

/// A 2xx other than 200: delivered, but not the answer we require.
fn is_accepted(err: &WebhookError) -> bool {
    matches!(err, WebhookError::UnexpectedStatus { status, .. } if (200..300).contains(status))
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
