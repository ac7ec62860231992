//! Forwarder: posts the serialized payload to the webhook and classifies the reply.
//!
//! The webhook sits behind an admission queue. When that queue is saturated it
//! answers `400 { "result": "Queue is full." }`; only that reply is retried,
//! with a linear backoff, for a bounded number of attempts.

use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

pub const QUEUE_FULL_MARKER: &str = "Queue is full";
pub const QUEUE_EXHAUSTED_MESSAGE: &str = "Queue is full (retries exceeded).";

#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    pub webhook_url: String,
    pub timeout: Duration,
    // total, including the first
    pub max_attempts: u32,
    pub backoff_step: Duration,
}

impl ForwarderConfig {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            backoff_step: Duration::from_millis(1200),
        }
    }
}

/// `body` is always JSON; non-JSON replies are wrapped as `{ "result": <text> }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForwardOutcome {
    pub status: u16,
    pub body: Value,
}

impl ForwardOutcome {
    fn is_queue_full(&self) -> bool {
        self.status == 400
            && self
                .body
                .get("result")
                .and_then(Value::as_str)
                .is_some_and(|r| r.contains(QUEUE_FULL_MARKER))
    }

    fn queue_exhausted() -> Self {
        Self {
            status: 400,
            body: json!({ "result": QUEUE_EXHAUSTED_MESSAGE }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("failed to build webhook client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("webhook did not answer within {0:?}")]
    Timeout(Duration),
    #[error("webhook request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

pub fn backoff_delay(step: Duration, attempt: u32) -> Duration {
    step.saturating_mul(attempt.saturating_add(1))
}

// Each attempt is numbered from zero. Transitions out of `Attempting` depend
// only on the reply; the delay in `RetryableFailure` only on its attempt number.
#[derive(Debug)]
enum AttemptState {
    Attempting(u32),
    Success(ForwardOutcome),
    RetryableFailure(u32),
    ExhaustedFailure,
    TerminalFailure(ForwardOutcome),
}

pub struct Forwarder {
    client: Client,
    config: ForwarderConfig,
}

impl Forwarder {
    pub fn new(config: ForwarderConfig) -> Result<Self, ForwardError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ForwardError::Client)?;
        Ok(Self { client, config })
    }

    pub async fn forward(&self, payload_body: String) -> Result<ForwardOutcome, ForwardError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut state = AttemptState::Attempting(0);

        loop {
            state = match state {
                AttemptState::Attempting(n) => {
                    let outcome = self.send_once(&payload_body).await?;
                    Self::classify(n, max_attempts, outcome)
                }
                AttemptState::RetryableFailure(n) => {
                    let delay = backoff_delay(self.config.backoff_step, n);
                    warn!(
                        attempt = n + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "webhook queue is full, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    AttemptState::Attempting(n + 1)
                }
                AttemptState::ExhaustedFailure => {
                    warn!(max_attempts, "webhook queue still full, giving up");
                    return Ok(ForwardOutcome::queue_exhausted());
                }
                AttemptState::Success(outcome) | AttemptState::TerminalFailure(outcome) => {
                    return Ok(outcome);
                }
            };
        }
    }

    fn classify(attempt: u32, max_attempts: u32, outcome: ForwardOutcome) -> AttemptState {
        if outcome.is_queue_full() {
            if attempt + 1 < max_attempts {
                AttemptState::RetryableFailure(attempt)
            } else {
                AttemptState::ExhaustedFailure
            }
        } else if (200..300).contains(&outcome.status) {
            AttemptState::Success(outcome)
        } else {
            AttemptState::TerminalFailure(outcome)
        }
    }

    async fn send_once(&self, payload_body: &str) -> Result<ForwardOutcome, ForwardError> {
        let response = self
            .client
            .post(&self.config.webhook_url)
            .header(CONTENT_TYPE, "application/json")
            .header(CACHE_CONTROL, "no-store")
            .body(payload_body.to_owned())
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status().as_u16();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));
        let text = response.text().await.map_err(|e| self.map_transport(e))?;

        info!(status, bytes = text.len(), is_json, "webhook responded");
        Ok(ForwardOutcome {
            status,
            body: classify_body(text, is_json),
        })
    }

    fn map_transport(&self, err: reqwest::Error) -> ForwardError {
        if err.is_timeout() {
            ForwardError::Timeout(self.config.timeout)
        } else {
            ForwardError::Transport(err)
        }
    }
}

pub fn classify_body(text: String, is_json: bool) -> Value {
    if is_json {
        if let Ok(parsed) = serde_json::from_str::<Value>(&text) {
            return parsed;
        }
    }
    json!({ "result": text })
}
