use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::forward::ForwarderConfig;
use crate::normalize::NormalizePolicy;

pub const WEBHOOK_URL_KEY: &str = "MAKE_WEBHOOK_URL";
const BIND_ADDR_KEY: &str = "RELAY_BIND_ADDR";
const DEFAULT_TOOL_KEY: &str = "RELAY_DEFAULT_TOOL";
const TIMEOUT_KEY: &str = "RELAY_UPSTREAM_TIMEOUT_SECS";
const MAX_ATTEMPTS_KEY: &str = "RELAY_MAX_ATTEMPTS";
const BACKOFF_KEY: &str = "RELAY_RETRY_BACKOFF_MS";
const MAX_BODY_KEY: &str = "RELAY_MAX_BODY_BYTES";

/// Everything the relay reads from its environment, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// `None` keeps the server up but makes every POST fail with a config error.
    pub webhook_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub policy: NormalizePolicy,
    pub upstream_timeout: Duration,
    pub max_attempts: u32,
    pub backoff_step: Duration,
    pub max_body_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            policy: NormalizePolicy::default(),
            upstream_timeout: Duration::from_secs(30),
            max_attempts: 3,
            backoff_step: Duration::from_millis(1200),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl RelayConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let webhook_url = lookup(WEBHOOK_URL_KEY)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let default_tool = parse_or(&lookup, DEFAULT_TOOL_KEY, defaults.policy.default_tool)?;
        let timeout_secs = parse_or(&lookup, TIMEOUT_KEY, defaults.upstream_timeout.as_secs())?;
        let backoff_ms = parse_or(&lookup, BACKOFF_KEY, defaults.backoff_step.as_millis() as u64)?;
        let max_attempts: u32 = parse_or(&lookup, MAX_ATTEMPTS_KEY, defaults.max_attempts)?;
        if max_attempts == 0 {
            anyhow::bail!("{MAX_ATTEMPTS_KEY} must be at least 1");
        }

        Ok(Self {
            webhook_url,
            bind_addr: parse_or(&lookup, BIND_ADDR_KEY, defaults.bind_addr)?,
            policy: NormalizePolicy { default_tool },
            upstream_timeout: Duration::from_secs(timeout_secs),
            max_attempts,
            backoff_step: Duration::from_millis(backoff_ms),
            max_body_bytes: parse_or(&lookup, MAX_BODY_KEY, defaults.max_body_bytes)?,
        })
    }

    /// Forwarder settings, or `None` when no webhook is configured.
    pub fn forwarder_config(&self) -> Option<ForwarderConfig> {
        let url = self.webhook_url.as_ref()?;
        Some(ForwarderConfig {
            webhook_url: url.clone(),
            timeout: self.upstream_timeout,
            max_attempts: self.max_attempts,
            backoff_step: self.backoff_step,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: '{raw}'")),
        _ => Ok(default),
    }
}
