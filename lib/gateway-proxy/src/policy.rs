//! Per-service call policies read from service attributes

use gateway_api::TransporterService;
use std::time::Duration;
use tracing::debug;

/// Timeout policy for backend calls
#[derive(Clone, Debug, PartialEq)]
pub struct TimeoutPolicy {
    /// Total timeout for one attempt
    pub request_timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl TimeoutPolicy {
    /// Apply the `rpctimeout` attribute over the defaults. An unparsable value
    /// keeps the default.
    pub fn from_service(service: &TransporterService) -> Self {
        let mut policy = Self::default();
        let raw = service.rpc_timeout();
        if raw.is_empty() {
            return policy;
        }
        match parse_duration(&raw) {
            Some(timeout) if !timeout.is_zero() => {
                policy.request_timeout = timeout;
                policy.connect_timeout = policy.connect_timeout.min(timeout);
            }
            _ => debug!(service_id = %service.service_id(), value = %raw, "Ignoring invalid rpctimeout"),
        }
        policy
    }
}

/// Retry policy for failed backend calls
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// HTTP status codes that trigger a retry
    pub retryable_status_codes: Vec<u16>,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            retryable_status_codes: vec![502, 503, 504],
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Apply the `rpcretries` attribute; absent or invalid means no retries
    pub fn from_service(service: &TransporterService) -> Self {
        let max_retries = service
            .rpc_retries()
            .trim()
            .parse::<u32>()
            .unwrap_or_default();
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Check if a status code should trigger a retry
    pub fn should_retry(&self, status: u16) -> bool {
        self.retryable_status_codes.contains(&status)
    }

    /// Calculate backoff duration for the given retry count
    pub fn backoff_duration(&self, retry_count: u32) -> Duration {
        let base = self.initial_backoff.as_millis() as u64;
        let exponential = 2u64.saturating_pow(retry_count);
        let backoff_ms = base
            .saturating_mul(exponential)
            .min(self.max_backoff.as_millis() as u64);
        Duration::from_millis(backoff_ms)
    }
}

/// Parse `500ms`, `3s`, `1m` or a bare number of milliseconds
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (number, unit) = raw.split_at(split);
    let n: u64 = number.parse().ok()?;
    match unit.trim().to_ascii_lowercase().as_str() {
        "" | "ms" => Some(Duration::from_millis(n)),
        "s" => Some(Duration::from_secs(n)),
        "m" => Some(Duration::from_secs(n.checked_mul(60)?)),
        _ => None,
    }
}
