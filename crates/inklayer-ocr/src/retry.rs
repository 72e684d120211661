// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Retry policy for OCR service requests: exponential backoff with jitter.
//
// HTTP failures are classified as Transient (throttling, server errors,
// dropped connections) or Permanent (bad key, bad request, unknown model).
// Only transient failures are retried.

use std::time::Duration;

use inklayer_core::config::OcrSettings;
use inklayer_core::types::ErrorClass;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use tracing::{debug, info, warn};

/// Backoff policy for one OCR request.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt; 0 disables retrying.
    pub max_retries: u32,
    /// Wait before the first retry; doubled for each one after.
    pub base_delay: Duration,
    /// No single wait is longer than this.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    pub fn from_settings(settings: &OcrSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            ..Self::default()
        }
    }
}

/// What to do after a failed request.
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep, then send the request again.
    RetryAfter(Duration),
    /// The failure is permanent.
    GiveUp(ErrorClass),
    /// Transient, but out of attempts.
    Exhausted,
}

/// Classify an unsuccessful HTTP status.
pub fn classify_status(status: StatusCode) -> ErrorClass {
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        ErrorClass::Transient
    } else {
        ErrorClass::Permanent
    }
}

/// Classify a transport-level failure (no HTTP response received).
pub fn classify_transport(err: &reqwest::Error) -> ErrorClass {
    if err.is_builder() || err.is_redirect() {
        return ErrorClass::Permanent;
    }
    // Connect failures, timeouts, truncated bodies.
    ErrorClass::Transient
}

/// Decide whether to retry after the `attempt`-th failure (0-based).
///
/// A server-supplied `Retry-After` wins over the computed backoff when it is
/// longer; either way the wait never exceeds `max_delay`.
pub fn should_retry(
    class: ErrorClass,
    attempt: u32,
    config: &RetryConfig,
    retry_after: Option<Duration>,
) -> RetryDecision {
    if class == ErrorClass::Permanent {
        info!("OCR request failed permanently");
        return RetryDecision::GiveUp(class);
    }
    if attempt >= config.max_retries {
        warn!(attempts = attempt + 1, "OCR request still failing, giving up");
        return RetryDecision::Exhausted;
    }

    let backoff = compute_delay(attempt, config);
    let delay = match retry_after {
        Some(requested) if requested > backoff => requested.min(config.max_delay),
        _ => backoff,
    };
    debug!(attempt, wait_ms = delay.as_millis(), "OCR request will be retried");
    RetryDecision::RetryAfter(delay)
}

/// Exponential backoff: `min(base * 2^attempt + spread, max_delay)`.
pub fn compute_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let doubled = config.base_delay.saturating_mul(1 << attempt.min(10));
    doubled
        .saturating_add(spread(config.base_delay, attempt))
        .min(config.max_delay)
}

/// Deterministic spread in `[0, base)`, keyed on the attempt.
fn spread(base: Duration, attempt: u32) -> Duration {
    let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX).max(1);
    let mixed = (u64::from(attempt) + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    Duration::from_millis(mixed % base_ms)
}

/// The `Retry-After` header, in whole seconds.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    value.parse::<u64>().ok().map(Duration::from_secs)
}
