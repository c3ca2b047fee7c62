//! Retry policy for API calls.
//!
//! Pure decision functions: whether a response or transport failure is worth
//! retrying, and how long to wait before the next attempt. Delay computation
//! honors a server-supplied `Retry-After` hint (decimal seconds or HTTP-date)
//! and otherwise falls back to exponential backoff with full jitter.
//!
//! The functions here perform no I/O; the transport owns the retry loop.

use std::collections::HashSet;

use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER};

/// Statuses eligible for retry by default.
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Methods safe to retry without side-effect duplication risk.
pub const DEFAULT_IDEMPOTENT_METHODS: [&str; 5] = ["GET", "HEAD", "PUT", "DELETE", "OPTIONS"];

/// Retry policy configuration, supplied at transport construction.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts for one logical call, including the first.
    pub max_attempts: u32,
    /// Base of the exponential backoff window, in seconds.
    pub backoff_base: f64,
    /// Upper bound for any single delay, in seconds.
    pub max_delay: f64,
    /// Status codes eligible for retry.
    pub retryable_statuses: HashSet<u16>,
    /// Uppercased methods retried on 408/5xx and on timeout.
    pub idempotent_methods: HashSet<String>,
    /// Retry non-idempotent methods on plain timeouts. Off by default:
    /// a timed-out POST may already have been applied server-side.
    pub retry_post_on_timeout: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: 0.5,
            max_delay: 30.0,
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.into_iter().collect(),
            idempotent_methods: DEFAULT_IDEMPOTENT_METHODS
                .iter()
                .map(|m| (*m).to_string())
                .collect(),
            retry_post_on_timeout: false,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set total attempts (including the first).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the backoff base, in seconds.
    pub fn with_backoff_base(mut self, seconds: f64) -> Self {
        self.backoff_base = seconds;
        self
    }

    /// Set the per-delay upper bound, in seconds.
    pub fn with_max_delay(mut self, seconds: f64) -> Self {
        self.max_delay = seconds;
        self
    }

    /// Allow timeout retry for non-idempotent methods.
    pub fn with_retry_post_on_timeout(mut self, enabled: bool) -> Self {
        self.retry_post_on_timeout = enabled;
        self
    }
}

/// Decide whether a received response is retryable.
///
/// 408 and the 5xx set are retryable only for idempotent methods. 429 is
/// retryable for any method, but only when the server supplied a
/// `Retry-After` hint; without one the rate-limit error propagates so the
/// caller sees the policy violation. Every other status is not retryable.
pub fn is_retryable_response(
    method: &str,
    status: u16,
    headers: &HeaderMap,
    config: &RetryConfig,
) -> bool {
    if !config.retryable_statuses.contains(&status) {
        return false;
    }
    if status == 429 {
        return headers.contains_key(RETRY_AFTER);
    }
    config
        .idempotent_methods
        .contains(&method.to_ascii_uppercase())
}

/// Decide whether a request that timed out without a response is retryable.
pub fn is_retryable_timeout(method: &str, config: &RetryConfig) -> bool {
    config
        .idempotent_methods
        .contains(&method.to_ascii_uppercase())
        || config.retry_post_on_timeout
}

/// Parse a `Retry-After` header value into seconds.
///
/// Accepts a decimal number of seconds or an HTTP-date; a date in the past
/// and a negative number both clamp to zero. Returns `None` when the value
/// parses as neither form.
pub fn parse_retry_after_seconds(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(seconds) = value.parse::<f64>() {
        return Some(seconds.max(0.0));
    }
    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value) {
        let delta = date.with_timezone(&chrono::Utc) - chrono::Utc::now();
        let seconds = delta.num_milliseconds() as f64 / 1000.0;
        return Some(seconds.max(0.0));
    }
    None
}

/// Compute the delay in seconds before retry attempt `attempt` (1-based).
///
/// A parseable `Retry-After` wins, clamped into `[0, max_delay]`. Otherwise
/// the delay is drawn uniformly from `[0, min(max_delay, base * 2^(attempt-1))]`
/// (full jitter).
pub fn compute_retry_delay_seconds(
    attempt: u32,
    backoff_base: f64,
    max_delay: f64,
    retry_after: Option<&str>,
) -> f64 {
    compute_retry_delay_seconds_with(attempt, backoff_base, max_delay, retry_after, |window| {
        rand::thread_rng().gen_range(0.0..=window)
    })
}

/// [`compute_retry_delay_seconds`] with an explicit jitter sampler, mapping
/// the backoff window to a delay within it. Lets tests pin the sample.
pub fn compute_retry_delay_seconds_with<F>(
    attempt: u32,
    backoff_base: f64,
    max_delay: f64,
    retry_after: Option<&str>,
    sample: F,
) -> f64
where
    F: FnOnce(f64) -> f64,
{
    if let Some(hint) = retry_after.and_then(parse_retry_after_seconds) {
        return hint.clamp(0.0, max_delay);
    }
    let exponent = attempt.saturating_sub(1).min(31);
    let window = (backoff_base * f64::from(1u32 << exponent)).min(max_delay);
    sample(window.max(0.0))
}

/// `Retry-After` value from a response header map, if present and readable.
pub fn retry_after_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(RETRY_AFTER).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use reqwest::header::HeaderValue;

    fn headers_with_retry_after(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn idempotent_methods_retry_on_5xx_and_408() {
        let config = RetryConfig::default();
        let empty = HeaderMap::new();
        for method in DEFAULT_IDEMPOTENT_METHODS {
            for status in [500, 502, 503, 504, 408] {
                assert!(
                    is_retryable_response(method, status, &empty, &config),
                    "{method} {status} should be retryable"
                );
            }
        }
    }

    #[test]
    fn non_idempotent_methods_do_not_retry_on_5xx_and_408() {
        let config = RetryConfig::default();
        let empty = HeaderMap::new();
        for method in ["POST", "PATCH"] {
            for status in [500, 502, 503, 504, 408] {
                assert!(
                    !is_retryable_response(method, status, &empty, &config),
                    "{method} {status} should not be retryable"
                );
            }
        }
    }

    #[test]
    fn status_429_requires_retry_after_but_allows_any_method() {
        let config = RetryConfig::default();
        let with_hint = headers_with_retry_after("1");
        let without = HeaderMap::new();
        for method in ["GET", "POST", "PATCH", "DELETE"] {
            assert!(is_retryable_response(method, 429, &with_hint, &config));
            assert!(!is_retryable_response(method, 429, &without, &config));
        }
    }

    #[test]
    fn other_statuses_are_never_retryable() {
        let config = RetryConfig::default();
        let empty = HeaderMap::new();
        assert!(!is_retryable_response("GET", 418, &empty, &config));
        assert!(!is_retryable_response("GET", 404, &empty, &config));
        assert!(!is_retryable_response("GET", 200, &empty, &config));
    }

    #[test]
    fn method_is_case_normalized() {
        let config = RetryConfig::default();
        let empty = HeaderMap::new();
        assert!(is_retryable_response("get", 500, &empty, &config));
        assert!(is_retryable_response("Delete", 503, &empty, &config));
    }

    #[test]
    fn timeout_retry_follows_idempotency_and_opt_in() {
        let config = RetryConfig::default();
        assert!(is_retryable_timeout("GET", &config));
        assert!(!is_retryable_timeout("POST", &config));

        let opted_in = RetryConfig::default().with_retry_post_on_timeout(true);
        assert!(is_retryable_timeout("POST", &opted_in));
    }

    #[test]
    fn parse_retry_after_numeric_and_negative() {
        assert_eq!(parse_retry_after_seconds("1.5"), Some(1.5));
        assert_eq!(parse_retry_after_seconds("-3"), Some(0.0));
    }

    #[test]
    fn parse_retry_after_rejects_empty_and_garbage() {
        assert_eq!(parse_retry_after_seconds(""), None);
        assert_eq!(parse_retry_after_seconds("   "), None);
        assert_eq!(parse_retry_after_seconds("not-a-number"), None);
    }

    #[test]
    fn parse_retry_after_http_date_future_and_past() {
        let future = (Utc::now() + Duration::seconds(3)).to_rfc2822();
        let seconds = parse_retry_after_seconds(&future).expect("future date parses");
        assert!(seconds > 0.0 && seconds <= 3.5);

        let past = (Utc::now() - Duration::seconds(10)).to_rfc2822();
        assert_eq!(parse_retry_after_seconds(&past), Some(0.0));
    }

    #[test]
    fn delay_honors_retry_after_and_clamps_to_max() {
        let delay = compute_retry_delay_seconds(1, 0.25, 0.5, Some("5.0"));
        assert_eq!(delay, 0.5);
    }

    #[test]
    fn negative_retry_after_clamps_to_zero() {
        let delay = compute_retry_delay_seconds(1, 0.25, 10.0, Some("-5.0"));
        assert_eq!(delay, 0.0);
    }

    #[test]
    fn backoff_window_grows_exponentially_and_clamps() {
        // attempt=3 -> window = 0.25 * 2^2 = 1.0, clamped to 0.75
        let delay =
            compute_retry_delay_seconds_with(3, 0.25, 0.75, None, |window| window);
        assert_eq!(delay, 0.75);
    }

    #[test]
    fn unparseable_retry_after_falls_back_to_backoff() {
        let delay =
            compute_retry_delay_seconds_with(1, 0.25, 30.0, Some("soon"), |window| window);
        assert_eq!(delay, 0.25);
    }

    #[test]
    fn jittered_delay_stays_within_window() {
        for attempt in 1..=5 {
            let delay = compute_retry_delay_seconds(attempt, 0.1, 1.0, None);
            assert!((0.0..=1.0).contains(&delay));
        }
    }
}
