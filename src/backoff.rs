//! Backoff delay calculation for rate-limited requests.
//!
//! A server-supplied `Retry-After` header (whole seconds) always wins.
//! Without one, the delay grows exponentially with the attempt number and
//! is scaled by a random factor in `[0.5, 1.0]` so that many clients hitting
//! the same limit do not retry in lockstep. Either way the result never
//! exceeds the configured ceiling.
//!
//! HTTP-date `Retry-After` values are not supported and fall back to the
//! exponential path.

use std::time::Duration;

use http::header::RETRY_AFTER;
use http::HeaderMap;

use crate::config::RetryConfig;

/// Source of randomness for backoff jitter.
pub trait Jitter: Send + Sync {
    /// Return a value in `[0, 1]`.
    fn sample(&self) -> f64;
}

/// Jitter drawn from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngJitter;

impl Jitter for ThreadRngJitter {
    fn sample(&self) -> f64 {
        rand::random::<f64>()
    }
}

/// Constant jitter, for reproducible delays.
///
/// `FixedJitter(1.0)` disables jitter entirely (full exponential delay),
/// `FixedJitter(0.0)` always picks the shortest delay (half).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedJitter(pub f64);

impl Jitter for FixedJitter {
    fn sample(&self) -> f64 {
        self.0.clamp(0.0, 1.0)
    }
}

/// Parse a `Retry-After` header given in whole seconds.
///
/// Returns `None` when the header is missing or not a non-negative integer.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use http::{HeaderMap, HeaderValue};
/// use trmnl_mirror::backoff::parse_retry_after;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("retry-after", HeaderValue::from_static("3"));
/// assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(3)));
///
/// headers.insert("retry-after", HeaderValue::from_static("Wed, 21 Oct 2025 07:28:00 GMT"));
/// assert_eq!(parse_retry_after(&headers), None);
/// ```
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Unjittered exponential delay for a 1-indexed retry attempt, capped.
///
/// `initial_backoff * 2^(attempt - 1)`; attempt 0 is treated as 1.
pub fn exponential_backoff(attempt: u32, config: &RetryConfig) -> Duration {
    let exp = attempt.saturating_sub(1);
    let factor = 1u64.checked_shl(exp).unwrap_or(u64::MAX);
    let ms = config
        .initial_backoff_ms
        .saturating_mul(factor)
        .min(config.max_backoff_ms);
    Duration::from_millis(ms)
}

/// Delay to wait before retry `attempt` (1-indexed) of a rate-limited request.
///
/// `headers` are the headers of the 429 response that triggered the retry.
pub fn backoff_delay(
    attempt: u32,
    headers: &HeaderMap,
    config: &RetryConfig,
    jitter: &impl Jitter,
) -> Duration {
    let ceiling = config.max_backoff();

    if let Some(hint) = parse_retry_after(headers) {
        return hint.min(ceiling);
    }

    // Jitter applies to the uncapped value; the ceiling is enforced last.
    let exp = attempt.saturating_sub(1).min(63) as i32;
    let factor = 0.5 + 0.5 * jitter.sample().clamp(0.0, 1.0);
    let ms = config.initial_backoff_ms as f64 * 2f64.powi(exp) * factor;
    let ms = ms.min(config.max_backoff_ms as f64);

    Duration::from_millis(ms as u64).min(ceiling)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn retry_after(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_exponential_growth_and_cap() {
        let config = RetryConfig::default();
        let expected = [1000, 2000, 4000, 8000, 16000, 32000];

        for (i, ms) in expected.iter().enumerate() {
            let attempt = i as u32 + 1;
            assert_eq!(
                exponential_backoff(attempt, &config),
                Duration::from_millis(*ms),
                "attempt {attempt}"
            );
        }

        assert_eq!(exponential_backoff(7, &config), config.max_backoff());
        assert_eq!(exponential_backoff(200, &config), config.max_backoff());
    }

    #[test]
    fn test_jitter_bounds() {
        let config = RetryConfig::default();
        let empty = HeaderMap::new();

        for attempt in 1..=6 {
            let base = exponential_backoff(attempt, &config);
            let low = backoff_delay(attempt, &empty, &config, &FixedJitter(0.0));
            let high = backoff_delay(attempt, &empty, &config, &FixedJitter(1.0));

            assert_eq!(low, base / 2);
            assert_eq!(high, base);
        }
    }

    #[test]
    fn test_random_jitter_stays_in_range() {
        let config = RetryConfig::default();
        let empty = HeaderMap::new();

        for attempt in 1..=6 {
            let base = exponential_backoff(attempt, &config);
            for _ in 0..50 {
                let delay = backoff_delay(attempt, &empty, &config, &ThreadRngJitter);
                assert!(delay >= base / 2, "{delay:?} below half of {base:?}");
                assert!(delay <= base);
                assert!(delay <= config.max_backoff());
            }
        }
    }

    #[test]
    fn test_large_attempts_never_exceed_ceiling() {
        let config = RetryConfig::default();
        let empty = HeaderMap::new();

        for attempt in [7, 10, 64, 1000, u32::MAX] {
            let delay = backoff_delay(attempt, &empty, &config, &FixedJitter(0.0));
            assert_eq!(delay, config.max_backoff(), "attempt {attempt}");
        }
    }

    #[test]
    fn test_retry_after_takes_precedence() {
        let config = RetryConfig::default();
        let headers = retry_after("3");

        for attempt in [1, 4, 6] {
            assert_eq!(
                backoff_delay(attempt, &headers, &config, &FixedJitter(0.0)),
                Duration::from_millis(3000)
            );
        }
    }

    #[test]
    fn test_retry_after_capped() {
        let config = RetryConfig::default();
        assert_eq!(
            backoff_delay(1, &retry_after("120"), &config, &FixedJitter(1.0)),
            Duration::from_millis(32_000)
        );
        assert_eq!(
            backoff_delay(1, &retry_after("0"), &config, &FixedJitter(1.0)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_http_date_falls_back_to_exponential() {
        let config = RetryConfig::default();
        let headers = retry_after("Wed, 21 Oct 2025 07:28:00 GMT");

        assert_eq!(parse_retry_after(&headers), None);
        assert_eq!(
            backoff_delay(2, &headers, &config, &FixedJitter(1.0)),
            Duration::from_millis(2000)
        );
    }

    #[test]
    fn test_parse_retry_after_edge_cases() {
        assert_eq!(parse_retry_after(&HeaderMap::new()), None);
        assert_eq!(parse_retry_after(&retry_after("-1")), None);
        assert_eq!(parse_retry_after(&retry_after("1.5")), None);
        assert_eq!(
            parse_retry_after(&retry_after(" 7 ")),
            Some(Duration::from_secs(7))
        );
    }

    #[test]
    fn test_fixed_jitter_clamps() {
        assert_eq!(FixedJitter(3.0).sample(), 1.0);
        assert_eq!(FixedJitter(-1.0).sample(), 0.0);
    }
}
