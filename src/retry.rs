//! Retry-on-429 interceptor.
//!
//! [`RateLimitRetry`] wraps any [`Transport`] and resends the same request
//! when the server answers with HTTP 429, waiting between attempts as
//! computed by [`backoff_delay`](crate::backoff::backoff_delay).
//!
//! - Only the rate-limit status triggers a retry. Other statuses and
//!   transport errors are returned to the caller untouched.
//! - Each rate-limited response is dropped before the wait begins.
//! - Once the retry budget is spent, the final 429 response is returned as
//!   `Ok`; the caller decides what to do with it.
//! - An interrupted wait fails the exchange with [`Error::Io`] of kind
//!   [`std::io::ErrorKind::Interrupted`].

use std::future::Future;
use std::io;

use crate::backoff::{backoff_delay, Jitter, ThreadRngJitter};
use crate::config::RetryConfig;
use crate::error::Error;
use crate::sleep::{Sleeper, TokioSleeper};
use crate::transport::{Request, Transport};

/// Transport wrapper that retries rate-limited requests.
///
/// Holds no per-request state, so one instance can serve concurrent
/// exchanges.
///
/// # Example
///
/// ```rust,no_run
/// use trmnl_mirror::{RateLimitRetry, ReqwestTransport, RetryConfig, Transport};
///
/// # async fn example() -> Result<(), trmnl_mirror::Error> {
/// let transport = RateLimitRetry::new(ReqwestTransport::default())
///     .with_config(RetryConfig::default().with_max_retries(3));
///
/// let request = http::Request::get("https://usetrmnl.com/api/current_screen")
///     .header("access-token", "your-api-key")
///     .body(Vec::new())
///     .expect("valid request");
///
/// // Still a 429 here means every retry was rate limited too
/// let response = transport.proceed(&request).await?;
/// println!("final status: {}", response.status());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RateLimitRetry<T, S = TokioSleeper, J = ThreadRngJitter> {
    inner: T,
    config: RetryConfig,
    sleeper: S,
    jitter: J,
}

impl<T> RateLimitRetry<T> {
    /// Wrap a transport with the default policy, timer and jitter.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            config: RetryConfig::default(),
            sleeper: TokioSleeper::new(),
            jitter: ThreadRngJitter,
        }
    }
}

impl<T, S, J> RateLimitRetry<T, S, J> {
    /// Set the retry policy.
    #[must_use]
    pub fn with_config(mut self, config: RetryConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the delay primitive.
    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> RateLimitRetry<T, S2, J> {
        RateLimitRetry {
            inner: self.inner,
            config: self.config,
            sleeper,
            jitter: self.jitter,
        }
    }

    /// Replace the jitter source.
    pub fn with_jitter<J2: Jitter>(self, jitter: J2) -> RateLimitRetry<T, S, J2> {
        RateLimitRetry {
            inner: self.inner,
            config: self.config,
            sleeper: self.sleeper,
            jitter,
        }
    }

    /// Get the retry policy.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Get the wrapped transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T, S, J> RateLimitRetry<T, S, J>
where
    T: Transport,
    S: Sleeper,
    J: Jitter,
{
    async fn execute(&self, request: &Request) -> Result<http::Response<T::Body>, Error> {
        let rate_limited = self.config.rate_limit_status;
        let mut attempt: u32 = 0;

        loop {
            let response = self.inner.proceed(request).await?;

            if response.status().as_u16() != rate_limited {
                if attempt > 0 {
                    tracing::debug!(
                        "{} {} succeeded after {} retries (status {})",
                        request.method(),
                        request.uri(),
                        attempt,
                        response.status()
                    );
                }
                return Ok(response);
            }

            if attempt >= self.config.max_retries {
                tracing::error!(
                    "Rate limit retries exhausted for {} after {} attempts",
                    request.uri(),
                    attempt + 1
                );
                return Ok(response);
            }

            attempt += 1;
            let delay = backoff_delay(attempt, response.headers(), &self.config, &self.jitter);
            drop(response);

            tracing::warn!(
                "Rate limited by {}, retry {}/{} in {}ms",
                request.uri(),
                attempt,
                self.config.max_retries,
                delay.as_millis()
            );

            if let Err(interrupted) = self.sleeper.sleep(delay).await {
                tracing::warn!(
                    "Backoff wait for {} interrupted before retry {}",
                    request.uri(),
                    attempt
                );
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::Interrupted,
                    interrupted,
                )));
            }
        }
    }
}

impl<T, S, J> Transport for RateLimitRetry<T, S, J>
where
    T: Transport,
    S: Sleeper,
    J: Jitter,
{
    type Body = T::Body;

    fn proceed(
        &self,
        request: &Request,
    ) -> impl Future<Output = Result<http::Response<Self::Body>, Error>> + Send {
        self.execute(request)
    }
}
