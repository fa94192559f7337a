//! # trmnl-mirror
//!
//! Mirror what a [TRMNL](https://usetrmnl.com) e-ink display is showing,
//! from the hosted API or from a BYOS (Bring Your Own Server) backend.
//!
//! TRMNL servers rate limit aggressively. Every request made by this crate
//! goes through [`RateLimitRetry`], which retries HTTP 429 responses with
//! exponential backoff and jitter, honoring `Retry-After` hints:
//!
//! | Retry | Delay without `Retry-After` |
//! |-------|-----------------------------|
//! | 1 | 0.5 - 1 s |
//! | 2 | 1 - 2 s |
//! | 3 | 2 - 4 s |
//! | 4 | 4 - 8 s |
//! | 5 | 8 - 16 s |
//!
//! A `Retry-After: <seconds>` header replaces the computed delay. No single
//! wait exceeds 32 seconds. After 5 retries the last 429 is returned.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use trmnl_mirror::{ClientConfig, DisplayClient};
//!
//! # async fn example() -> Result<(), trmnl_mirror::Error> {
//! let config = ClientConfig::new("your-device-api-key")
//!     .with_base_url("https://byos.example.com");
//! let client = DisplayClient::new(config);
//!
//! let screen = client.current_screen().await?;
//! let png = client.download_image(&screen.image_url).await?;
//! println!("{} bytes, refresh in {:?}", png.len(), screen.refresh_interval());
//! # Ok(())
//! # }
//! ```
//!
//! ## Using the interceptor directly
//!
//! [`RateLimitRetry`] wraps any [`Transport`]. The delay primitive
//! ([`Sleeper`]) and jitter source ([`Jitter`]) are generic parameters, so
//! tests can swap in recording or fixed implementations.
//!
//! ## Feature Flags
//!
//! - `yaml` - Load [`ClientConfig`] from YAML files
//! - `full` - All features

pub mod backoff;
mod client;
mod config;
mod display;
mod error;
pub mod retry;
pub mod sleep;
pub mod transport;

pub use backoff::{backoff_delay, FixedJitter, Jitter, ThreadRngJitter};
pub use client::DisplayClient;
pub use config::{ClientConfig, RetryConfig};
pub use display::{CurrentScreen, DeviceInfo, DisplayResponse};
pub use error::Error;
pub use retry::RateLimitRetry;
pub use sleep::{Cancellation, Interrupted, Sleeper, TokioSleeper};
pub use transport::{ReqwestTransport, Request, Transport};

/// Hosted TRMNL API base URL
pub const DEFAULT_BASE_URL: &str = "https://usetrmnl.com";

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Retries after the initial attempt before giving up on a rate limit
pub const MAX_RETRIES: u32 = 5;

/// Base delay for exponential backoff in milliseconds
pub const INITIAL_BACKOFF_MS: u64 = 1_000;

/// Upper bound for a single backoff delay in milliseconds
pub const MAX_BACKOFF_MS: u64 = 32_000;

/// HTTP status that triggers a retry (Too Many Requests)
pub const RATE_LIMIT_STATUS: u16 = 429;

/// Refresh rate assumed when the server sends none (seconds)
pub const DEFAULT_REFRESH_SECS: u32 = 300;

/// Shortest refresh interval honored (seconds)
pub const MIN_REFRESH_SECS: u32 = 1;
