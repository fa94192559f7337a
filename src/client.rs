//! TRMNL client for mirroring what a device is displaying.

use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::display::{CurrentScreen, DeviceInfo, DisplayResponse};
use crate::error::Error;
use crate::retry::RateLimitRetry;
use crate::sleep::{Cancellation, TokioSleeper};
use crate::transport::{ReqwestTransport, Request, Transport};

/// Header carrying the device API key.
const ACCESS_TOKEN_HEADER: &str = "access-token";

/// TRMNL client for fetching the current display image.
///
/// Every request goes through [`RateLimitRetry`], so HTTP 429 responses are
/// retried with backoff before an error is reported.
///
/// # Example
///
/// ```rust,no_run
/// use trmnl_mirror::{ClientConfig, DisplayClient};
///
/// # async fn example() -> Result<(), trmnl_mirror::Error> {
/// let client = DisplayClient::new(ClientConfig::new("your-device-api-key"));
///
/// let screen = client.current_screen().await?;
/// println!("Showing {} (next poll in {:?})", screen.image_url, screen.refresh_interval());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DisplayClient<T = RateLimitRetry<ReqwestTransport>> {
    transport: T,
    config: ClientConfig,
}

impl DisplayClient {
    /// Create a client with the default reqwest transport and retry policy.
    pub fn new(config: ClientConfig) -> Self {
        let transport =
            RateLimitRetry::new(ReqwestTransport::from_config(&config)).with_config(config.retry);

        Self { transport, config }
    }

    /// Create a client from `TRMNL_*` environment variables.
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self, Error> {
        Ok(Self::new(ClientConfig::from_env()?))
    }

    /// Abort backoff waits when `cancellation` is raised.
    ///
    /// A cancelled wait fails the request with an interrupted I/O error.
    #[must_use]
    pub fn with_cancellation(self, cancellation: Cancellation) -> Self {
        let transport = self
            .transport
            .with_sleeper(TokioSleeper::new().with_cancellation(cancellation));

        Self {
            transport,
            config: self.config,
        }
    }
}

impl<T> DisplayClient<T> {
    /// Use a custom transport (useful for testing).
    ///
    /// The transport is used as-is; wrap it in [`RateLimitRetry`] to keep
    /// retrying on rate limits.
    pub fn with_transport<U: Transport>(self, transport: U) -> DisplayClient<U> {
        DisplayClient {
            transport,
            config: self.config,
        }
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl<T> DisplayClient<T>
where
    T: Transport,
    T::Body: Into<reqwest::Body>,
{
    /// Get the image the device is currently showing.
    ///
    /// Does not advance the device playlist.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The HTTP request fails
    /// - Rate limit is still exceeded after all retries
    /// - The API returns an error status
    /// - The payload has no usable image
    pub async fn current_screen(&self) -> Result<CurrentScreen, Error> {
        let request = self.build_request("/api/current_screen", None)?;
        let screen: CurrentScreen = self.fetch_json(&request).await?;

        if !screen.is_ok() {
            return Err(Error::Display {
                status: screen.status,
                message: screen.error.unwrap_or_else(|| "no image available".to_string()),
            });
        }

        tracing::info!("Fetched current TRMNL screen: {}", screen.image_url);
        Ok(screen)
    }

    /// Ask the server for the next display, as the device would.
    ///
    /// Sends device headers from `device`, or just the configured device ID
    /// when `device` is `None`. On the hosted API this advances the playlist.
    pub async fn next_display(
        &self,
        device: Option<&DeviceInfo>,
    ) -> Result<DisplayResponse, Error> {
        let fallback = self.config.device_id.as_deref().map(DeviceInfo::new);
        let device = device.or(fallback.as_ref());

        let request = self.build_request("/api/display", device)?;
        let response: DisplayResponse = self.fetch_json(&request).await?;

        if !response.is_ok() {
            return Err(Error::Display {
                status: response.status,
                message: response
                    .error
                    .unwrap_or_else(|| "no image available".to_string()),
            });
        }

        tracing::info!("Fetched TRMNL display: {}", response.image_url);
        Ok(response)
    }

    /// Download the raw bytes of a display image.
    ///
    /// The access token is only sent when the image is served by the
    /// configured server.
    pub async fn download_image(&self, image_url: &str) -> Result<Vec<u8>, Error> {
        let mut builder = http::Request::get(image_url);
        if self.is_configured_server(image_url) {
            builder = builder.header(ACCESS_TOKEN_HEADER, &self.config.access_token);
        }
        let request = builder
            .body(Vec::new())
            .map_err(|e| Error::Request(format!("invalid image URL '{}': {}", image_url, e)))?;

        let response = self.send(&request).await?;
        let bytes = response.bytes().await?;

        tracing::debug!("Downloaded {} bytes from {}", bytes.len(), image_url);
        Ok(bytes.to_vec())
    }

    /// Whether `url` has the same scheme, host and port as the base URL.
    fn is_configured_server(&self, url: &str) -> bool {
        let (Ok(base), Ok(target)) = (
            reqwest::Url::parse(&self.config.base_url),
            reqwest::Url::parse(url),
        ) else {
            return false;
        };

        base.scheme() == target.scheme()
            && base.host_str().is_some()
            && base.host_str() == target.host_str()
            && base.port_or_known_default() == target.port_or_known_default()
    }

    fn build_request(&self, path: &str, device: Option<&DeviceInfo>) -> Result<Request, Error> {
        let url = format!("{}{}", self.config.base_url, path);

        let mut builder = http::Request::get(&url)
            .header(http::header::ACCEPT, "application/json")
            .header(ACCESS_TOKEN_HEADER, &self.config.access_token);

        if let Some(device) = device {
            for (name, value) in device.headers() {
                builder = builder.header(name, value);
            }
        }

        builder
            .body(Vec::new())
            .map_err(|e| Error::Request(format!("invalid request for '{}': {}", url, e)))
    }

    /// Send through the transport and reject non-success statuses.
    async fn send(&self, request: &Request) -> Result<reqwest::Response, Error> {
        let response = reqwest::Response::from(self.transport.proceed(request).await?);
        let status = response.status();

        if status.as_u16() == self.config.retry.rate_limit_status {
            return Err(Error::RateLimited);
        }

        if !status.is_success() {
            let status = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, body });
        }

        Ok(response)
    }

    async fn fetch_json<D: DeserializeOwned>(&self, request: &Request) -> Result<D, Error> {
        let response = self.send(request).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
