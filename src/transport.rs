//! The request/response primitive the retry interceptor wraps.

use std::future::Future;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::Error;

/// Outbound request descriptor.
///
/// Bodies are buffered so the same request can be sent any number of times.
pub type Request = http::Request<Vec<u8>>;

/// Sends one request and returns one response.
///
/// Implementations never mutate the request and report network-level
/// failures as `Err`. Non-success status codes are ordinary responses.
pub trait Transport: Send + Sync {
    /// Response body type.
    type Body: Send;

    /// Perform a single attempt.
    fn proceed(
        &self,
        request: &Request,
    ) -> impl Future<Output = Result<http::Response<Self::Body>, Error>> + Send;
}

impl<T: Transport> Transport for &T {
    type Body = T::Body;

    fn proceed(
        &self,
        request: &Request,
    ) -> impl Future<Output = Result<http::Response<Self::Body>, Error>> + Send {
        (**self).proceed(request)
    }
}

/// [`Transport`] backed by `reqwest`.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use trmnl_mirror::{ReqwestTransport, Transport};
///
/// # async fn example() -> Result<(), trmnl_mirror::Error> {
/// let transport = ReqwestTransport::new(Duration::from_secs(10));
/// let request = http::Request::get("https://usetrmnl.com/api/current_screen")
///     .body(Vec::new())
///     .expect("valid request");
///
/// let response = transport.proceed(&request).await?;
/// println!("status: {}", response.status());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(crate::DEFAULT_TIMEOUT_SECS))
    }
}

impl ReqwestTransport {
    /// Create a transport with the given per-request timeout.
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { http }
    }

    /// Create a transport from client settings.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.timeout())
    }

    /// Use a custom HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }
}

impl Transport for ReqwestTransport {
    type Body = reqwest::Body;

    fn proceed(
        &self,
        request: &Request,
    ) -> impl Future<Output = Result<http::Response<Self::Body>, Error>> + Send {
        let prepared = to_reqwest(request);
        let client = self.http.clone();

        async move {
            let response = client.execute(prepared?).await?;

            let mut builder = http::Response::builder()
                .status(response.status())
                .version(response.version());
            if let Some(headers) = builder.headers_mut() {
                *headers = response.headers().clone();
            }

            builder
                .body(reqwest::Body::from(response))
                .map_err(|e| Error::Request(format!("invalid response: {}", e)))
        }
    }
}

/// Copy a borrowed request into a fresh `reqwest::Request`.
fn to_reqwest(request: &Request) -> Result<reqwest::Request, Error> {
    let uri = request.uri().to_string();
    let url = reqwest::Url::parse(&uri)
        .map_err(|e| Error::Request(format!("invalid URL '{}': {}", uri, e)))?;

    let mut out = reqwest::Request::new(request.method().clone(), url);
    *out.headers_mut() = request.headers().clone();
    if !request.body().is_empty() {
        *out.body_mut() = Some(reqwest::Body::from(request.body().clone()));
    }

    Ok(out)
}
