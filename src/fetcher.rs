use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE, LOCATION};
use reqwest::{Client, Method};
use tokio::time::Instant;
use tracing::debug;
use url::Url;

use crate::error::FetchError;
use crate::types::{RedirectHop, ScanTarget};

/// Identifying user agent sent with every probe.
pub const DEFAULT_USER_AGENT: &str = "HTTPxray-Mini/2.0";

/// Fixed per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 30;

/// Statuses whose `Location` is followed; any other 3xx is a final response.
fn is_followed_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Final response of one fetch, with the hops that led to it.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: u16,
    pub elapsed: Duration,
    pub byte_size: u64,
    pub headers: HeaderMap,
    pub body: String,
    pub redirects: Vec<RedirectHop>,
}

impl FetchedResponse {
    /// Case-insensitive header lookup; non-UTF-8 values count as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

/// Performs one HTTP exchange for a target.
///
/// Implementations must not panic on transport problems; every failure
/// comes back as a `FetchError`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        target: &ScanTarget,
        timeout: Duration,
    ) -> Result<FetchedResponse, FetchError>;
}

/// `reqwest`-backed fetcher that follows redirects itself so each hop is recorded.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        target: &ScanTarget,
        timeout: Duration,
    ) -> Result<FetchedResponse, FetchError> {
        let start = Instant::now();
        let method = Method::from_bytes(target.method.as_bytes()).unwrap_or(Method::GET);
        let mut current = Url::parse(&target.url).map_err(|source| FetchError::InvalidUrl {
            url: target.url.clone(),
            source,
        })?;
        let mut redirects = Vec::new();

        loop {
            let response = self
                .client
                .request(method.clone(), current.clone())
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| request_error(&current, &e))?;

            let status = response.status();
            if is_followed_redirect(status.as_u16()) {
                // Without a Location the 3xx itself is the final response.
                if let Some(location) = response.headers().get(LOCATION) {
                    let next = location
                        .to_str()
                        .ok()
                        .and_then(|loc| current.join(loc).ok())
                        .ok_or_else(|| FetchError::BadRedirect {
                            url: current.to_string(),
                        })?;
                    if redirects.len() >= MAX_REDIRECTS {
                        return Err(FetchError::TooManyRedirects {
                            url: target.url.clone(),
                            hops: redirects.len(),
                        });
                    }
                    debug!(from = %current, to = %next, status = status.as_u16(), "following redirect");
                    redirects.push(RedirectHop {
                        url: current.to_string(),
                        status: status.as_u16(),
                    });
                    current = next;
                    continue;
                }
            }

            let headers = response.headers().clone();
            let bytes = response
                .bytes()
                .await
                .map_err(|e| request_error(&current, &e))?;
            let elapsed = start.elapsed();
            debug!(url = %current, status = status.as_u16(), bytes = bytes.len(), "fetched");

            return Ok(FetchedResponse {
                status: status.as_u16(),
                elapsed,
                byte_size: bytes.len() as u64,
                headers,
                body: String::from_utf8_lossy(&bytes).into_owned(),
                redirects,
            });
        }
    }
}

fn request_error(url: &Url, err: &reqwest::Error) -> FetchError {
    FetchError::Request {
        url: url.to_string(),
        message: error_chain(err),
    }
}

/// Flatten an error and its sources into one line.
fn error_chain(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}
