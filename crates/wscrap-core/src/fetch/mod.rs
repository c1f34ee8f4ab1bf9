//! Remote page retrieval.
//!
//! Uses the curl crate (libcurl) for a plain blocking GET. Each call builds
//! its own easy handle, so one fetcher can be shared by all inner task
//! threads of a worker.

use std::sync::Arc;
use std::time::Duration;

/// Failure retrieving an article page. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported URL scheme {scheme:?}: {url}")]
    UnsupportedScheme { url: String, scheme: String },
    #[error("transport error: {0}")]
    Transport(#[from] curl::Error),
    #[error("HTTP {status}: {url}")]
    Status { url: String, status: u32 },
}

/// Retrieves the raw content behind a URL.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        (**self).fetch(url)
    }
}

/// Blocking libcurl fetcher bounded by a per-request timeout.
#[derive(Debug, Clone, Copy)]
pub struct CurlFetcher {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl CurlFetcher {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            request_timeout,
            connect_timeout: request_timeout.min(Duration::from_secs(15)),
        }
    }
}

impl Fetcher for CurlFetcher {
    /// GET `url`, following redirects. Non-2xx is an error; the body is
    /// decoded as UTF-8 with invalid sequences replaced.
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        check_url(url)?;

        let mut body: Vec<u8> = Vec::new();
        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.request_timeout)?;
        // Let libcurl negotiate and decode gzip/deflate/br.
        easy.accept_encoding("")?;
        easy.useragent(concat!("wscrap/", env!("CARGO_PKG_VERSION")))?;

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let status = easy.response_code()?;
        if !(200..300).contains(&status) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// Reject anything that is not an absolute http(s) URL before doing I/O.
fn check_url(url: &str) -> Result<(), FetchError> {
    let parsed = url::Url::parse(url).map_err(|source| FetchError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(FetchError::UnsupportedScheme {
            url: url.to_string(),
            scheme: other.to_string(),
        }),
    }
}
