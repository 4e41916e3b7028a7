//! Network fetch behind a trait seam.
//!
//! Strategies and the lifecycle controller talk to the network through
//! [`Fetch`] so they can be unit tested against a scripted implementation.
//! The real implementation wraps a reqwest client.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Instant;

use crate::classify::Request;
use vigil_core::{Error, ResponseSnapshot, WorkerConfig};

/// Maximum redirects followed per fetch.
const MAX_REDIRECTS: usize = 5;

/// Asynchronous network fetch.
///
/// `Ok` carries a snapshot for any HTTP response, including 4xx/5xx; `Err`
/// means the transport itself failed (DNS, connect, TLS, timeout, read).
/// The distinction matters to the strategies: non-ok responses pass through
/// to the requester uncached, transport failures trigger cache fallbacks.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot, Error>;
}

/// HTTP fetcher backed by reqwest.
pub struct HttpFetcher {
    http: Client,
    max_bytes: usize,
}

impl HttpFetcher {
    /// Create a new fetcher from the worker configuration.
    pub fn new(config: &WorkerConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, max_bytes: config.max_bytes })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot, Error> {
        let start = Instant::now();

        let mut builder = self.http.get(request.url.as_str());
        if let Some(accept) = &request.accept {
            builder = builder.header("Accept", accept);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(format!("network error: {}", e)))?;

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or("").to_string();

        if let Some(len) = response.content_length()
            && len as usize > self.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.max_bytes)));
        }

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.max_bytes)));
        }

        tracing::debug!(
            "fetched {} -> {} in {}ms ({} bytes)",
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(ResponseSnapshot::new(status.as_u16(), status_text, headers, bytes.to_vec()))
    }
}
