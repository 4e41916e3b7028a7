//! Resource classification: maps an inbound request to a caching strategy.
//!
//! Classification is a pure function of the request method, URL host/path,
//! and Accept header. Rule order is a contract: exclusion and document
//! checks run before the extension check, so backend traffic is never
//! intercepted regardless of its Accept header and HTML served from an
//! asset-like path is still treated as a document.

use url::Url;
use vigil_core::{RequestIdentity, WorkerConfig};

/// An inbound request at the interception boundary.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub accept: Option<String>,
}

impl Request {
    /// A plain GET request with no Accept header.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".to_string(), url, accept: None }
    }

    /// A navigational GET request accepting HTML.
    pub fn document(url: Url) -> Self {
        Self {
            method: "GET".to_string(),
            url,
            accept: Some("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string()),
        }
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Normalized cache key for this request.
    ///
    /// The vary component is always empty at the interception boundary:
    /// entries are keyed on method + URL alone until a cached response
    /// carrying a Vary header needs to discriminate, which none of the
    /// current strategies do. The dimension stays in [`RequestIdentity`]
    /// so stored keys survive if that changes.
    pub fn identity(&self) -> RequestIdentity {
        RequestIdentity {
            method: self.method.to_uppercase(),
            url: self.url.to_string(),
            vary: String::new(),
        }
    }
}

/// The derived category determining which caching strategy applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Navigational HTML: network-first with shell fallback.
    Document,
    /// Immutable asset (fonts, icons, CDN styles): cache-first.
    StaticAsset,
    /// Everything else: stale-while-revalidate.
    Dynamic,
    /// Never intercepted; default network handling proceeds.
    Excluded,
}

/// Classify a request. Total for GET requests; non-GET is always Excluded.
pub fn classify(config: &WorkerConfig, request: &Request) -> Classification {
    if !request.is_get() {
        return Classification::Excluded;
    }

    let host = request.url.host_str().unwrap_or("");
    let path = request.url.path();

    if config.backend_hosts.iter().any(|m| host.contains(m.as_str())) {
        return Classification::Excluded;
    }
    if config.gated_api_hosts.iter().any(|m| host.contains(m.as_str())) && path.contains(&config.gated_api_segment) {
        return Classification::Excluded;
    }

    if request.accept.as_deref().is_some_and(|a| a.contains("text/html")) {
        return Classification::Document;
    }

    if config.asset_hosts.iter().any(|m| host.contains(m.as_str()))
        || path_extension(path).is_some_and(|ext| config.asset_extensions.iter().any(|e| *e == ext))
    {
        return Classification::StaticAsset;
    }

    Classification::Dynamic
}

/// Lowercased extension of the final path segment, if any.
fn path_extension(path: &str) -> Option<String> {
    let segment = path.rsplit('/').next()?;
    let (_, ext) = segment.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
