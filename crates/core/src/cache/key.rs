//! Request identity: the normalized key used to index cached entries.

use sha2::{Digest, Sha256};

/// Normalized identity of an interceptable request.
///
/// Two requests with the same method, absolute URL, and relevant vary
/// headers map to the same cached entry. The vary component is the
/// serialized values of the headers a cached response varies on; it is
/// empty for the common case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    pub method: String,
    pub url: String,
    pub vary: String,
}

impl RequestIdentity {
    /// Identity for a plain GET with no vary component.
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: "GET".to_string(), url: url.into(), vary: String::new() }
    }

    /// Compute the content-addressed entry key for this identity.
    pub fn key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.url.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.vary.as_bytes());
        hex::encode(hasher.finalize())
    }
}
