//! Response snapshots: the full value stored per cached entry.

use serde::{Deserialize, Serialize};

/// A cached response snapshot.
///
/// Captures everything needed to replay a response without the network:
/// status line, headers, and body bytes. Snapshots are cloned before being
/// handed to the store so the caller's copy stays consumable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ResponseSnapshot {
    /// Build a snapshot from parts.
    pub fn new(status: u16, status_text: impl Into<String>, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self { status, status_text: status_text.into(), headers, body }
    }

    /// Whether the status is in the successful range (200-299).
    ///
    /// Only ok snapshots are ever written to the cache; non-ok responses
    /// pass through to the caller uncached.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value matching `name`, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Serialize headers for storage.
    pub(crate) fn headers_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status: u16) -> ResponseSnapshot {
        ResponseSnapshot::new(
            status,
            "OK",
            vec![("Content-Type".to_string(), "text/html".to_string())],
            b"<html></html>".to_vec(),
        )
    }

    #[test]
    fn test_is_ok_bounds() {
        assert!(snapshot(200).is_ok());
        assert!(snapshot(204).is_ok());
        assert!(snapshot(299).is_ok());
        assert!(!snapshot(199).is_ok());
        assert!(!snapshot(301).is_ok());
        assert!(!snapshot(404).is_ok());
        assert!(!snapshot(500).is_ok());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let snap = snapshot(200);
        assert_eq!(snap.header("content-type"), Some("text/html"));
        assert_eq!(snap.header("CONTENT-TYPE"), Some("text/html"));
        assert_eq!(snap.header("etag"), None);
    }

    #[test]
    fn test_headers_json_roundtrip() {
        let snap = snapshot(200);
        let json = snap.headers_json().unwrap();
        let parsed: Vec<(String, String)> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snap.headers);
    }
}
