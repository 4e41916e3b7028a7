//! SQLite-backed versioned cache store for response snapshots.
//!
//! This module provides a persistent cache using SQLite with async access
//! via tokio-rusqlite. It supports:
//!
//! - Versioned regions: isolated namespaces keyed by a string tag, with
//!   exactly one region treated as current by callers
//! - Content-addressed entry keys using SHA-256 hashing
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Best-effort eviction of superseded regions

pub mod connection;
pub mod key;
pub mod migrations;
pub mod regions;
pub mod snapshot;

pub use crate::Error;

pub use connection::CacheDb;
pub use key::RequestIdentity;
pub use snapshot::ResponseSnapshot;
