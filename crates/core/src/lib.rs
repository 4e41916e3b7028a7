//! Core types and shared functionality for vigil.
//!
//! This crate provides:
//! - Versioned cache store with SQLite backend
//! - Request identity hashing and response snapshots
//! - Unified error types
//! - Layered worker configuration

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, RequestIdentity, ResponseSnapshot};
pub use config::{CacheConfig, WorkerConfig};
pub use error::Error;
