//! Request-interception decision engine for vigil.
//!
//! This crate provides the per-event decision logic of the caching worker:
//!
//! - Resource classification (document / static asset / dynamic / excluded)
//! - Caching strategies (network-first, cache-first, stale-while-revalidate)
//! - Lifecycle control (install-time pre-population, activation-time
//!   eviction, client takeover)
//! - Event dispatch (one handler per event kind, testable without an
//!   event loop)
//!
//! Persistence and shared types live in `vigil-core`.

pub mod classify;
pub mod dispatch;
pub mod fetch;
pub mod lifecycle;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testutil;

pub use classify::{Classification, Request, classify};
pub use dispatch::{EventDispatcher, FetchAction, Notification};
pub use fetch::{Fetch, HttpFetcher};
pub use lifecycle::{ClientRegistry, LifecycleController, WorkerState};
pub use strategy::{Resolved, StrategyEngine};
