//! Event dispatcher: one method per event kind.
//!
//! Each handler is a plain async method over (event, shared services)
//! returning an action, so the decision logic is testable without a
//! running event loop. Fetch events either respond with a strategy
//! outcome or decline to intercept, letting default network handling
//! proceed.

use std::sync::Arc;

use serde::Deserialize;

use crate::classify::{Classification, Request, classify};
use crate::fetch::Fetch;
use crate::lifecycle::{ClientRegistry, LifecycleController, WorkerState};
use crate::strategy::{Resolved, StrategyEngine};
use vigil_core::{CacheDb, Error, WorkerConfig};

/// Sync tag for queued offline posts. Replay is a stub integration point.
const SYNC_POSTS_TAG: &str = "sync-posts";

/// Outcome of a fetch event.
#[derive(Debug)]
pub enum FetchAction {
    /// Decline to intercept; the request goes to the network unmediated.
    Passthrough,
    /// Respond with a strategy outcome.
    Respond(Resolved),
}

/// A notification ready for display, with fixed metadata from config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub dir: String,
    pub lang: String,
}

/// Push payload shape: `{title, body}`, both optional.
#[derive(Debug, Deserialize)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
}

/// Routes worker events to the lifecycle controller and strategy engine.
pub struct EventDispatcher {
    lifecycle: LifecycleController,
    engine: StrategyEngine,
    config: Arc<WorkerConfig>,
}

impl EventDispatcher {
    pub fn new(store: CacheDb, fetcher: Arc<dyn Fetch>, config: Arc<WorkerConfig>) -> Result<Self, Error> {
        let engine = StrategyEngine::new(store.clone(), Arc::clone(&fetcher), &config)?;
        let lifecycle = LifecycleController::new(store, fetcher, Arc::clone(&config));
        Ok(Self { lifecycle, engine, config })
    }

    pub fn state(&self) -> WorkerState {
        self.lifecycle.state()
    }

    pub fn clients(&self) -> &ClientRegistry {
        self.lifecycle.clients()
    }

    pub async fn on_install(&mut self) -> Result<(), Error> {
        self.lifecycle.install().await
    }

    pub async fn on_activate(&mut self) -> Result<(), Error> {
        self.lifecycle.activate().await
    }

    /// Handle a fetch event.
    ///
    /// Excluded classifications (non-GET, backend hosts) are not
    /// intercepted. Everything else runs the strategy matching its
    /// classification; network errors with no cached recovery propagate
    /// to the requester.
    pub async fn on_fetch(&self, request: &Request) -> Result<FetchAction, Error> {
        match classify(&self.config, request) {
            Classification::Excluded => {
                tracing::debug!(url = %request.url, method = %request.method, "not intercepting");
                Ok(FetchAction::Passthrough)
            }
            Classification::Document => Ok(FetchAction::Respond(self.engine.network_first(request).await?)),
            Classification::StaticAsset => Ok(FetchAction::Respond(self.engine.cache_first(request).await?)),
            Classification::Dynamic => Ok(FetchAction::Respond(self.engine.stale_while_revalidate(request).await?)),
        }
    }

    /// Handle a push event.
    ///
    /// Parses a JSON `{title, body}` payload and returns a notification
    /// with the configured fixed metadata. An absent or malformed payload
    /// is a no-op, not an error.
    pub fn on_push(&self, payload: Option<&[u8]>) -> Option<Notification> {
        let data = payload?;
        let parsed: PushPayload = match serde_json::from_slice(data) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(error = %e, "ignoring malformed push payload");
                return None;
            }
        };

        let meta = &self.config.notification;
        Some(Notification {
            title: parsed.title.unwrap_or_else(|| meta.default_title.clone()),
            body: parsed.body.unwrap_or_default(),
            icon: meta.icon.clone(),
            badge: meta.badge.clone(),
            dir: meta.dir.clone(),
            lang: meta.lang.clone(),
        })
    }

    /// Handle a background sync event. Deferred-post replay is not
    /// implemented; the recognized tag only logs.
    pub fn on_sync(&self, tag: &str) {
        if tag == SYNC_POSTS_TAG {
            tracing::info!(tag, "background sync requested; deferred post replay not implemented");
        } else {
            tracing::debug!(tag, "ignoring unknown sync tag");
        }
    }
}
