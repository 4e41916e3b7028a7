//! Per-classification fetch/cache orchestration.
//!
//! Three strategies, selected by classification:
//!
//! - network-first (documents): live content when online, cached shell
//!   when not
//! - cache-first (static assets): skip the network once an asset is cached
//! - stale-while-revalidate (dynamic, default): answer from cache, refresh
//!   in the background for the next request
//!
//! Cache writes are fire-and-forget: each strategy returns the response
//! together with an optional handle for the background write, which may
//! complete after the response has already been delivered. Only ok
//! (2xx) responses are ever written; write failures are logged and
//! absorbed, never surfaced to the requester.

use std::sync::Arc;

use tokio::task::JoinHandle;
use url::Url;

use crate::classify::Request;
use crate::fetch::Fetch;
use vigil_core::{CacheDb, Error, RequestIdentity, ResponseSnapshot, WorkerConfig};

/// Outcome of a strategy: the response for the requester plus the handle of
/// the background cache write, when one was spawned.
#[derive(Debug)]
pub struct Resolved {
    pub response: ResponseSnapshot,
    pub write_task: Option<JoinHandle<()>>,
}

impl Resolved {
    fn immediate(response: ResponseSnapshot) -> Self {
        Self { response, write_task: None }
    }
}

/// Executes the caching strategy chosen by classification, reading and
/// writing through the current cache region.
pub struct StrategyEngine {
    store: CacheDb,
    fetcher: Arc<dyn Fetch>,
    region: String,
    fallbacks: Vec<RequestIdentity>,
}

impl StrategyEngine {
    /// Build an engine bound to the current region.
    ///
    /// Resolves the configured document fallbacks against the scope URL up
    /// front so offline navigation never depends on config parsing.
    pub fn new(store: CacheDb, fetcher: Arc<dyn Fetch>, config: &WorkerConfig) -> Result<Self, Error> {
        let scope = Url::parse(&config.scope).map_err(|e| Error::InvalidUrl(format!("{}: {}", config.scope, e)))?;

        let mut fallbacks = Vec::with_capacity(config.document_fallbacks.len());
        for raw in &config.document_fallbacks {
            match scope.join(raw) {
                Ok(url) => fallbacks.push(RequestIdentity::get(url.to_string())),
                Err(e) => tracing::warn!(fallback = %raw, error = %e, "skipping unresolvable document fallback"),
            }
        }

        Ok(Self { store, fetcher, region: config.region_tag(), fallbacks })
    }

    /// network-first: fetch, cache ok responses in the background, return
    /// the live response. A transport failure falls back to the cached
    /// shell documents in configured order; if none is cached, the original
    /// network error surfaces to the requester.
    pub async fn network_first(&self, request: &Request) -> Result<Resolved, Error> {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                let write_task = self.store_in_background(request.identity(), &response);
                Ok(Resolved { response, write_task })
            }
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "document fetch failed; trying cached shell");
                for identity in &self.fallbacks {
                    if let Some(cached) = self.lookup(identity).await {
                        return Ok(Resolved::immediate(cached));
                    }
                }
                Err(err)
            }
        }
    }

    /// cache-first: a hit returns immediately with no network call. A miss
    /// fetches, caches ok responses in the background, and returns; a miss
    /// plus transport failure has nothing to fall back to and surfaces the
    /// network error.
    pub async fn cache_first(&self, request: &Request) -> Result<Resolved, Error> {
        let identity = request.identity();
        if let Some(cached) = self.lookup(&identity).await {
            tracing::debug!(url = %request.url, "asset cache hit");
            return Ok(Resolved::immediate(cached));
        }

        let response = self.fetcher.fetch(request).await?;
        let write_task = self.store_in_background(identity, &response);
        Ok(Resolved { response, write_task })
    }

    /// stale-while-revalidate: a hit returns the cached snapshot
    /// immediately while a background refresh updates the region for the
    /// next request. A miss awaits the network; a miss plus transport
    /// failure is unrecoverable for this requester.
    pub async fn stale_while_revalidate(&self, request: &Request) -> Result<Resolved, Error> {
        let identity = request.identity();
        if let Some(cached) = self.lookup(&identity).await {
            tracing::debug!(url = %request.url, "serving stale, revalidating in background");
            let write_task = Some(self.spawn_revalidation(request.clone(), identity));
            return Ok(Resolved { response: cached, write_task });
        }

        let response = self.fetcher.fetch(request).await?;
        let write_task = self.store_in_background(identity, &response);
        Ok(Resolved { response, write_task })
    }

    /// Cache lookup that never blocks on the network. Read failures are
    /// logged and reported as misses so the caller can still try the
    /// network path.
    async fn lookup(&self, identity: &RequestIdentity) -> Option<ResponseSnapshot> {
        match self.store.get_entry(&self.region, identity).await {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!(url = %identity.url, error = %e, "cache read failed; treating as miss");
                None
            }
        }
    }

    /// Spawn the fire-and-forget write for an ok response. Returns None for
    /// non-ok responses, which must never reach the cache.
    fn store_in_background(&self, identity: RequestIdentity, response: &ResponseSnapshot) -> Option<JoinHandle<()>> {
        if !response.is_ok() {
            tracing::debug!(url = %identity.url, status = response.status, "non-ok response not cached");
            return None;
        }

        let store = self.store.clone();
        let region = self.region.clone();
        let snapshot = response.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = store.put_entry(&region, &identity, &snapshot).await {
                tracing::warn!(url = %identity.url, error = %e, "cache write failed; response unaffected");
            }
        }))
    }

    /// Background refresh for stale-while-revalidate. Stores only ok
    /// responses; a failed refresh leaves the stale entry serving until the
    /// next successful one.
    fn spawn_revalidation(&self, request: Request, identity: RequestIdentity) -> JoinHandle<()> {
        let fetcher = Arc::clone(&self.fetcher);
        let store = self.store.clone();
        let region = self.region.clone();
        tokio::spawn(async move {
            match fetcher.fetch(&request).await {
                Ok(response) if response.is_ok() => {
                    if let Err(e) = store.put_entry(&region, &identity, &response).await {
                        tracing::warn!(url = %identity.url, error = %e, "revalidation write failed");
                    }
                }
                Ok(response) => {
                    tracing::debug!(url = %identity.url, status = response.status, "revalidation returned non-ok; cache unchanged");
                }
                Err(e) => {
                    tracing::debug!(url = %identity.url, error = %e, "revalidation fetch failed; serving stale until next success");
                }
            }
        })
    }
}
