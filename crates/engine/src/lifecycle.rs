//! Worker lifecycle: install-time pre-population, activation-time eviction,
//! and takeover of in-flight clients.
//!
//! The state machine is `Installing -> Waiting -> Activating -> Active`,
//! with no rollback from Active. Install skips the usual wait-for-reload
//! step, and activation claims all registered clients immediately instead
//! of waiting for their next load.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::RwLock;
use url::Url;

use crate::classify::Request;
use crate::fetch::Fetch;
use vigil_core::{CacheDb, Error, WorkerConfig};

/// Lifecycle states. There is no rollback from Active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Installing,
    Waiting,
    Activating,
    Active,
}

/// Application instances the worker can take control of.
///
/// Maps a client id to the region tag of its controlling worker, if any.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    inner: Arc<RwLock<HashMap<String, Option<String>>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client with no controller yet.
    pub async fn register(&self, id: impl Into<String>) {
        self.inner.write().await.insert(id.into(), None);
    }

    /// Take control of every registered client immediately.
    pub async fn claim(&self, region: &str) {
        let mut clients = self.inner.write().await;
        for controller in clients.values_mut() {
            *controller = Some(region.to_string());
        }
        tracing::info!(region, clients = clients.len(), "claimed all clients");
    }

    /// Region tag controlling a client, if it has been claimed.
    pub async fn controller_of(&self, id: &str) -> Option<String> {
        self.inner.read().await.get(id).cloned().flatten()
    }
}

/// Drives install and activation for the current cache region.
pub struct LifecycleController {
    state: WorkerState,
    store: CacheDb,
    fetcher: Arc<dyn Fetch>,
    config: Arc<WorkerConfig>,
    region: String,
    clients: ClientRegistry,
}

impl LifecycleController {
    pub fn new(store: CacheDb, fetcher: Arc<dyn Fetch>, config: Arc<WorkerConfig>) -> Self {
        let region = config.region_tag();
        Self {
            state: WorkerState::Installing,
            store,
            fetcher,
            config,
            region,
            clients: ClientRegistry::new(),
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// Install: open the current region and pre-populate it from the
    /// configured manifest.
    ///
    /// Pre-population fetches run concurrently and settle independently;
    /// a failed fetch is logged and never aborts the others. Once all
    /// attempts settle the controller moves straight to Waiting, skipping
    /// the wait-for-reload step.
    pub async fn install(&mut self) -> Result<(), Error> {
        if self.state != WorkerState::Installing {
            return Err(Error::Lifecycle(format!("install event in state {:?}", self.state)));
        }

        self.store.open_region(&self.region).await?;

        let scope =
            Url::parse(&self.config.scope).map_err(|e| Error::InvalidUrl(format!("{}: {}", self.config.scope, e)))?;

        let mut urls = Vec::with_capacity(self.config.precache_manifest.len());
        for raw in &self.config.precache_manifest {
            match scope.join(raw) {
                Ok(url) => urls.push(url),
                Err(e) => tracing::warn!(entry = %raw, error = %e, "skipping unresolvable precache entry"),
            }
        }

        let tasks = urls.into_iter().map(|url| {
            let fetcher = Arc::clone(&self.fetcher);
            let store = self.store.clone();
            let region = self.region.clone();
            async move {
                let request = Request::get(url);
                let identity = request.identity();
                match fetcher.fetch(&request).await {
                    Ok(response) if response.is_ok() => {
                        if let Err(e) = store.put_entry(&region, &identity, &response).await {
                            tracing::warn!(url = %identity.url, error = %e, "failed to store precached entry");
                        }
                    }
                    Ok(response) => {
                        tracing::warn!(url = %identity.url, status = response.status, "precache fetch returned non-ok");
                    }
                    Err(e) => {
                        tracing::warn!(url = %identity.url, error = %e, "failed to precache");
                    }
                }
            }
        });
        join_all(tasks).await;

        tracing::info!(region = %self.region, "install complete, skipping wait");
        self.state = WorkerState::Waiting;
        Ok(())
    }

    /// Activate: evict every region except the current one, then claim all
    /// registered clients.
    ///
    /// The eviction sweep is best-effort; a failed sweep is logged and does
    /// not block activation. Stale regions left behind are retried by the
    /// next activation.
    pub async fn activate(&mut self) -> Result<(), Error> {
        if self.state != WorkerState::Waiting {
            return Err(Error::Lifecycle(format!("activate event in state {:?}", self.state)));
        }
        self.state = WorkerState::Activating;

        match self.store.evict_all_except(&self.region).await {
            Ok(deleted) => tracing::info!(region = %self.region, deleted, "evicted stale regions"),
            Err(e) => tracing::warn!(region = %self.region, error = %e, "eviction sweep failed; stale regions persist"),
        }

        self.clients.claim(&self.region).await;
        self.state = WorkerState::Active;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockFetch, html_snapshot, status_snapshot};
    use vigil_core::RequestIdentity;

    fn test_config() -> WorkerConfig {
        WorkerConfig {
            scope: "https://app.example/".into(),
            precache_manifest: vec!["./".into(), "./index.html".into(), "./icons/icon-192.png".into()],
            ..Default::default()
        }
    }

    fn controller_with(config: WorkerConfig, store: CacheDb, mock: Arc<MockFetch>) -> LifecycleController {
        LifecycleController::new(store, mock as Arc<dyn Fetch>, Arc::new(config))
    }

    #[tokio::test]
    async fn test_install_precaches_manifest() {
        let config = test_config();
        let region = config.region_tag();
        let store = CacheDb::open_in_memory().await.unwrap();
        let mock = Arc::new(MockFetch::new());
        mock.respond_url("https://app.example/", html_snapshot("root"));
        mock.respond_url("https://app.example/index.html", html_snapshot("shell"));
        mock.respond_url("https://app.example/icons/icon-192.png", status_snapshot(200));

        let mut controller = controller_with(config, store.clone(), mock);
        controller.install().await.unwrap();

        assert_eq!(controller.state(), WorkerState::Waiting);
        assert_eq!(store.count_entries(&region).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_install_settles_despite_failures() {
        let config = test_config();
        let region = config.region_tag();
        let store = CacheDb::open_in_memory().await.unwrap();
        let mock = Arc::new(MockFetch::new());
        mock.respond_url("https://app.example/", html_snapshot("root"));
        mock.fail_url("https://app.example/index.html");
        mock.respond_url("https://app.example/icons/icon-192.png", status_snapshot(200));

        let mut controller = controller_with(config, store.clone(), mock);
        controller.install().await.unwrap();

        // the failed fetch does not abort the rest
        assert_eq!(controller.state(), WorkerState::Waiting);
        assert_eq!(store.count_entries(&region).await.unwrap(), 2);

        let shell = RequestIdentity::get("https://app.example/index.html");
        assert!(store.get_entry(&region, &shell).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_install_skips_non_ok_responses() {
        let config = WorkerConfig {
            precache_manifest: vec!["./missing.png".into()],
            ..test_config()
        };
        let region = config.region_tag();
        let store = CacheDb::open_in_memory().await.unwrap();
        let mock = Arc::new(MockFetch::new());
        mock.respond_url("https://app.example/missing.png", status_snapshot(404));

        let mut controller = controller_with(config, store.clone(), mock);
        controller.install().await.unwrap();

        assert_eq!(store.count_entries(&region).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_activate_evicts_stale_regions_and_claims() {
        let config = test_config();
        let region = config.region_tag();
        let store = CacheDb::open_in_memory().await.unwrap();
        store.open_region("vigil-v0").await.unwrap();
        let mock = Arc::new(MockFetch::new());
        mock.respond_url("https://app.example/", html_snapshot("root"));
        mock.respond_url("https://app.example/index.html", html_snapshot("shell"));
        mock.respond_url("https://app.example/icons/icon-192.png", status_snapshot(200));

        let mut controller = controller_with(config, store.clone(), mock);
        controller.clients().register("tab-1").await;
        controller.clients().register("tab-2").await;

        controller.install().await.unwrap();
        controller.activate().await.unwrap();

        assert_eq!(controller.state(), WorkerState::Active);
        // exactly one surviving region
        assert_eq!(store.list_regions().await.unwrap(), vec![region.clone()]);
        // clients claimed immediately, not on next load
        assert_eq!(controller.clients().controller_of("tab-1").await, Some(region.clone()));
        assert_eq!(controller.clients().controller_of("tab-2").await, Some(region));
    }

    #[tokio::test]
    async fn test_activate_before_install_is_rejected() {
        let store = CacheDb::open_in_memory().await.unwrap();
        let mock = Arc::new(MockFetch::new());
        let mut controller = controller_with(test_config(), store, mock);

        let result = controller.activate().await;
        assert!(matches!(result, Err(Error::Lifecycle(_))));
        assert_eq!(controller.state(), WorkerState::Installing);
    }

    #[tokio::test]
    async fn test_double_install_is_rejected() {
        let config = test_config();
        let store = CacheDb::open_in_memory().await.unwrap();
        let mock = Arc::new(MockFetch::new());
        mock.respond_url("https://app.example/", html_snapshot("root"));
        mock.respond_url("https://app.example/index.html", html_snapshot("shell"));
        mock.respond_url("https://app.example/icons/icon-192.png", status_snapshot(200));

        let mut controller = controller_with(config, store, mock);
        controller.install().await.unwrap();

        let result = controller.install().await;
        assert!(matches!(result, Err(Error::Lifecycle(_))));
    }
}
