//! Offline asset cache.
//!
//! [`CacheController`] plays the part of a service worker: it pre-caches a
//! fixed manifest when installed, drops caches from older versions when
//! activated and then answers GET requests cache-first. [`Registration`] is
//! the page side that registers it once at start-up and routes fetches
//! through it.

pub mod cache;
pub mod fetch;

use cache::{CacheError, CacheStorage};
use fetch::{FetchError, Method, Network, Request, Response};
use std::fmt;
use tracing::{debug, error, info, trace, warn};

/// Cache name for this build. Bump it to invalidate every older cache.
pub const CACHE_NAME: &str = "simplepad-cache-v1";

/// Assets that must be available offline.
pub const ASSET_MANIFEST: &[&str] = &["/help.txt", "/about.txt", "/manifest.json"];

pub const WORKER_SCRIPT_PATH: &str = "/simplepad-sw";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
}

impl WorkerState {
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
        };
        f.write_str(name)
    }
}

/// Fetch every URL, then store them all at once. Nothing is stored unless
/// every fetch succeeded with a 2xx status.
pub async fn add_all(
    storage: &dyn CacheStorage,
    network: &dyn Network,
    name: &str,
    urls: &[String],
) -> Result<(), CacheError> {
    let mut responses = Vec::with_capacity(urls.len());
    for url in urls {
        let response = network
            .fetch(&Request::get(url.as_str()))
            .await
            .map_err(|source| CacheError::Fetch {
                url: url.clone(),
                source,
            })?;
        if !response.ok() {
            return Err(CacheError::BadStatus {
                url: url.clone(),
                status: response.status,
            });
        }
        responses.push(response);
    }
    storage.put_all(name, responses).await
}

pub struct CacheController {
    version: String,
    manifest: Vec<String>,
    storage: Box<dyn CacheStorage>,
    network: Box<dyn Network>,
    state: WorkerState,
    skip_waiting: bool,
    controls_clients: bool,
}

impl CacheController {
    pub fn new(storage: Box<dyn CacheStorage>, network: Box<dyn Network>) -> Self {
        Self::with_manifest(
            CACHE_NAME,
            ASSET_MANIFEST.iter().map(|url| url.to_string()).collect(),
            storage,
            network,
        )
    }

    pub fn with_manifest(
        version: impl Into<String>,
        manifest: Vec<String>,
        storage: Box<dyn CacheStorage>,
        network: Box<dyn Network>,
    ) -> Self {
        Self {
            version: version.into(),
            manifest,
            storage,
            network,
            state: WorkerState::Parsed,
            skip_waiting: false,
            controls_clients: false,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn controls_clients(&self) -> bool {
        self.controls_clients
    }

    pub fn storage(&self) -> &dyn CacheStorage {
        self.storage.as_ref()
    }

    /// Open the current cache and fill it with the manifest.
    ///
    /// A failure is logged and returned but never stops the worker from
    /// asking to activate straight away.
    pub async fn install(&mut self) -> Result<(), CacheError> {
        self.state = WorkerState::Installing;
        let result = self.precache().await;
        if let Err(err) = &result {
            error!(%err, cache = %self.version, "failed to open cache and add URLs");
        }
        self.skip_waiting = true;
        self.state = WorkerState::Installed;
        result
    }

    async fn precache(&self) -> Result<(), CacheError> {
        self.storage.open(&self.version).await?;
        info!(cache = %self.version, "opened cache");
        add_all(
            self.storage.as_ref(),
            self.network.as_ref(),
            &self.version,
            &self.manifest,
        )
        .await?;
        info!(cache = %self.version, assets = self.manifest.len(), "pre-cached assets");
        Ok(())
    }

    /// Delete every cache that is not the current version, then claim the
    /// open clients. Returns the names that were deleted.
    ///
    /// Storage errors are logged and skipped; activation always completes.
    pub async fn activate(&mut self) -> Vec<String> {
        if !self.skip_waiting {
            warn!(state = %self.state, "activating a worker that never installed");
        }
        self.state = WorkerState::Activating;

        let names = match self.storage.keys().await {
            Ok(names) => names,
            Err(err) => {
                error!(%err, "could not list caches");
                Vec::new()
            }
        };

        let mut deleted = Vec::new();
        for name in names {
            if name == self.version {
                continue;
            }
            info!(cache = %name, "clearing old cache");
            match self.storage.delete(&name).await {
                Ok(true) => deleted.push(name),
                Ok(false) => {}
                Err(err) => error!(%err, cache = %name, "could not clear old cache"),
            }
        }

        self.state = WorkerState::Activated;
        self.controls_clients = true;
        deleted
    }

    /// Answer an intercepted request cache-first.
    ///
    /// `None` means the request is not intercepted (anything but GET) and
    /// should go to the network untouched.
    pub async fn handle_fetch(&self, request: &Request) -> Option<Result<Response, FetchError>> {
        if request.method != Method::Get {
            return None;
        }

        match self.storage.match_url(&request.url).await {
            Ok(Some(response)) => {
                trace!(url = %request.url, "served from cache");
                return Some(Ok(response));
            }
            Ok(None) => debug!(url = %request.url, "cache miss"),
            Err(err) => warn!(%err, url = %request.url, "cache lookup failed"),
        }

        let result = self.network.fetch(request).await;
        if let Err(err) = &result {
            error!(%err, url = %request.url, "fetch failed and no cached copy exists");
        }
        Some(result)
    }
}

/// The page's handle on the registered controller.
pub struct Registration {
    script_path: String,
    controller: CacheController,
    network: Box<dyn Network>,
}

impl Registration {
    /// Install and activate `controller`. Failures are logged only; the
    /// registration is returned either way.
    pub async fn register(
        script_path: &str,
        mut controller: CacheController,
        network: Box<dyn Network>,
    ) -> Self {
        // Install failures are already logged and do not block activation.
        let _ = controller.install().await;
        let deleted = controller.activate().await;
        info!(
            scope = script_path,
            removed = deleted.len(),
            "cache controller registration successful"
        );
        Self {
            script_path: script_path.to_string(),
            controller,
            network,
        }
    }

    pub fn script_path(&self) -> &str {
        &self.script_path
    }

    pub fn controller(&self) -> &CacheController {
        &self.controller
    }

    /// Fetch as the page would: through the controller when it controls this
    /// client, straight from the network otherwise.
    pub async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let controller = &self.controller;
        if controller.state().can_intercept_fetch() && controller.controls_clients() {
            if let Some(result) = controller.handle_fetch(request).await {
                return result;
            }
        }
        self.network.fetch(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedNetwork, UndeletableStorage};
    use cache::{DiskCacheStorage, MemoryCacheStorage};
    use tempfile::TempDir;

    fn manifest() -> Vec<String> {
        vec!["/help.txt".to_string(), "/about.txt".to_string()]
    }

    fn full_network() -> ScriptedNetwork {
        ScriptedNetwork::new()
            .serve("/help.txt", "help body")
            .serve("/about.txt", "about body")
            .serve("/extra.txt", "extra body")
    }

    #[tokio::test]
    async fn test_install_precaches_manifest() {
        let network = full_network();
        let mut controller = CacheController::with_manifest(
            "v2",
            manifest(),
            Box::new(MemoryCacheStorage::new()),
            Box::new(network.clone()),
        );

        controller.install().await.unwrap();

        assert_eq!(controller.state(), WorkerState::Installed);
        assert_eq!(
            controller.storage().entries("v2").await.unwrap(),
            vec!["/about.txt", "/help.txt"]
        );
        assert_eq!(network.requests(), vec!["/help.txt", "/about.txt"]);
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let network = ScriptedNetwork::new().serve("/help.txt", "help body");
        let mut controller = CacheController::with_manifest(
            "v2",
            manifest(),
            Box::new(MemoryCacheStorage::new()),
            Box::new(network),
        );

        let err = controller.install().await.unwrap_err();

        assert!(matches!(err, CacheError::Fetch { .. }));
        assert_eq!(controller.state(), WorkerState::Installed);
        assert!(controller.storage().entries("v2").await.unwrap().is_empty());

        controller.activate().await;
        assert_eq!(controller.state(), WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_non_ok_response_fails_install() {
        let network = ScriptedNetwork::new()
            .serve("/help.txt", "help body")
            .respond("/about.txt", Response::new("/about.txt", 404, Vec::new()));
        let mut controller = CacheController::with_manifest(
            "v2",
            manifest(),
            Box::new(MemoryCacheStorage::new()),
            Box::new(network),
        );

        let err = controller.install().await.unwrap_err();
        assert!(matches!(err, CacheError::BadStatus { status: 404, .. }));
        assert!(controller.storage().match_url("/help.txt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_activate_removes_every_other_version() {
        let storage = MemoryCacheStorage::new();
        storage.open("v0").await.unwrap();
        storage
            .put_all("v1", vec![Response::new("/help.txt", 200, b"old".to_vec())])
            .await
            .unwrap();
        let mut controller = CacheController::with_manifest(
            "v2",
            manifest(),
            Box::new(storage),
            Box::new(full_network()),
        );
        controller.install().await.unwrap();

        let mut deleted = controller.activate().await;
        deleted.sort();

        assert_eq!(deleted, vec!["v0", "v1"]);
        assert_eq!(controller.storage().keys().await.unwrap(), vec!["v2"]);
        assert_eq!(
            controller.storage().entries("v2").await.unwrap(),
            vec!["/about.txt", "/help.txt"]
        );
        let help = controller.storage().match_url("/help.txt").await.unwrap().unwrap();
        assert_eq!(help.text(), "help body");
        assert!(controller.controls_clients());
    }

    #[tokio::test]
    async fn test_activate_completes_when_old_cache_cannot_be_deleted() {
        let storage = MemoryCacheStorage::new();
        storage
            .put_all("old-v0", vec![Response::new("/stale.txt", 200, b"stale".to_vec())])
            .await
            .unwrap();
        let controller = CacheController::with_manifest(
            "v1",
            manifest(),
            Box::new(UndeletableStorage::new(storage)),
            Box::new(full_network()),
        );

        let registration = Registration::register(
            WORKER_SCRIPT_PATH,
            controller,
            Box::new(ScriptedNetwork::new()),
        )
        .await;

        let controller = registration.controller();
        assert_eq!(controller.state(), WorkerState::Activated);
        assert!(controller.controls_clients());
        let mut keys = controller.storage().keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["old-v0", "v1"]);

        let help = registration.fetch(&Request::get("/help.txt")).await.unwrap();
        assert_eq!(help.text(), "help body");
    }

    #[tokio::test]
    async fn test_cached_get_never_reaches_network() {
        let network = full_network();
        let mut controller = CacheController::with_manifest(
            "v1",
            manifest(),
            Box::new(MemoryCacheStorage::new()),
            Box::new(network.clone()),
        );
        controller.install().await.unwrap();
        controller.activate().await;
        let before = network.requests().len();

        let response = controller
            .handle_fetch(&Request::get("/help.txt"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(response.text(), "help body");
        assert_eq!(network.requests().len(), before);
    }

    #[tokio::test]
    async fn test_uncached_get_goes_to_network_and_is_not_stored() {
        let network = full_network();
        let mut controller = CacheController::with_manifest(
            "v1",
            manifest(),
            Box::new(MemoryCacheStorage::new()),
            Box::new(network.clone()),
        );
        controller.install().await.unwrap();
        controller.activate().await;

        let response = controller
            .handle_fetch(&Request::get("/extra.txt"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(response.text(), "extra body");
        assert_eq!(network.requests().last().map(String::as_str), Some("/extra.txt"));
        assert!(controller.storage().match_url("/extra.txt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_offline_miss_rejects() {
        let mut controller = CacheController::with_manifest(
            "v1",
            Vec::new(),
            Box::new(MemoryCacheStorage::new()),
            Box::new(ScriptedNetwork::new()),
        );
        controller.install().await.unwrap();
        controller.activate().await;

        let result = controller.handle_fetch(&Request::get("/missing.txt")).await;
        assert!(matches!(result, Some(Err(FetchError::Offline(_)))));
    }

    #[tokio::test]
    async fn test_non_get_is_not_intercepted() {
        let controller = CacheController::with_manifest(
            "v1",
            Vec::new(),
            Box::new(MemoryCacheStorage::new()),
            Box::new(full_network()),
        );
        let request = Request::new(Method::Post, "/help.txt");
        assert!(controller.handle_fetch(&request).await.is_none());
    }

    #[tokio::test]
    async fn test_registration_serves_offline_after_install() {
        crate::log::test();
        let dir = TempDir::new().unwrap();
        let online = full_network();
        let controller = CacheController::with_manifest(
            CACHE_NAME,
            manifest(),
            Box::new(DiskCacheStorage::new(dir.path())),
            Box::new(online.clone()),
        );
        let registration =
            Registration::register(WORKER_SCRIPT_PATH, controller, Box::new(online)).await;
        assert_eq!(registration.controller().state(), WorkerState::Activated);

        // A later start with the origin gone still finds the cached assets.
        let offline = ScriptedNetwork::new();
        let controller = CacheController::with_manifest(
            CACHE_NAME,
            manifest(),
            Box::new(DiskCacheStorage::new(dir.path())),
            Box::new(offline.clone()),
        );
        let registration =
            Registration::register(WORKER_SCRIPT_PATH, controller, Box::new(offline)).await;

        let help = registration.fetch(&Request::get("/help.txt")).await.unwrap();
        assert_eq!(help.text(), "help body");
        assert!(registration.fetch(&Request::get("/extra.txt")).await.is_err());
    }

    #[tokio::test]
    async fn test_registration_passes_non_get_to_network() {
        let network = full_network();
        let controller = CacheController::with_manifest(
            "v1",
            Vec::new(),
            Box::new(MemoryCacheStorage::new()),
            Box::new(network.clone()),
        );
        let registration =
            Registration::register(WORKER_SCRIPT_PATH, controller, Box::new(network.clone()))
                .await;

        registration
            .fetch(&Request::new(Method::Post, "/help.txt"))
            .await
            .unwrap();
        assert_eq!(network.requests(), vec!["/help.txt"]);
    }
}
