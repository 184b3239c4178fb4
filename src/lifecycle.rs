//! Install/activate lifecycle for the caching worker.
//!
//! One `LifecycleManager` tracks one worker instance from install to
//! serving. Installing preloads the static namespace for the new version;
//! Activating purges every namespace left over from previous versions.

use color_eyre::{eyre::eyre, Result};
use futures::future::try_join_all;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

use crate::config::WorkerConfig;
use crate::fetch::Fetcher;
use crate::http::{Method, Request};
use crate::store::NamespaceStore;

/// Progression of a worker instance from first install to serving requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
  /// Preloading the static namespace for a new version
  Installing,
  /// Installed, waiting to take over from the previous instance
  Waiting,
  /// Purging stale namespaces and claiming interception
  Activating,
  /// Serving requests
  Active,
}

/// Owns the lifecycle state machine and the namespace set it governs.
///
/// Process-scoped state constructed at startup; the strategy executor gets
/// the namespace names handed to it rather than reaching into globals.
pub struct LifecycleManager<S: NamespaceStore> {
  store: Arc<S>,
  config: WorkerConfig,
  state: Mutex<LifecycleState>,
}

impl<S: NamespaceStore> LifecycleManager<S> {
  pub fn new(store: Arc<S>, config: WorkerConfig) -> Self {
    Self {
      store,
      config,
      state: Mutex::new(LifecycleState::Installing),
    }
  }

  /// Current lifecycle state.
  pub fn state(&self) -> Result<LifecycleState> {
    Ok(*self.lock_state()?)
  }

  fn lock_state(&self) -> Result<MutexGuard<'_, LifecycleState>> {
    self.state.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Install this instance: open the static namespace for the new version
  /// and preload every configured entry.
  ///
  /// All-or-nothing: a single failed or non-ok preload fails the whole
  /// install and the instance never reaches `Waiting`. Entries written
  /// before the failure stay in storage but are never promoted; the
  /// previous version's namespaces are untouched either way.
  pub async fn install<F: Fetcher>(&self, fetcher: &F) -> Result<()> {
    let namespace = self.config.static_namespace();
    info!(namespace = %namespace, "Installing");

    self.store.open(&namespace)?;

    let preloads = self
      .config
      .preload
      .iter()
      .map(|entry| self.preload_entry(fetcher, &namespace, entry));
    try_join_all(preloads).await?;

    *self.lock_state()? = LifecycleState::Waiting;
    info!(count = self.config.preload.len(), "Install complete");
    Ok(())
  }

  async fn preload_entry<F: Fetcher>(
    &self,
    fetcher: &F,
    namespace: &str,
    entry: &str,
  ) -> Result<()> {
    let url = self.config.preload_url(entry)?;
    let request = Request::new(Method::Get, url);

    let response = fetcher
      .fetch(&request)
      .await
      .map_err(|e| eyre!("Preload fetch for {} failed: {}", entry, e))?;
    if !response.is_ok() {
      return Err(eyre!(
        "Preload fetch for {} returned status {}",
        entry,
        response.status
      ));
    }

    self.store.put(namespace, &request.key(), &response)
  }

  /// Activate this instance: purge every namespace that is not one of the
  /// current version's names, then begin serving.
  ///
  /// Reached from `Waiting`, either because no previous instance exists or
  /// because a skip-waiting command forced the takeover.
  pub async fn activate(&self) -> Result<()> {
    {
      let mut state = self.lock_state()?;
      if *state == LifecycleState::Installing {
        return Err(eyre!("Cannot activate before install has completed"));
      }
      *state = LifecycleState::Activating;
    }
    info!(version = %self.config.version, "Activating");

    let current = self.config.current_namespaces();
    for name in self.store.list_namespaces()? {
      if current.contains(&name) {
        continue;
      }
      // Purge failures must not block activation
      match self.store.purge(&name) {
        Ok(()) => info!(namespace = %name, "Purged stale namespace"),
        Err(err) => warn!(namespace = %name, error = %err, "Failed to purge stale namespace"),
      }
    }

    *self.lock_state()? = LifecycleState::Active;
    info!("Active");
    Ok(())
  }

  /// Purge every namespace, current or not. Idempotent and safe in any
  /// lifecycle state; subsequent requests repopulate lazily.
  pub fn clear_all(&self) -> Result<()> {
    for name in self.store.list_namespaces()? {
      self.store.purge(&name)?;
      info!(namespace = %name, "Purged namespace");
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::http::{RequestKey, Response};
  use crate::store::{CachedResponse, MemoryStore};
  use std::collections::HashMap;

  /// Fetcher answering from a fixed path -> status table; anything absent
  /// is a transport error.
  struct TableFetcher {
    responses: HashMap<String, u16>,
  }

  impl TableFetcher {
    fn ok_for(paths: &[&str]) -> Self {
      Self {
        responses: paths.iter().map(|p| (p.to_string(), 200)).collect(),
      }
    }

    fn with_status(mut self, path: &str, status: u16) -> Self {
      self.responses.insert(path.to_string(), status);
      self
    }
  }

  impl Fetcher for TableFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response> {
      match self.responses.get(request.path()) {
        Some(status) => Ok(Response::new(*status).with_body(request.path().as_bytes().to_vec())),
        None => Err(eyre!("connection refused: {}", request.url)),
      }
    }
  }

  fn config() -> WorkerConfig {
    WorkerConfig {
      app_name: "app".to_string(),
      version: "1.0.0".to_string(),
      origin: "https://app.example".to_string(),
      preload: vec!["/".to_string(), "/static/manifest.json".to_string()],
      ..WorkerConfig::default()
    }
  }

  fn manager(store: Arc<MemoryStore>) -> LifecycleManager<MemoryStore> {
    LifecycleManager::new(store, config())
  }

  #[tokio::test]
  async fn test_install_preloads_the_static_namespace() {
    let store = Arc::new(MemoryStore::new());
    let manager = manager(Arc::clone(&store));
    let fetcher = TableFetcher::ok_for(&["/", "/static/manifest.json"]);

    manager.install(&fetcher).await.unwrap();

    assert_eq!(manager.state().unwrap(), LifecycleState::Waiting);
    for entry in ["/", "/static/manifest.json"] {
      let request = Request::get(&format!("https://app.example{}", entry)).unwrap();
      let cached = store
        .get("app-static-v1.0.0", &request.key())
        .unwrap()
        .unwrap_or_else(|| panic!("missing preload entry {}", entry));
      assert_eq!(cached.response.status, 200);
    }
  }

  #[tokio::test]
  async fn test_failed_preload_fails_the_whole_install() {
    let store = Arc::new(MemoryStore::new());
    let manager = manager(Arc::clone(&store));
    // Manifest fetch never succeeds
    let fetcher = TableFetcher::ok_for(&["/"]);

    assert!(manager.install(&fetcher).await.is_err());
    assert_eq!(manager.state().unwrap(), LifecycleState::Installing);
  }

  #[tokio::test]
  async fn test_non_ok_preload_fails_the_whole_install() {
    let store = Arc::new(MemoryStore::new());
    let manager = manager(store);
    let fetcher =
      TableFetcher::ok_for(&["/"]).with_status("/static/manifest.json", 404);

    assert!(manager.install(&fetcher).await.is_err());
    assert_eq!(manager.state().unwrap(), LifecycleState::Installing);
  }

  #[tokio::test]
  async fn test_activate_purges_only_stale_namespaces() {
    let store = Arc::new(MemoryStore::new());
    store.open("app-static-v0.9.0").unwrap();
    store.open("app-dynamic-v0.9.0").unwrap();
    store.open("app-static-v1.0.0").unwrap();
    store.open("app-dynamic-v1.0.0").unwrap();

    let manager = manager(Arc::clone(&store));
    let fetcher = TableFetcher::ok_for(&["/", "/static/manifest.json"]);
    manager.install(&fetcher).await.unwrap();
    manager.activate().await.unwrap();

    assert_eq!(manager.state().unwrap(), LifecycleState::Active);
    assert_eq!(
      store.list_namespaces().unwrap(),
      vec!["app-dynamic-v1.0.0", "app-static-v1.0.0"]
    );
  }

  #[tokio::test]
  async fn test_activate_before_install_is_refused() {
    let store = Arc::new(MemoryStore::new());
    let manager = manager(store);

    assert!(manager.activate().await.is_err());
    assert_eq!(manager.state().unwrap(), LifecycleState::Installing);
  }

  #[tokio::test]
  async fn test_clear_all_empties_the_store() {
    let store = Arc::new(MemoryStore::new());
    let manager = manager(Arc::clone(&store));
    let fetcher = TableFetcher::ok_for(&["/", "/static/manifest.json"]);
    manager.install(&fetcher).await.unwrap();

    manager.clear_all().unwrap();

    assert!(store.list_namespaces().unwrap().is_empty());
    // Safe to repeat
    manager.clear_all().unwrap();
  }

  /// Store wrapper whose purge always fails.
  struct BrokenPurgeStore {
    inner: MemoryStore,
  }

  impl NamespaceStore for BrokenPurgeStore {
    fn open(&self, namespace: &str) -> Result<()> {
      self.inner.open(namespace)
    }

    fn get(&self, namespace: &str, key: &RequestKey) -> Result<Option<CachedResponse>> {
      self.inner.get(namespace, key)
    }

    fn put(&self, namespace: &str, key: &RequestKey, response: &Response) -> Result<()> {
      self.inner.put(namespace, key, response)
    }

    fn list_namespaces(&self) -> Result<Vec<String>> {
      self.inner.list_namespaces()
    }

    fn purge(&self, _namespace: &str) -> Result<()> {
      Err(eyre!("database is locked"))
    }
  }

  #[tokio::test]
  async fn test_activate_continues_past_purge_failures() {
    let store = Arc::new(BrokenPurgeStore {
      inner: MemoryStore::new(),
    });
    store.open("app-static-v0.9.0").unwrap();

    let manager = LifecycleManager::new(Arc::clone(&store), config());
    let fetcher = TableFetcher::ok_for(&["/", "/static/manifest.json"]);
    manager.install(&fetcher).await.unwrap();

    manager.activate().await.unwrap();
    assert_eq!(manager.state().unwrap(), LifecycleState::Active);
  }
}
