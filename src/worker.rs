//! The worker: event surface and request routing.
//!
//! One `Worker` corresponds to one installed version of the application.
//! The host feeds it lifecycle events, control messages and intercepted
//! requests, either by calling the `on_*` methods directly or by pushing
//! `WorkerEvent`s through `serve`.

use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::classify::{Classification, Classifier};
use crate::commands::Command;
use crate::config::WorkerConfig;
use crate::fallback::OfflineFallback;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::http::{Request, Response};
use crate::lifecycle::{LifecycleManager, LifecycleState};
use crate::store::{NamespaceStore, SqliteStore};
use crate::strategy::StrategyExecutor;

/// Events the host runtime feeds into the worker.
pub enum WorkerEvent {
  /// A new version was installed by the host
  Install { done: oneshot::Sender<Result<()>> },
  /// The host promoted this instance
  Activate { done: oneshot::Sender<Result<()>> },
  /// An intercepted request; the response travels back on `reply`
  Fetch {
    request: Request,
    reply: oneshot::Sender<Result<Response>>,
  },
  /// Raw control-channel message
  Message { raw: String },
  /// A newer version is available; observability only
  UpdateFound,
}

/// The offline caching worker.
///
/// Owns the classifier, strategy executor and lifecycle manager, all
/// sharing one namespace store. Generic over the store and the network
/// transport so hosts and tests can substitute either.
pub struct Worker<S: NamespaceStore, F: Fetcher> {
  config: WorkerConfig,
  classifier: Classifier,
  executor: StrategyExecutor<S>,
  lifecycle: LifecycleManager<S>,
  fetcher: F,
}

impl Worker<SqliteStore, HttpFetcher> {
  /// Worker with the default persistent store and HTTP transport.
  pub fn with_defaults(config: WorkerConfig) -> Result<Self> {
    let store = Arc::new(SqliteStore::open()?);
    Self::new(config, store, HttpFetcher::new()?)
  }
}

impl<S: NamespaceStore, F: Fetcher> Worker<S, F> {
  /// Build a worker from configuration, a store and a network transport.
  pub fn new(config: WorkerConfig, store: Arc<S>, fetcher: F) -> Result<Self> {
    let classifier = Classifier::new(&config);

    let fallback = match &config.offline_page {
      Some(path) => {
        let bytes = std::fs::read(path)
          .map_err(|e| eyre!("Failed to read offline page {}: {}", path.display(), e))?;
        OfflineFallback::with_document(bytes)
      }
      None => OfflineFallback::new(),
    };

    let executor = StrategyExecutor::new(
      Arc::clone(&store),
      config.static_namespace(),
      config.dynamic_namespace(),
      fallback,
    );
    let lifecycle = LifecycleManager::new(store, config.clone());

    Ok(Self {
      config,
      classifier,
      executor,
      lifecycle,
      fetcher,
    })
  }

  /// Lifecycle state of this instance.
  pub fn state(&self) -> Result<LifecycleState> {
    self.lifecycle.state()
  }

  /// Install: preload the static namespace for this version.
  pub async fn on_install(&self) -> Result<()> {
    self.lifecycle.install(&self.fetcher).await
  }

  /// Activate: purge stale namespaces and start serving.
  pub async fn on_activate(&self) -> Result<()> {
    self.lifecycle.activate().await
  }

  /// Intercept a request and produce a response.
  ///
  /// NeverCache requests go straight to the network with no store
  /// interaction in either direction; Static requests run cache-first;
  /// everything else runs network-first.
  pub async fn on_fetch(&self, request: &Request) -> Result<Response> {
    let classification = self.classifier.classify(request);
    debug!(url = %request.url, ?classification, "Intercepted request");

    match classification {
      Classification::NeverCache => self.fetcher.fetch(request).await,
      Classification::Static => {
        self
          .executor
          .cache_first(request, || self.fetcher.fetch(request))
          .await
      }
      Classification::Dynamic => {
        self
          .executor
          .network_first(request, classification, || self.fetcher.fetch(request))
          .await
      }
    }
  }

  /// Handle a raw control-channel message. Unrecognized messages are
  /// ignored.
  pub async fn on_message(&self, raw: &str) -> Result<()> {
    match Command::parse(raw) {
      Some(Command::SkipWaiting) => {
        info!("Skip-waiting requested, activating immediately");
        self.on_activate().await
      }
      Some(Command::ClearCache) => {
        info!("Clearing all cache namespaces");
        self.lifecycle.clear_all()
      }
      None => {
        debug!(command = raw, "Ignoring unrecognized control message");
        Ok(())
      }
    }
  }

  /// A newer version is available. Observability hook only; no state
  /// changes.
  pub fn on_update_found(&self) {
    info!(
      app = %self.config.app_name,
      version = %self.config.version,
      "Update found"
    );
  }
}

impl<S, F> Worker<S, F>
where
  S: NamespaceStore + 'static,
  F: Fetcher + 'static,
{
  /// Drive the worker from a channel of host events.
  ///
  /// Each fetch runs on its own task so requests interleave at their
  /// suspension points; lifecycle events and control messages are handled
  /// in arrival order. Returns when the sender side is dropped.
  pub async fn serve(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<WorkerEvent>) {
    while let Some(event) = events.recv().await {
      match event {
        WorkerEvent::Install { done } => {
          let _ = done.send(self.on_install().await);
        }
        WorkerEvent::Activate { done } => {
          let _ = done.send(self.on_activate().await);
        }
        WorkerEvent::Fetch { request, reply } => {
          let worker = Arc::clone(&self);
          tokio::spawn(async move {
            let _ = reply.send(worker.on_fetch(&request).await);
          });
        }
        WorkerEvent::Message { raw } => {
          if let Err(err) = self.on_message(&raw).await {
            warn!(error = %err, "Control message failed");
          }
        }
        WorkerEvent::UpdateFound => self.on_update_found(),
      }
    }
  }
}
