//! Caching strategies executed against the namespace store.
//!
//! Two strategies cover all cacheable requests:
//! - `cache_first` for static assets: prefer the store, fetch on miss
//! - `network_first` for everything else: prefer the network, fall back to
//!   the store when it is unreachable
//!
//! Network access is injected per call as an async closure, so the
//! strategies are testable without a transport. NeverCache requests are
//! routed around this module entirely.

use color_eyre::{Report, Result};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::classify::Classification;
use crate::fallback::OfflineFallback;
use crate::http::{Destination, Request, Response};
use crate::store::NamespaceStore;

/// Executes caching strategies against the store.
///
/// Holds the current namespace names; the lifecycle manager decides what
/// those are, the executor never invents its own. Responses are re-read
/// from the store on every request, never retained here.
pub struct StrategyExecutor<S: NamespaceStore> {
  store: Arc<S>,
  static_namespace: String,
  dynamic_namespace: String,
  fallback: OfflineFallback,
}

impl<S: NamespaceStore> StrategyExecutor<S> {
  pub fn new(
    store: Arc<S>,
    static_namespace: String,
    dynamic_namespace: String,
    fallback: OfflineFallback,
  ) -> Self {
    Self {
      store,
      static_namespace,
      dynamic_namespace,
      fallback,
    }
  }

  /// Cache-first strategy for static assets.
  ///
  /// 1. Store hit: return immediately, no network call, no revalidation
  /// 2. Miss: fetch; ok responses are stored before returning
  /// 3. Fetch failure: re-check the store, then the offline document for
  ///    document requests, then propagate the error
  pub async fn cache_first<F, Fut>(&self, request: &Request, fetch: F) -> Result<Response>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Response>>,
  {
    let key = request.key();

    if let Some(cached) = self.store.get(&self.static_namespace, &key)? {
      debug!(url = %request.url, "Serving from static cache");
      return Ok(cached.response);
    }

    match fetch().await {
      Ok(response) => {
        if response.is_ok() {
          self.store_best_effort(&self.static_namespace, request, &response);
        }
        Ok(response)
      }
      Err(err) => {
        // A concurrent task may have populated the entry in the meantime
        if let Some(cached) = self.store.get(&self.static_namespace, &key)? {
          return Ok(cached.response);
        }
        self.offline_or(request, err)
      }
    }
  }

  /// Network-first strategy for dynamic content.
  ///
  /// Fresh responses win; ok ones are stored in the dynamic namespace as a
  /// best effort. When the network is unreachable the store answers, then
  /// the offline document for document requests, then the error surfaces.
  pub async fn network_first<F, Fut>(
    &self,
    request: &Request,
    classification: Classification,
    fetch: F,
  ) -> Result<Response>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Response>>,
  {
    match fetch().await {
      Ok(response) => {
        if classification != Classification::NeverCache && response.is_ok() {
          self.store_best_effort(&self.dynamic_namespace, request, &response);
        }
        Ok(response)
      }
      Err(err) => {
        debug!(url = %request.url, "Network unavailable, trying dynamic cache");
        if let Some(cached) = self.store.get(&self.dynamic_namespace, &request.key())? {
          return Ok(cached.response);
        }
        self.offline_or(request, err)
      }
    }
  }

  /// A failed put must not fail the request that produced the response.
  fn store_best_effort(&self, namespace: &str, request: &Request, response: &Response) {
    if let Err(err) = self.store.put(namespace, &request.key(), response) {
      warn!(url = %request.url, error = %err, "Failed to cache response");
    }
  }

  /// The offline document for full-page navigations; the raw error for
  /// everything else.
  fn offline_or(&self, request: &Request, err: Report) -> Result<Response> {
    if request.destination == Destination::Document {
      debug!(url = %request.url, "Serving offline document");
      return Ok(self.fallback.document());
    }
    Err(err)
  }
}

impl<S: NamespaceStore> Clone for StrategyExecutor<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      static_namespace: self.static_namespace.clone(),
      dynamic_namespace: self.dynamic_namespace.clone(),
      fallback: self.fallback.clone(),
    }
  }
}
