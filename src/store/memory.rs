//! In-memory namespace store.

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::Mutex;

use super::traits::{CachedResponse, NamespaceStore};
use crate::http::{RequestKey, Response};

/// Namespace store backed by a process-local map.
///
/// Same semantics as `SqliteStore` but nothing survives the process. Used
/// by hosts that do not want persistence, and throughout the tests.
#[derive(Default)]
pub struct MemoryStore {
  namespaces: Mutex<HashMap<String, HashMap<String, CachedResponse>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl NamespaceStore for MemoryStore {
  fn open(&self, namespace: &str) -> Result<()> {
    let mut namespaces = self
      .namespaces
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    namespaces.entry(namespace.to_string()).or_default();
    Ok(())
  }

  fn get(&self, namespace: &str, key: &RequestKey) -> Result<Option<CachedResponse>> {
    let namespaces = self
      .namespaces
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(
      namespaces
        .get(namespace)
        .and_then(|entries| entries.get(key.as_str()))
        .cloned(),
    )
  }

  fn put(&self, namespace: &str, key: &RequestKey, response: &Response) -> Result<()> {
    if !response.is_ok() {
      return Err(eyre!(
        "Refusing to cache non-ok response (status {})",
        response.status
      ));
    }

    let mut namespaces = self
      .namespaces
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    namespaces.entry(namespace.to_string()).or_default().insert(
      key.as_str().to_string(),
      CachedResponse {
        response: response.clone(),
        cached_at: Utc::now(),
      },
    );
    Ok(())
  }

  fn list_namespaces(&self) -> Result<Vec<String>> {
    let namespaces = self
      .namespaces
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let mut names: Vec<String> = namespaces.keys().cloned().collect();
    names.sort();
    Ok(names)
  }

  fn purge(&self, namespace: &str) -> Result<()> {
    let mut namespaces = self
      .namespaces
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    namespaces.remove(namespace);
    Ok(())
  }
}
