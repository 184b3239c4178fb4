//! Store trait and cached-response types.

use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::{Deserialize, Serialize};

use crate::http::{RequestKey, Response};

/// A response held by the store, with the time it was cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
  pub response: Response,
  pub cached_at: DateTime<Utc>,
}

/// Trait for namespace-partitioned cache storage backends.
///
/// Every operation is scoped to a single key within a single namespace and
/// is atomic from the caller's perspective. There is no read-modify-write
/// atomicity across operations: concurrent puts to the same key resolve
/// last-write-wins, which is acceptable because entries are idempotent
/// replacements of the same logical resource.
pub trait NamespaceStore: Send + Sync {
  /// Create the namespace on first use. Idempotent.
  fn open(&self, namespace: &str) -> Result<()>;

  /// Look up a cached response.
  fn get(&self, namespace: &str, key: &RequestKey) -> Result<Option<CachedResponse>>;

  /// Store a response, overwriting any prior entry for the key.
  ///
  /// Only "ok" responses are accepted; anything else is an error. The
  /// namespace is created if it does not exist yet.
  fn put(&self, namespace: &str, key: &RequestKey, response: &Response) -> Result<()>;

  /// Names of all namespaces currently in the store.
  fn list_namespaces(&self) -> Result<Vec<String>>;

  /// Delete a namespace and all its entries. Purging a namespace that does
  /// not exist is a no-op.
  fn purge(&self, namespace: &str) -> Result<()>;
}
