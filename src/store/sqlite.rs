//! SQLite-backed namespace store.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Mutex;

use super::traits::{CachedResponse, NamespaceStore};
use crate::http::{RequestKey, Response};

/// SQLite-based persistent namespace store.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open or create the store at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// Open the store at an explicit path.
  pub fn open_at(path: &std::path::Path) -> Result<Self> {
    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;
    Self::from_connection(conn)
  }

  /// In-memory store, nothing written to disk. Used by tests and ephemeral
  /// hosts that still want SQL semantics.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;
    Ok(store)
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("offcache").join("cache.db"))
  }

  /// Run database migrations for the store tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(STORE_SCHEMA)
      .map_err(|e| eyre!("Failed to run store migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for the store tables.
const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS namespaces (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Request/response pairs, partitioned by namespace (headers stored as JSON)
CREATE TABLE IF NOT EXISTS entries (
    namespace TEXT NOT NULL,
    request_key TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers BLOB NOT NULL,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (namespace, request_key)
);

CREATE INDEX IF NOT EXISTS idx_entries_namespace ON entries(namespace);
"#;

impl NamespaceStore for SqliteStore {
  fn open(&self, namespace: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR IGNORE INTO namespaces (name) VALUES (?)",
        params![namespace],
      )
      .map_err(|e| eyre!("Failed to open namespace {}: {}", namespace, e))?;

    Ok(())
  }

  fn get(&self, namespace: &str, key: &RequestKey) -> Result<Option<CachedResponse>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare(
        "SELECT status, headers, body, cached_at FROM entries
         WHERE namespace = ? AND request_key = ?",
      )
      .map_err(|e| eyre!("Failed to prepare entry query: {}", e))?;

    let row: Option<(u16, Vec<u8>, Vec<u8>, String)> = stmt
      .query_row(params![namespace, key.as_str()], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
      })
      .optional()
      .map_err(|e| eyre!("Failed to query entry: {}", e))?;

    match row {
      Some((status, headers, body, cached_at_str)) => {
        let headers: Vec<(String, String)> = serde_json::from_slice(&headers)
          .map_err(|e| eyre!("Failed to deserialize cached headers: {}", e))?;
        let cached_at = parse_datetime(&cached_at_str)?;
        Ok(Some(CachedResponse {
          response: Response {
            status,
            headers,
            body,
          },
          cached_at,
        }))
      }
      None => Ok(None),
    }
  }

  fn put(&self, namespace: &str, key: &RequestKey, response: &Response) -> Result<()> {
    if !response.is_ok() {
      return Err(eyre!(
        "Refusing to cache non-ok response (status {})",
        response.status
      ));
    }

    let headers = serde_json::to_vec(&response.headers)
      .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR IGNORE INTO namespaces (name) VALUES (?)",
        params![namespace],
      )
      .map_err(|e| eyre!("Failed to open namespace {}: {}", namespace, e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO entries (namespace, request_key, status, headers, body, cached_at)
         VALUES (?, ?, ?, ?, ?, datetime('now'))",
        params![namespace, key.as_str(), response.status, headers, response.body],
      )
      .map_err(|e| eyre!("Failed to store entry: {}", e))?;

    Ok(())
  }

  fn list_namespaces(&self) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT name FROM namespaces ORDER BY name")
      .map_err(|e| eyre!("Failed to prepare namespace query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to query namespaces: {}", e))?
      .filter_map(|r| r.ok())
      .collect();

    Ok(names)
  }

  fn purge(&self, namespace: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM entries WHERE namespace = ?", params![namespace])
      .map_err(|e| eyre!("Failed to purge entries of {}: {}", namespace, e))?;

    conn
      .execute("DELETE FROM namespaces WHERE name = ?", params![namespace])
      .map_err(|e| eyre!("Failed to purge namespace {}: {}", namespace, e))?;

    Ok(())
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::http::Request;

  fn store() -> SqliteStore {
    SqliteStore::open_in_memory().unwrap()
  }

  fn key(url: &str) -> RequestKey {
    Request::get(url).unwrap().key()
  }

  #[test]
  fn test_open_is_idempotent() {
    let store = store();
    store.open("static-v1").unwrap();
    store.open("static-v1").unwrap();
    assert_eq!(store.list_namespaces().unwrap(), vec!["static-v1"]);
  }

  #[test]
  fn test_put_then_get_round_trips() {
    let store = store();
    let key = key("https://app.example/static/app.css");
    let response = Response::new(200)
      .with_header("content-type", "text/css")
      .with_body(&b"body { margin: 0 }"[..]);

    store.put("static-v1", &key, &response).unwrap();

    let cached = store.get("static-v1", &key).unwrap().unwrap();
    assert_eq!(cached.response.status, 200);
    assert_eq!(cached.response.header("content-type"), Some("text/css"));
    assert_eq!(cached.response.body, b"body { margin: 0 }");
  }

  #[test]
  fn test_put_overwrites_existing_entry() {
    let store = store();
    let key = key("https://app.example/page");

    store
      .put("dynamic-v1", &key, &Response::new(200).with_body(&b"old"[..]))
      .unwrap();
    store
      .put("dynamic-v1", &key, &Response::new(200).with_body(&b"new"[..]))
      .unwrap();

    let cached = store.get("dynamic-v1", &key).unwrap().unwrap();
    assert_eq!(cached.response.body, b"new");
  }

  #[test]
  fn test_non_ok_responses_are_rejected() {
    let store = store();
    let key = key("https://app.example/missing");

    assert!(store.put("static-v1", &key, &Response::new(404)).is_err());
    assert!(store.get("static-v1", &key).unwrap().is_none());
  }

  #[test]
  fn test_get_from_unknown_namespace_is_none() {
    let store = store();
    assert!(store
      .get("nope", &key("https://app.example/"))
      .unwrap()
      .is_none());
  }

  #[test]
  fn test_entries_are_isolated_per_namespace() {
    let store = store();
    let key = key("https://app.example/page");
    store.put("static-v1", &key, &Response::new(200)).unwrap();

    assert!(store.get("dynamic-v1", &key).unwrap().is_none());
    assert!(store.get("static-v1", &key).unwrap().is_some());
  }

  #[test]
  fn test_purge_removes_namespace_and_entries() {
    let store = store();
    let key = key("https://app.example/page");
    store.put("static-v1", &key, &Response::new(200)).unwrap();

    store.purge("static-v1").unwrap();

    assert!(store.list_namespaces().unwrap().is_empty());
    assert!(store.get("static-v1", &key).unwrap().is_none());
  }

  #[test]
  fn test_purge_missing_namespace_is_a_noop() {
    let store = store();
    store.purge("never-existed").unwrap();
  }
}
