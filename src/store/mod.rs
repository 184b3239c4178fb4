//! Namespace-partitioned cache storage.
//!
//! The store is the only shared mutable resource in the system:
//! - Partitioned into named, independently versioned namespaces
//! - Each namespace maps request keys to cached responses
//! - Per-key operations are atomic; same-key races are last-write-wins
//! - Backends: SQLite for persistence, an in-memory map for ephemeral use

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{CachedResponse, NamespaceStore};
