//! Request classification: decides whether and how a request may be cached.

use crate::config::WorkerConfig;
use crate::http::Request;

/// How a request may interact with the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
  /// Never read from or written to the store
  NeverCache,
  /// Served cache-first from the static namespace
  Static,
  /// Served network-first through the dynamic namespace
  Dynamic,
}

/// Pattern-driven request classifier.
///
/// Holds the never-cache substrings and the static prefix/extension sets
/// from configuration; classification itself is a pure function of
/// method + path with no side effects.
#[derive(Debug, Clone)]
pub struct Classifier {
  never_cache: Vec<String>,
  static_prefix: String,
  static_extensions: Vec<String>,
}

impl Classifier {
  pub fn new(config: &WorkerConfig) -> Self {
    Self {
      never_cache: config.never_cache.clone(),
      static_prefix: config.static_prefix.clone(),
      static_extensions: config.static_extensions.clone(),
    }
  }

  /// Classify a request. Total: every request maps to exactly one class.
  pub fn classify(&self, request: &Request) -> Classification {
    // Mutating methods are never cacheable, regardless of path
    if !request.method.is_get() {
      return Classification::NeverCache;
    }

    let path = request.path();
    if self.never_cache.iter().any(|p| path.contains(p.as_str())) {
      return Classification::NeverCache;
    }

    if path.starts_with(&self.static_prefix) || self.has_static_extension(path) {
      return Classification::Static;
    }

    Classification::Dynamic
  }

  fn has_static_extension(&self, path: &str) -> bool {
    self
      .static_extensions
      .iter()
      .any(|ext| path.ends_with(ext.as_str()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::http::{Method, Request};

  fn classifier() -> Classifier {
    Classifier::new(&WorkerConfig::default())
  }

  fn request(method: Method, url: &str) -> Request {
    let mut request = Request::get(url).unwrap();
    request.method = method;
    request
  }

  #[test]
  fn test_non_get_is_never_cached_regardless_of_path() {
    for url in [
      "https://app.example/",
      "https://app.example/static/app.css",
      "https://app.example/dashboard",
    ] {
      for method in [Method::Post, Method::Put, Method::Delete, Method::Patch] {
        assert_eq!(
          classifier().classify(&request(method, url)),
          Classification::NeverCache
        );
      }
    }
  }

  #[test]
  fn test_never_cache_patterns_match_as_substrings() {
    let get = |url| request(Method::Get, url);
    assert_eq!(
      classifier().classify(&get("https://app.example/api/predict")),
      Classification::NeverCache
    );
    assert_eq!(
      classifier().classify(&get("https://app.example/v2/api/analyze/result")),
      Classification::NeverCache
    );
    assert_eq!(
      classifier().classify(&get("https://app.example/upload")),
      Classification::NeverCache
    );
  }

  #[test]
  fn test_static_prefix_wins() {
    let req = request(Method::Get, "https://app.example/static/icons/icon-192x192.png");
    assert_eq!(classifier().classify(&req), Classification::Static);
  }

  #[test]
  fn test_static_extension_outside_prefix() {
    let req = request(Method::Get, "https://app.example/theme/app.css");
    assert_eq!(classifier().classify(&req), Classification::Static);
  }

  #[test]
  fn test_everything_else_is_dynamic() {
    let req = request(Method::Get, "https://app.example/dashboard");
    assert_eq!(classifier().classify(&req), Classification::Dynamic);
  }

  #[test]
  fn test_never_cache_beats_static() {
    // A sensitive path stays uncacheable even when it looks static
    let config = WorkerConfig {
      never_cache: vec!["/static/private".to_string()],
      ..WorkerConfig::default()
    };
    let classifier = Classifier::new(&config);
    let req = request(Method::Get, "https://app.example/static/private/token.js");
    assert_eq!(classifier.classify(&req), Classification::NeverCache);
  }
}
