//! Request and response types shared across the caching layer.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// HTTP method of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Head,
  Post,
  Put,
  Delete,
  Patch,
  Options,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Head => "HEAD",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Delete => "DELETE",
      Method::Patch => "PATCH",
      Method::Options => "OPTIONS",
    }
  }

  /// Whether this is a plain read.
  pub fn is_get(&self) -> bool {
    matches!(self, Method::Get)
  }
}

/// What the host intends to do with the response.
///
/// Only `Document` changes behavior: full-page navigations are eligible for
/// the offline fallback document, everything else surfaces network errors
/// unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
  /// Full-page navigation
  Document,
  Script,
  Style,
  Image,
  /// Anything else (API calls, fonts, ...)
  #[default]
  Other,
}

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  pub url: Url,
  pub destination: Destination,
}

impl Request {
  pub fn new(method: Method, url: Url) -> Self {
    Self {
      method,
      url,
      destination: Destination::Other,
    }
  }

  /// Convenience constructor for GET requests.
  pub fn get(url: &str) -> Result<Self> {
    let url = Url::parse(url).map_err(|e| eyre!("Invalid request URL {}: {}", url, e))?;
    Ok(Self::new(Method::Get, url))
  }

  pub fn with_destination(mut self, destination: Destination) -> Self {
    self.destination = destination;
    self
  }

  /// URL path, as the classifier sees it.
  pub fn path(&self) -> &str {
    self.url.path()
  }

  /// Stable cache key for this request.
  pub fn key(&self) -> RequestKey {
    RequestKey::from_request(self)
  }
}

/// Fixed-length cache key derived from method + URL.
///
/// Two requests with the same method, scheme, host, path and query map to
/// the same key; fragments are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey(String);

impl RequestKey {
  fn from_request(request: &Request) -> Self {
    let url = &request.url;
    let mut input = format!(
      "{} {}://{}",
      request.method.as_str(),
      url.scheme(),
      url.host_str().unwrap_or("")
    );
    if let Some(port) = url.port() {
      input.push(':');
      input.push_str(&port.to_string());
    }
    input.push_str(url.path());
    if let Some(query) = url.query() {
      input.push('?');
      input.push_str(query);
    }

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    RequestKey(hex::encode(hasher.finalize()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

/// A response as seen by the caching layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl Response {
  pub fn new(status: u16) -> Self {
    Self {
      status,
      headers: Vec::new(),
      body: Vec::new(),
    }
  }

  pub fn with_header(mut self, name: &str, value: &str) -> Self {
    self.headers.push((name.to_string(), value.to_string()));
    self
  }

  pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
    self.body = body.into();
    self
  }

  /// Whether the status is in the successful range. Only ok responses are
  /// ever cached.
  pub fn is_ok(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// First header with the given name, case-insensitive.
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(n, _)| n.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_same_request_same_key() {
    let a = Request::get("https://app.example/page?x=1").unwrap();
    let b = Request::get("https://app.example/page?x=1").unwrap();
    assert_eq!(a.key(), b.key());
  }

  #[test]
  fn test_query_distinguishes_keys() {
    let a = Request::get("https://app.example/page?x=1").unwrap();
    let b = Request::get("https://app.example/page?x=2").unwrap();
    assert_ne!(a.key(), b.key());
  }

  #[test]
  fn test_fragment_is_ignored() {
    let a = Request::get("https://app.example/page#top").unwrap();
    let b = Request::get("https://app.example/page").unwrap();
    assert_eq!(a.key(), b.key());
  }

  #[test]
  fn test_method_distinguishes_keys() {
    let get = Request::get("https://app.example/upload").unwrap();
    let post = Request::new(Method::Post, get.url.clone());
    assert_ne!(get.key(), post.key());
  }

  #[test]
  fn test_destination_does_not_affect_key() {
    let plain = Request::get("https://app.example/page").unwrap();
    let doc = plain.clone().with_destination(Destination::Document);
    assert_eq!(plain.key(), doc.key());
  }

  #[test]
  fn test_ok_status_range() {
    assert!(!Response::new(199).is_ok());
    assert!(Response::new(200).is_ok());
    assert!(Response::new(299).is_ok());
    assert!(!Response::new(300).is_ok());
    assert!(!Response::new(404).is_ok());
  }

  #[test]
  fn test_header_lookup_is_case_insensitive() {
    let response = Response::new(200).with_header("Content-Type", "text/html");
    assert_eq!(response.header("content-type"), Some("text/html"));
    assert_eq!(response.header("x-missing"), None);
  }
}
