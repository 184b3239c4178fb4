//! Offline fallback document.

use crate::http::Response;

/// Built-in offline page. Presentation data only; hosts usually supply
/// their own via `WorkerConfig::offline_page`.
const DEFAULT_OFFLINE_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Offline</title>
</head>
<body>
<h1>You are offline</h1>
<p>This page could not be reached. Reconnect and try again.</p>
</body>
</html>
"#;

/// Supplies the static offline document served when a navigation has no
/// cached entry and the network is unreachable.
///
/// Deterministic and infallible: the bytes are held in memory from
/// construction onwards.
#[derive(Debug, Clone)]
pub struct OfflineFallback {
  document: Vec<u8>,
}

impl OfflineFallback {
  /// Fallback serving the built-in page.
  pub fn new() -> Self {
    Self {
      document: DEFAULT_OFFLINE_PAGE.as_bytes().to_vec(),
    }
  }

  /// Fallback serving host-supplied document bytes.
  pub fn with_document(document: Vec<u8>) -> Self {
    Self { document }
  }

  /// Build the offline response.
  pub fn document(&self) -> Response {
    Response::new(200)
      .with_header("content-type", "text/html")
      .with_body(self.document.clone())
  }
}

impl Default for OfflineFallback {
  fn default() -> Self {
    Self::new()
  }
}
