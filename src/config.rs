use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

/// Configuration for the caching worker.
///
/// Everything the worker treats as data rather than logic lives here: the
/// namespace version names, the preload list, and the classifier's pattern
/// sets. The defaults mirror a typical single-origin web app; hosts override
/// them per deployment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
  /// Application name, used as the prefix of every namespace name
  pub app_name: String,
  /// Version string baked into the current namespace names
  pub version: String,
  /// Origin the preload entries are resolved against
  pub origin: String,
  /// URLs fetched into the static namespace at install time
  pub preload: Vec<String>,
  /// Path substrings that must never be cached
  pub never_cache: Vec<String>,
  /// Path prefix treated as static content
  pub static_prefix: String,
  /// File extensions treated as static content
  pub static_extensions: Vec<String>,
  /// Optional path to a custom offline document (defaults to the built-in page)
  pub offline_page: Option<PathBuf>,
}

impl Default for WorkerConfig {
  fn default() -> Self {
    Self {
      app_name: "offcache".to_string(),
      version: "1.0.0".to_string(),
      origin: "http://localhost:8080".to_string(),
      preload: vec!["/".to_string(), "/static/manifest.json".to_string()],
      never_cache: vec![
        "/upload".to_string(),
        "/api/predict".to_string(),
        "/api/analyze".to_string(),
      ],
      static_prefix: "/static/".to_string(),
      static_extensions: vec![
        ".css".to_string(),
        ".js".to_string(),
        ".png".to_string(),
        ".jpg".to_string(),
        ".ico".to_string(),
      ],
      offline_page: None,
    }
  }
}

impl WorkerConfig {
  /// Name of the static namespace for this version.
  pub fn static_namespace(&self) -> String {
    format!("{}-static-v{}", self.app_name, self.version)
  }

  /// Name of the dynamic namespace for this version.
  pub fn dynamic_namespace(&self) -> String {
    format!("{}-dynamic-v{}", self.app_name, self.version)
  }

  /// The namespace names recognized as current; everything else is purged
  /// on activation.
  pub fn current_namespaces(&self) -> [String; 2] {
    [self.static_namespace(), self.dynamic_namespace()]
  }

  /// Resolve a preload entry against the configured origin.
  ///
  /// Entries are usually origin-relative paths ("/static/manifest.json");
  /// absolute URLs pass through unchanged.
  pub fn preload_url(&self, entry: &str) -> Result<Url> {
    let origin =
      Url::parse(&self.origin).map_err(|e| eyre!("Invalid origin {}: {}", self.origin, e))?;
    origin
      .join(entry)
      .map_err(|e| eyre!("Invalid preload entry {}: {}", entry, e))
  }

  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./offcache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/offcache/config.yaml
  /// 4. ~/.config/offcache/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/offcache/config.yaml\n\
                 or construct WorkerConfig directly."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("offcache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("offcache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: WorkerConfig = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }
}
