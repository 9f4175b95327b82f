//! Runtime server configuration.
//!
//! Read from an optional TOML file layered under `PHRASEMATE_*` environment
//! variables. Nested keys use `__`, e.g. `PHRASEMATE_SCHEDULING__SESSION_SIZE`.

use std::path::{Path, PathBuf};

use phrasemate_core::SchedulingConfig;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "PHRASEMATE";

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                   String,
  #[serde(default = "default_port")]
  pub port:                   u16,
  #[serde(default = "default_store_path")]
  pub store_path:             PathBuf,
  /// Username the chat bridge authenticates with.
  #[serde(default)]
  pub auth_username:          String,
  /// argon2 PHC string; see `phrasemate hash-password`.
  #[serde(default)]
  pub auth_password_hash:     String,
  /// Where presentations are POSTed. Logged only when unset.
  #[serde(default)]
  pub delivery_url:           Option<String>,
  /// Run a dispatch pass this often while serving.
  #[serde(default)]
  pub dispatch_interval_secs: Option<u64>,
  #[serde(default)]
  pub scheduling:             SchedulingConfig,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("phrasemate.db") }

impl ServerConfig {
  /// Load `path` (if it exists) and the environment overrides.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix(ENV_PREFIX)
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }

  /// `store_path` with a leading `~` expanded to the home directory.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
