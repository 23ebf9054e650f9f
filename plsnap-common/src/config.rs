//! Configuration loading and config file resolution
//!
//! Configuration comes from a single TOML file. Every section and every field has a
//! built-in default, so a missing file is a warning rather than a startup failure.
//!
//! # Config file priority
//! 1. Command-line argument (highest priority)
//! 2. `PLSNAP_CONFIG` environment variable
//! 3. `<config_dir>/plsnap/config.toml` if it exists
//! 4. Built-in defaults (fallback)
//!
//! Spotify credentials additionally honor `PLSNAP_SPOTIFY_CLIENT_ID` and
//! `PLSNAP_SPOTIFY_CLIENT_SECRET`, which take precedence over the TOML values.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "PLSNAP_CONFIG";

/// Environment variable overriding `spotify.client_id`
pub const CLIENT_ID_ENV_VAR: &str = "PLSNAP_SPOTIFY_CLIENT_ID";

/// Environment variable overriding `spotify.client_secret`
pub const CLIENT_SECRET_ENV_VAR: &str = "PLSNAP_SPOTIFY_CLIENT_SECRET";

/// Complete TOML configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Object store layout and timeouts
    #[serde(default)]
    pub storage: StorageConfig,

    /// Upstream playlist source
    #[serde(default)]
    pub spotify: SpotifyConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Object store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the local bucket
    #[serde(default = "default_bucket_root")]
    pub root: PathBuf,

    /// Upper bound for a single storage operation
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Total time budget for retrying a retryable storage failure
    #[serde(default = "default_max_retry_wait_ms")]
    pub max_retry_wait_ms: u64,

    /// Namespace of raw files waiting to be processed
    #[serde(default = "default_pending_prefix")]
    pub pending_prefix: String,

    /// Namespace of raw files already processed
    #[serde(default = "default_processed_prefix")]
    pub processed_prefix: String,

    /// Namespace under which the per-entity tables are published
    #[serde(default = "default_published_prefix")]
    pub published_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_bucket_root(),
            timeout_ms: default_timeout_ms(),
            max_retry_wait_ms: default_max_retry_wait_ms(),
            pending_prefix: default_pending_prefix(),
            processed_prefix: default_processed_prefix(),
            published_prefix: default_published_prefix(),
        }
    }
}

impl StorageConfig {
    /// Check prefix consistency
    ///
    /// Prefixes must be non-empty, end with `/`, and the pending and processed
    /// namespaces must not contain one another (listing one would surface the other).
    pub fn validate(&self) -> Result<()> {
        for (name, prefix) in [
            ("pending_prefix", &self.pending_prefix),
            ("processed_prefix", &self.processed_prefix),
            ("published_prefix", &self.published_prefix),
        ] {
            if prefix.is_empty() || !prefix.ends_with('/') {
                return Err(Error::Config(format!(
                    "storage.{} must be non-empty and end with '/': {:?}",
                    name, prefix
                )));
            }
        }

        if self.pending_prefix.starts_with(&self.processed_prefix)
            || self.processed_prefix.starts_with(&self.pending_prefix)
        {
            return Err(Error::Config(format!(
                "storage.pending_prefix ({}) and storage.processed_prefix ({}) overlap",
                self.pending_prefix, self.processed_prefix
            )));
        }

        if self.timeout_ms == 0 {
            return Err(Error::Config("storage.timeout_ms must be > 0".to_string()));
        }

        Ok(())
    }
}

/// Upstream playlist configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotifyConfig {
    /// Playlist URL (or bare playlist id) fetched by `run`
    #[serde(default)]
    pub playlist_url: Option<String>,

    /// OAuth client id
    #[serde(default)]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// Client credentials pair
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl SpotifyConfig {
    /// Resolve client credentials, environment first, then TOML
    ///
    /// Returns a `Config` error naming the missing value when either half is absent.
    pub fn resolve_credentials(&self) -> Result<ClientCredentials> {
        let client_id = pick_credential(CLIENT_ID_ENV_VAR, self.client_id.as_deref())
            .ok_or_else(|| {
                Error::Config(format!(
                    "Spotify client id not configured (set {} or spotify.client_id)",
                    CLIENT_ID_ENV_VAR
                ))
            })?;
        let client_secret =
            pick_credential(CLIENT_SECRET_ENV_VAR, self.client_secret.as_deref()).ok_or_else(
                || {
                    Error::Config(format!(
                        "Spotify client secret not configured (set {} or spotify.client_secret)",
                        CLIENT_SECRET_ENV_VAR
                    ))
                },
            )?;

        Ok(ClientCredentials {
            client_id,
            client_secret,
        })
    }
}

fn pick_credential(env_var: &str, toml_value: Option<&str>) -> Option<String> {
    if let Ok(value) = std::env::var(env_var) {
        if is_valid_value(&value) {
            return Some(value);
        }
    }
    toml_value.filter(|v| is_valid_value(v)).map(str::to_string)
}

/// Non-empty, non-whitespace
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bucket_root() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("plsnap").join("bucket"))
        .unwrap_or_else(|| PathBuf::from("./plsnap_data/bucket"))
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_retry_wait_ms() -> u64 {
    30_000
}

fn default_pending_prefix() -> String {
    "raw/pending/".to_string()
}

fn default_processed_prefix() -> String {
    "raw/processed/".to_string()
}

fn default_published_prefix() -> String {
    "published/".to_string()
}

/// Resolve which config file to read, if any
///
/// Returns None when neither the CLI nor the environment names a file and the
/// platform default does not exist.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if is_valid_value(&path) {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config dir
    default_config_path().filter(|path| path.exists())
}

/// `<config_dir>/plsnap/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("plsnap").join("config.toml"))
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config {}: {}", path.display(), e))
    })?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config {}: {}", path.display(), e)))
}

/// Load configuration following the priority order above
///
/// An explicitly named file (CLI or environment) that cannot be read is an error.
/// When no file is named and none exists at the default location, defaults are used.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    let config = match resolve_config_path(cli_arg) {
        Some(path) => {
            let config = load_toml_config(&path)?;
            info!(path = %path.display(), "Loaded configuration");
            config
        }
        None => {
            warn!("No config file found, using built-in defaults");
            TomlConfig::default()
        }
    };

    config.storage.validate()?;
    Ok(config)
}

/// Write a config file
///
/// Creates missing parent directories. The file is written to a sibling temp path
/// and renamed into place so readers never observe a partial file.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
