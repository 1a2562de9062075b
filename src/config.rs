//! Server configuration.
//!
//! Handles loading, validating, and merging `galleryd.toml`. The config is
//! built once at startup and handed to the components that need it; nothing
//! reads configuration from global state.
//!
//! ## Layers
//!
//! Lowest to highest priority:
//!
//! 1. Stock defaults ([`ServerConfig::default`])
//! 2. The config file, if one exists
//! 3. Command-line flags ([`Overrides`])
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [server]
//! bind = "0.0.0.0:6112"          # Gallery listener
//! # metrics_bind = "0.0.0.0:6113" # Prometheus text endpoint (off when absent)
//!
//! [folders]
//! gallery = "gallery"            # Root of the served image tree (read-only)
//! cache = ".cache"               # Root of the thumbnail cache
//!
//! [thumbnails]
//! quality = 85                   # JPEG quality (1-100)
//!
//! [log]
//! level = "info"                 # trace, debug, info, warn, error
//! # file = "galleryd.log"        # Append logs here instead of stdout
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Log levels accepted by `log.level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Complete server configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Network listeners.
    pub server: BindConfig,
    /// Gallery and cache roots.
    pub folders: FoldersConfig,
    /// Thumbnail encoding settings.
    pub thumbnails: ThumbnailsConfig,
    /// Log verbosity and destination.
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BindConfig {
    /// Address the gallery listens on.
    pub bind: String,
    /// Address for the metrics listener. Disabled when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_bind: Option<String>,
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:6112".to_string(),
            metrics_bind: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FoldersConfig {
    /// Directory whose contents are served under `/gallery`.
    pub gallery: PathBuf,
    /// Directory where generated thumbnails are kept.
    pub cache: PathBuf,
}

impl Default for FoldersConfig {
    fn default() -> Self {
        Self {
            gallery: PathBuf::from("gallery"),
            cache: PathBuf::from(".cache"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self { quality: 85 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Minimum level that gets logged.
    pub level: String,
    /// Append to this file instead of writing to stdout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl ServerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.thumbnails.quality) {
            return Err(ConfigError::Validation(
                "thumbnails.quality must be 1-100".into(),
            ));
        }
        if self.folders.gallery.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "folders.gallery must not be empty".into(),
            ));
        }
        if self.folders.cache.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "folders.cache must not be empty".into(),
            ));
        }
        parse_bind("server.bind", &self.server.bind)?;
        if let Some(metrics) = &self.server.metrics_bind {
            parse_bind("server.metrics_bind", metrics)?;
        }
        if !LOG_LEVELS.contains(&self.log.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "log.level must be one of {}, got {:?}",
                LOG_LEVELS.join(", "),
                self.log.level
            )));
        }
        Ok(())
    }

    /// The gallery bind address, already validated.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_bind("server.bind", &self.server.bind)
    }

    /// The metrics bind address, if metrics are enabled.
    pub fn metrics_addr(&self) -> Result<Option<SocketAddr>, ConfigError> {
        self.server
            .metrics_bind
            .as_deref()
            .map(|m| parse_bind("server.metrics_bind", m))
            .transpose()
    }
}

fn parse_bind(key: &str, value: &str) -> Result<SocketAddr, ConfigError> {
    value.parse().map_err(|_| {
        ConfigError::Validation(format!("{key} must be a socket address like 0.0.0.0:6112, got {value:?}"))
    })
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub gallery: Option<PathBuf>,
    pub cache: Option<PathBuf>,
    pub bind: Option<String>,
    pub metrics_bind: Option<String>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl Overrides {
    /// Apply every set override onto `config`.
    pub fn apply(self, config: &mut ServerConfig) {
        if let Some(gallery) = self.gallery {
            config.folders.gallery = gallery;
        }
        if let Some(cache) = self.cache {
            config.folders.cache = cache;
        }
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(metrics) = self.metrics_bind {
            config.server.metrics_bind = Some(metrics);
        }
        if let Some(level) = self.log_level {
            config.log.level = level;
        }
        if let Some(file) = self.log_file {
            config.log.file = Some(file);
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ServerConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ServerConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    Ok(merged.try_into()?)
}

/// Build the effective config: defaults, then `path` (if it exists), then
/// `overrides`. The result is validated.
pub fn load_config(path: &Path, overrides: Overrides) -> Result<ServerConfig, ConfigError> {
    let mut config = resolve_config(stock_defaults_value(), load_raw_config(path)?)?;
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `galleryd.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# galleryd configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Command-line flags override them.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Listeners
# ---------------------------------------------------------------------------
[server]
# Address the gallery is served on.
bind = "0.0.0.0:6112"

# Serve Prometheus-style counters on GET /metrics at this address.
# Disabled when absent.
# metrics_bind = "0.0.0.0:6113"

# ---------------------------------------------------------------------------
# Folders
# ---------------------------------------------------------------------------
[folders]
# Directory served under /gallery. Never written to.
gallery = "gallery"

# Where generated thumbnails are stored, nested by source path, width and
# height. Safe to delete at any time; entries are recreated on demand.
cache = ".cache"

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[thumbnails]
# JPEG quality for generated thumbnails (1 = worst, 100 = best).
# Changing this does not rewrite thumbnails that are already cached.
quality = 85

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[log]
# One of: trace, debug, info, warn, error. RUST_LOG takes precedence.
level = "info"

# Append logs to this file instead of stdout.
# file = "galleryd.log"
"##
}
