//! Configuration loading

use anyhow::{Context, Result};
use drydock_core::ResourceKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub origin: OriginConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub manifest: ManifestConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

/// Cache store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Store backend: "local" or "memory"
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Base directory for the local backend
    #[serde(default = "default_cache_path")]
    pub path: String,
    /// Name of the current generation. Advancing the manifest requires
    /// advancing this name; names are never reused.
    pub generation: String,
}

/// Application origin configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginConfig {
    /// Base URL the controller fronts
    pub url: String,
    /// Skip TLS certificate verification toward the origin
    #[serde(default)]
    pub skip_tls_verify: bool,
}

/// Routing policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Trusted static-asset hosts served cache-first
    #[serde(default)]
    pub static_hosts: Vec<String>,
    /// Schemes never intercepted
    #[serde(default = "default_bypass_schemes")]
    pub bypass_schemes: Vec<String>,
    /// Resource kinds that never receive the offline document
    #[serde(default = "default_fallback_exempt")]
    pub fallback_exempt: Vec<ResourceKind>,
    /// Origin-relative location of the offline document
    #[serde(default = "default_offline_path")]
    pub offline_path: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            static_hosts: Vec::new(),
            bypass_schemes: default_bypass_schemes(),
            fallback_exempt: default_fallback_exempt(),
            offline_path: default_offline_path(),
        }
    }
}

/// Precache manifest configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ManifestConfig {
    /// Resource locations to store at install time
    #[serde(default)]
    pub entries: Vec<String>,
    /// Attempt precaching of remote (cross-origin) entries
    #[serde(default)]
    pub precache_remote: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_backend() -> String {
    "local".to_string()
}

fn default_cache_path() -> String {
    "./data/cache".to_string()
}

fn default_bypass_schemes() -> Vec<String> {
    ["data", "blob", "chrome-extension", "moz-extension"]
        .map(String::from)
        .to_vec()
}

fn default_fallback_exempt() -> Vec<ResourceKind> {
    vec![ResourceKind::Media]
}

fn default_offline_path() -> String {
    "/offline.html".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &str) -> Result<Self> {
        let config_path = Path::new(path);

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        info!("Loaded configuration from {}", path);
        Ok(config)
    }
}
