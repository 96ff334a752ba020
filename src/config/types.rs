// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub tls: TlsConfig,
    pub assets: AssetsConfig,
    pub logging: LoggingConfig,
}

/// Listener configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Plain HTTP port that redirects to the HTTPS listener
    #[serde(default)]
    pub redirect_from: Option<u16>,
    /// Upper bound on waiting for in-flight responses at shutdown
    pub shutdown_timeout_ms: u64,
    /// Header read timeout in seconds
    pub read_timeout: u64,
}

/// TLS material
#[derive(Debug, Deserialize, Clone)]
pub struct TlsConfig {
    pub enabled: bool,
    pub cert_file: String,
    pub key_file: String,
}

/// Document root, cache and streaming settings
#[derive(Debug, Deserialize, Clone)]
pub struct AssetsConfig {
    pub source_root: String,
    /// Searched in order; empty means `[source_root]`
    #[serde(default)]
    pub base_paths: Vec<String>,
    /// Directories excluded from preloading
    #[serde(default)]
    pub ignore: Vec<String>,
    pub default_document: String,
    pub idle_timeout_ms: u64,
    /// Build the in-memory cache at startup
    pub preload: bool,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common or json)
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}
