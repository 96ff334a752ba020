// Configuration module entry point
// Loads settings from file + environment and resolves them against the filesystem

mod state;
mod types;

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::asset::AssetOptions;
use crate::error::{DevServeError, Result};

// Re-export public types
pub use state::AppState;
pub use types::{AssetsConfig, Config, LoggingConfig, ServerConfig, TlsConfig};

/// Config file looked up when none is given (extension optional)
pub const DEFAULT_CONFIG_FILE: &str = "devserve";

impl Config {
    /// Load configuration from the given file path (without extension)
    ///
    /// The file is optional. `DEVSERVE_<SECTION>__<KEY>` environment variables
    /// override it, e.g. `DEVSERVE_SERVER__PORT=8443`.
    pub fn load_from(config_path: &str) -> std::result::Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("DEVSERVE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 443)?
            .set_default("server.redirect_from", 80)?
            .set_default("server.shutdown_timeout_ms", 5000)?
            .set_default("server.read_timeout", 30)?
            .set_default("tls.enabled", true)?
            .set_default("tls.cert_file", "dev/server.crt")?
            .set_default("tls.key_file", "dev/server.key")?
            .set_default("assets.source_root", ".")?
            .set_default("assets.base_paths", Vec::<String>::new())?
            .set_default("assets.ignore", vec!["dev"])?
            .set_default("assets.default_document", "index.html")?
            .set_default("assets.idle_timeout_ms", 10_000)?
            .set_default("assets.preload", true)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr> {
        parse_addr(&self.server.host, self.server.port)
    }

    /// Address of the HTTP -> HTTPS redirect listener, if one should run
    ///
    /// `redirect_from = 0` disables it.
    pub fn get_redirect_socket_addr(&self) -> Result<Option<SocketAddr>> {
        match self.server.redirect_from {
            Some(port) if port != 0 && self.tls.enabled => {
                parse_addr(&self.server.host, port).map(Some)
            }
            _ => Ok(None),
        }
    }

    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.server.shutdown_timeout_ms)
    }

    /// Resolve asset settings against the filesystem
    ///
    /// The source root must exist; base paths and ignored directories are
    /// taken relative to it unless absolute.
    pub fn asset_options(&self) -> Result<AssetOptions> {
        let configured = Path::new(&self.assets.source_root);
        let source_root = configured
            .canonicalize()
            .map_err(|source| DevServeError::RootUnreadable {
                path: configured.to_path_buf(),
                source,
            })?;
        if !source_root.is_dir() {
            return Err(DevServeError::RootUnreadable {
                path: configured.to_path_buf(),
                source: io::Error::other("not a directory"),
            });
        }

        let base_paths = if self.assets.base_paths.is_empty() {
            vec![source_root.clone()]
        } else {
            resolve_all(&source_root, &self.assets.base_paths)
        };
        let ignore = resolve_all(&source_root, &self.assets.ignore);

        Ok(AssetOptions {
            base_paths,
            ignore,
            default_document: self.assets.default_document.clone(),
            idle_timeout: Duration::from_millis(self.assets.idle_timeout_ms),
            preload: self.assets.preload,
            source_root,
        })
    }
}

fn parse_addr(host: &str, port: u16) -> Result<SocketAddr> {
    let raw = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    };
    raw.parse().map_err(|_| DevServeError::Address(raw))
}

fn resolve_all(root: &Path, entries: &[String]) -> Vec<PathBuf> {
    entries
        .iter()
        .map(|entry| {
            let joined = root.join(entry);
            joined.canonicalize().unwrap_or(joined)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn load_toml(dir: &Path, body: &str) -> Config {
        let file = dir.join("devserve.toml");
        fs::write(&file, body).unwrap();
        let stem = dir.join("devserve");
        Config::load_from(stem.to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(dir.path().join("absent").to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 443);
        assert_eq!(cfg.server.redirect_from, Some(80));
        assert_eq!(cfg.shutdown_timeout(), Duration::from_secs(5));
        assert!(cfg.tls.enabled);
        assert_eq!(cfg.assets.default_document, "index.html");
        assert_eq!(cfg.assets.idle_timeout_ms, 10_000);
        assert_eq!(cfg.assets.ignore, vec!["dev".to_string()]);
        assert!(cfg.assets.base_paths.is_empty());
        assert_eq!(cfg.logging.access_log_format, "combined");
    }

    #[test]
    fn test_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_toml(
            dir.path(),
            r#"
[server]
port = 8443
redirect_from = 8080

[tls]
enabled = false

[assets]
source_root = "site"
ignore = ["node_modules", "dev"]
idle_timeout_ms = 2500
"#,
        );
        assert_eq!(cfg.server.port, 8443);
        assert!(!cfg.tls.enabled);
        assert_eq!(cfg.assets.source_root, "site");
        assert_eq!(cfg.assets.ignore, vec!["node_modules", "dev"]);
        assert_eq!(cfg.assets.idle_timeout_ms, 2500);
        // redirect only runs in front of TLS
        assert_eq!(cfg.get_redirect_socket_addr().unwrap(), None);
    }

    #[test]
    fn test_socket_addrs() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::load_from(dir.path().join("absent").to_str().unwrap()).unwrap();
        cfg.server.port = 8443;
        cfg.server.redirect_from = Some(8080);
        assert_eq!(cfg.get_socket_addr().unwrap().to_string(), "127.0.0.1:8443");
        assert_eq!(
            cfg.get_redirect_socket_addr().unwrap().unwrap().to_string(),
            "127.0.0.1:8080"
        );
        cfg.server.host = "::1".to_string();
        assert_eq!(cfg.get_socket_addr().unwrap().to_string(), "[::1]:8443");
        cfg.server.host = "not a host".to_string();
        assert!(matches!(cfg.get_socket_addr(), Err(DevServeError::Address(_))));
    }

    #[test]
    fn test_asset_options_resolve_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("site");
        fs::create_dir_all(root.join("dev")).unwrap();
        fs::create_dir_all(root.join("public")).unwrap();

        let mut cfg = Config::load_from(dir.path().join("absent").to_str().unwrap()).unwrap();
        cfg.assets.source_root = root.to_str().unwrap().to_string();
        cfg.assets.base_paths = vec!["public".to_string(), ".".to_string()];

        let options = cfg.asset_options().unwrap();
        let canonical = root.canonicalize().unwrap();
        assert_eq!(options.source_root, canonical);
        assert_eq!(
            options.base_paths,
            vec![canonical.join("public"), canonical.clone()]
        );
        assert_eq!(options.ignore, vec![canonical.join("dev")]);
        assert_eq!(options.idle_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_asset_options_default_base_path_is_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::load_from(dir.path().join("absent").to_str().unwrap()).unwrap();
        cfg.assets.source_root = dir.path().to_str().unwrap().to_string();
        let options = cfg.asset_options().unwrap();
        assert_eq!(options.base_paths, vec![dir.path().canonicalize().unwrap()]);
    }

    #[test]
    fn test_missing_source_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::load_from(dir.path().join("absent").to_str().unwrap()).unwrap();
        cfg.assets.source_root = dir.path().join("gone").to_str().unwrap().to_string();
        assert!(matches!(
            cfg.asset_options(),
            Err(DevServeError::RootUnreadable { .. })
        ));
    }
}
