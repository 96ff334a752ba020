//! Asset resolution engine
//!
//! - `cache`: one-shot preload of the document root
//! - `resolver`: cache lookup with fresh-read fallback across base paths
//! - `reaper`: idle timeout for freshly opened file handles
//! - `record`: the records handed to the server shell

pub mod cache;
pub mod reaper;
pub mod record;
pub mod resolver;

pub use cache::Cache;
pub use reaper::{AssetStream, CloseReason, ReaperState, ReaperWatch};
pub use record::{AssetRecord, CachedAsset, Payload};

use crate::error::Result;
use crate::logger;
use std::path::PathBuf;
use std::time::Duration;

/// Resolved asset settings with absolute paths
#[derive(Debug, Clone)]
pub struct AssetOptions {
    pub source_root: PathBuf,
    pub base_paths: Vec<PathBuf>,
    pub ignore: Vec<PathBuf>,
    pub default_document: String,
    pub idle_timeout: Duration,
    pub preload: bool,
}

impl AssetOptions {
    /// Options serving `source_root` alone with default settings
    pub fn for_root(source_root: impl Into<PathBuf>) -> Self {
        let source_root = source_root.into();
        Self {
            base_paths: vec![source_root.clone()],
            source_root,
            ignore: Vec::new(),
            default_document: "index.html".to_string(),
            idle_timeout: reaper::DEFAULT_IDLE_TIMEOUT,
            preload: true,
        }
    }
}

/// The cache together with everything needed to resolve against it
#[derive(Debug)]
pub struct Assets {
    cache: Cache,
    base_paths: Vec<PathBuf>,
    default_document: String,
    idle_timeout: Duration,
}

impl Assets {
    /// Build the cache (unless preloading is disabled) and keep the options
    pub async fn load(options: &AssetOptions) -> Result<Self> {
        let cache = if options.preload {
            cache::build(&options.source_root, &options.ignore).await?
        } else {
            logger::log_info("Preloading disabled, every file is read from disk");
            Cache::empty()
        };
        Ok(Self {
            cache,
            base_paths: options.base_paths.clone(),
            default_document: options.default_document.clone(),
            idle_timeout: options.idle_timeout,
        })
    }

    pub const fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Resolve an exact request path
    pub async fn resolve(&self, request_path: &str) -> Option<AssetRecord> {
        resolver::resolve(&self.base_paths, request_path, &self.cache, self.idle_timeout).await
    }

    /// Resolve a request path, falling back to the default document
    pub async fn resolve_or_default(&self, request_path: &str) -> Option<AssetRecord> {
        if let Some(record) = self.resolve(request_path).await {
            return Some(record);
        }
        self.resolve(&self.default_document).await
    }

    /// Same fallback as `resolve_or_default`, without opening files
    pub async fn stat_or_default(&self, request_path: &str) -> Option<AssetRecord> {
        if let Some(record) = resolver::stat(&self.base_paths, request_path, &self.cache).await {
            return Some(record);
        }
        resolver::stat(&self.base_paths, &self.default_document, &self.cache).await
    }
}
