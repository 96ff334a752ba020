//! Startup cache builder
//!
//! Walks the document root once and preloads every file that is not under an
//! ignored directory. Keys are paths relative to the root, joined with `/`
//! on every platform.

use crate::asset::record::CachedAsset;
use crate::error::{DevServeError, Result};
use crate::logger;
use hyper::body::Bytes;
use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;
use tokio::fs;

/// Preloaded assets, read-only once built
#[derive(Debug, Default, Clone)]
pub struct Cache {
    entries: HashMap<String, CachedAsset>,
}

impl Cache {
    /// A cache with no entries; every request falls through to disk
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, relative_path: &str) -> Option<&CachedAsset> {
        self.entries.get(relative_path)
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.entries.contains_key(relative_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total bytes held in memory
    pub fn total_bytes(&self) -> u64 {
        self.entries.values().map(|a| a.size).sum()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Whether `path` is one of the ignored directories or lies beneath one
pub fn is_ignored(path: &Path, ignore: &[PathBuf]) -> bool {
    ignore.iter().any(|dir| path.starts_with(dir))
}

/// Cache key for `path`: relative to `root`, `/`-separated
///
/// Returns `None` for paths outside the root or with non UTF-8 components.
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Build the cache for `source_root`
///
/// Failing to list the root itself is fatal. Anything that goes wrong below
/// it (unreadable subdirectory, file removed mid-walk, permission denied) is
/// logged and skipped.
pub async fn build(source_root: &Path, ignore: &[PathBuf]) -> Result<Cache> {
    let started = Instant::now();
    let root_listing = fs::read_dir(source_root)
        .await
        .map_err(|source| DevServeError::RootUnreadable {
            path: source_root.to_path_buf(),
            source,
        })?;

    let mut entries = HashMap::new();
    let mut pending = vec![root_listing];

    while let Some(mut listing) = pending.pop() {
        loop {
            let entry = match listing.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    logger::log_warning(&format!("Cache build: listing failed: {e}"));
                    break;
                }
            };
            let path = entry.path();
            if is_ignored(&path, ignore) {
                continue;
            }

            let file_type = match entry.file_type().await {
                Ok(t) => t,
                Err(e) => {
                    logger::log_warning(&format!(
                        "Cache build: skipping '{}': {e}",
                        path.display()
                    ));
                    continue;
                }
            };

            // symlinked directories are not followed
            if file_type.is_dir() {
                match fs::read_dir(&path).await {
                    Ok(sub) => pending.push(sub),
                    Err(e) => logger::log_warning(&format!(
                        "Cache build: skipping directory '{}': {e}",
                        path.display()
                    )),
                }
                continue;
            }

            let Some(key) = relative_key(source_root, &path) else {
                logger::log_warning(&format!(
                    "Cache build: skipping '{}': name is not valid UTF-8",
                    path.display()
                ));
                continue;
            };

            match load_file(&path).await {
                Ok(Some(asset)) => {
                    entries.insert(key, asset);
                }
                Ok(None) => {}
                Err(e) => logger::log_warning(&format!(
                    "Cache build: skipping '{}': {e}",
                    path.display()
                )),
            }
        }
    }

    let cache = Cache { entries };
    logger::log_cache_built(cache.len(), cache.total_bytes(), started.elapsed());
    Ok(cache)
}

/// Read one regular file; `None` for anything else (sockets, dangling links)
async fn load_file(path: &Path) -> io::Result<Option<CachedAsset>> {
    let metadata = match fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    if !metadata.is_file() {
        return Ok(None);
    }
    let data = fs::read(path).await?;
    Ok(Some(CachedAsset::new(path, &metadata, Bytes::from(data))))
}
