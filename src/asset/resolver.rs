//! Asset resolver
//!
//! Answers a request path from the cache when possible, otherwise opens the
//! file under the first base path that has it and hands back a reaped stream.

use crate::asset::cache::Cache;
use crate::asset::reaper::AssetStream;
use crate::asset::record::AssetRecord;
use crate::logger;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Resolve `request_path` against the cache and then each base path in order
///
/// The path is used as given; decoding and traversal checks belong to the
/// caller. The ignore-list plays no part here: a file that was kept out of
/// the cache is still served fresh from disk.
pub async fn resolve(
    base_paths: &[PathBuf],
    request_path: &str,
    cache: &Cache,
    idle_timeout: Duration,
) -> Option<AssetRecord> {
    lookup(base_paths, request_path, cache, Some(idle_timeout)).await
}

/// Like `resolve`, but a cache miss is only stat'ed, never opened
pub async fn stat(base_paths: &[PathBuf], request_path: &str, cache: &Cache) -> Option<AssetRecord> {
    lookup(base_paths, request_path, cache, None).await
}

/// `idle_timeout` of `None` means headers only
async fn lookup(
    base_paths: &[PathBuf],
    request_path: &str,
    cache: &Cache,
    idle_timeout: Option<Duration>,
) -> Option<AssetRecord> {
    if base_paths.is_empty() {
        return None;
    }
    if let Some(asset) = cache.get(request_path) {
        return Some(AssetRecord::from(asset));
    }

    for base_path in base_paths {
        let candidate = base_path.join(request_path);
        match open_fresh(&candidate, idle_timeout).await {
            Ok(Some(record)) => return Some(record),
            Ok(None) => {}
            Err(e) => logger::log_debug(&format!(
                "Read failure on '{}': {e}",
                candidate.display()
            )),
        }
    }
    None
}

/// Stat and open one candidate. `Ok(None)` means "not a servable file here".
async fn open_fresh(
    path: &Path,
    idle_timeout: Option<Duration>,
) -> io::Result<Option<AssetRecord>> {
    let metadata = match fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    if !metadata.is_file() {
        return Ok(None);
    }

    let Some(idle_timeout) = idle_timeout else {
        return Ok(Some(AssetRecord::metadata_only(path, &metadata)));
    };
    let file = fs::File::open(path).await?;
    let stream = AssetStream::spawn(file, idle_timeout);
    Ok(Some(AssetRecord::streamed(path, &metadata, stream)))
}
