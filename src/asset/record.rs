//! Asset record types
//!
//! An `AssetRecord` carries at most one payload: the shared buffer of a
//! cached file, or a reaped stream over a freshly opened one. Records built
//! for `HEAD` on a cache miss carry metadata only.

use crate::asset::reaper::AssetStream;
use crate::http::date::format_http_date;
use crate::mime;
use hyper::body::Bytes;
use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;

/// A file preloaded into the cache
#[derive(Debug, Clone)]
pub struct CachedAsset {
    pub last_modified: String,
    pub content_type: &'static str,
    pub size: u64,
    pub buffer: Bytes,
}

impl CachedAsset {
    pub fn new(path: &Path, metadata: &Metadata, buffer: Bytes) -> Self {
        Self {
            last_modified: last_modified(metadata),
            content_type: mime::type_for_path(path),
            size: buffer.len() as u64,
            buffer,
        }
    }
}

/// Response payload
pub enum Payload {
    /// Immutable bytes shared with the cache
    Buffer(Bytes),
    /// Lazily read file guarded by the idle-stream reaper
    Stream(AssetStream),
    /// Nothing was opened; headers only
    Omitted,
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buffer(bytes) => f.debug_tuple("Buffer").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream"),
            Self::Omitted => f.write_str("Omitted"),
        }
    }
}

/// A resolved, servable file
#[derive(Debug)]
pub struct AssetRecord {
    /// HTTP-date of the file modification time
    pub last_modified: String,
    pub content_type: &'static str,
    pub size: u64,
    pub payload: Payload,
}

impl AssetRecord {
    /// Record for a freshly opened file
    pub fn streamed(path: &Path, metadata: &Metadata, stream: AssetStream) -> Self {
        Self {
            last_modified: last_modified(metadata),
            content_type: mime::type_for_path(path),
            size: metadata.len(),
            payload: Payload::Stream(stream),
        }
    }

    /// Record for a file that was stat'ed but not opened
    pub fn metadata_only(path: &Path, metadata: &Metadata) -> Self {
        Self {
            last_modified: last_modified(metadata),
            content_type: mime::type_for_path(path),
            size: metadata.len(),
            payload: Payload::Omitted,
        }
    }

    pub const fn is_cached(&self) -> bool {
        matches!(self.payload, Payload::Buffer(_))
    }

    /// Short label used in access logs
    pub const fn source(&self) -> &'static str {
        match self.payload {
            Payload::Buffer(_) => "cache",
            Payload::Stream(_) | Payload::Omitted => "disk",
        }
    }
}

impl From<&CachedAsset> for AssetRecord {
    fn from(asset: &CachedAsset) -> Self {
        Self {
            last_modified: asset.last_modified.clone(),
            content_type: asset.content_type,
            size: asset.size,
            payload: Payload::Buffer(asset.buffer.clone()),
        }
    }
}

fn last_modified(metadata: &Metadata) -> String {
    format_http_date(metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH))
}
