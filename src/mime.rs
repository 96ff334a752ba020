//! MIME registry
//!
//! A static two-way table between file extensions and content types,
//! backed by the `mime_guess` database for anything the table does not list.
//! Registration order is significant: the first content type listed for an
//! extension is the one served, and `extensions_for_type` returns extensions
//! in the order they appear in their row.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

/// Content type served when an extension is unknown
pub const FALLBACK_TYPE: &str = "application/octet-stream";

/// Registration table: content type followed by its extensions
static REGISTRY: &[(&str, &[&str])] = &[
    // Text
    ("text/html", &["html", "htm", "shtml"]),
    ("text/css", &["css"]),
    ("text/javascript", &["js", "mjs"]),
    ("text/plain", &["txt", "text", "conf", "def", "list", "log", "in", "ini"]),
    ("text/markdown", &["md", "markdown"]),
    ("text/csv", &["csv"]),
    ("text/xml", &["xml"]),
    ("text/calendar", &["ics", "ifb"]),
    ("text/tab-separated-values", &["tsv"]),
    ("text/vtt", &["vtt"]),
    ("text/yaml", &["yaml", "yml"]),
    ("text/jsx", &["jsx"]),
    ("text/x-python", &["py"]),
    ("text/vcard", &["vcard"]),
    // Application
    ("application/javascript", &["js", "mjs"]),
    ("application/json", &["json", "map"]),
    ("application/manifest+json", &["webmanifest"]),
    ("application/ld+json", &["jsonld"]),
    ("application/xhtml+xml", &["xhtml", "xht"]),
    ("application/rss+xml", &["rss"]),
    ("application/atom+xml", &["atom"]),
    ("application/rtf", &["rtf"]),
    ("application/x-sh", &["sh"]),
    ("application/vnd.apple.mpegurl", &["m3u8"]),
    ("application/xml", &["xml", "xsl", "xsd", "rng"]),
    ("application/wasm", &["wasm"]),
    ("application/pdf", &["pdf"]),
    ("application/zip", &["zip"]),
    ("application/gzip", &["gz"]),
    ("application/x-tar", &["tar"]),
    ("application/x-bzip2", &["bz2", "boz"]),
    ("application/x-xz", &["xz"]),
    ("application/x-7z-compressed", &["7z"]),
    ("application/vnd.rar", &["rar"]),
    ("application/x-rar-compressed", &["rar"]),
    ("application/java-archive", &["jar", "war", "ear"]),
    ("application/epub+zip", &["epub"]),
    ("application/msword", &["doc", "dot"]),
    ("application/vnd.ms-excel", &["xls", "xlm", "xla", "xlc", "xlt", "xlw"]),
    ("application/vnd.ms-powerpoint", &["ppt", "pps", "pot"]),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        &["docx"],
    ),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        &["xlsx"],
    ),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        &["pptx"],
    ),
    ("application/vnd.oasis.opendocument.text", &["odt"]),
    ("application/vnd.oasis.opendocument.spreadsheet", &["ods"]),
    ("application/vnd.ms-fontobject", &["eot"]),
    (
        "application/octet-stream",
        &["bin", "dms", "lrf", "mar", "so", "dist", "distz", "pkg", "bpk", "dump", "elc", "deploy", "exe", "dll", "deb", "dmg", "iso", "img", "msi", "msp", "msm", "buffer"],
    ),
    // Images
    ("image/jpeg", &["jpeg", "jpg", "jpe"]),
    ("image/png", &["png"]),
    ("image/gif", &["gif"]),
    ("image/svg+xml", &["svg", "svgz"]),
    ("image/webp", &["webp"]),
    ("image/avif", &["avif"]),
    ("image/apng", &["apng"]),
    ("image/tiff", &["tif", "tiff"]),
    ("image/heic", &["heic"]),
    ("image/heif", &["heif"]),
    ("image/bmp", &["bmp"]),
    ("image/x-icon", &["ico"]),
    ("image/vnd.microsoft.icon", &["ico"]),
    // Fonts
    ("font/woff", &["woff"]),
    ("font/woff2", &["woff2"]),
    ("font/ttf", &["ttf"]),
    ("font/otf", &["otf"]),
    // Audio
    ("audio/mpeg", &["mp3", "mpga", "mp2", "mp2a", "m2a", "m3a"]),
    ("audio/ogg", &["oga", "ogg", "spx", "opus"]),
    ("audio/wav", &["wav"]),
    ("audio/x-wav", &["wav"]),
    ("audio/flac", &["flac"]),
    ("audio/mp4", &["m4a", "mp4a"]),
    ("audio/aac", &["aac"]),
    ("audio/webm", &["weba"]),
    ("audio/midi", &["mid", "midi", "kar", "rmi"]),
    // Video
    ("video/mp4", &["mp4", "mp4v", "mpg4"]),
    ("video/webm", &["webm"]),
    ("video/ogg", &["ogv"]),
    ("video/quicktime", &["qt", "mov"]),
    ("video/x-msvideo", &["avi"]),
    ("video/mp2t", &["ts", "m2t", "m2ts", "mts"]),
    ("video/mpeg", &["mpeg", "mpg", "mpe", "m1v", "m2v"]),
    ("video/x-matroska", &["mkv", "mk3d", "mks"]),
    ("video/3gpp", &["3gp", "3gpp"]),
    ("video/x-flv", &["flv"]),
];

/// Extension -> content types, in registration order
static BY_EXTENSION: LazyLock<HashMap<&'static str, Vec<&'static str>>> = LazyLock::new(|| {
    let mut index: HashMap<&'static str, Vec<&'static str>> = HashMap::new();
    for &(content_type, extensions) in REGISTRY {
        for &ext in extensions {
            let types = index.entry(ext).or_default();
            if !types.contains(&content_type) {
                types.push(content_type);
            }
        }
    }
    index
});

/// Content type -> extensions, in registration order
static BY_TYPE: LazyLock<HashMap<&'static str, Vec<&'static str>>> = LazyLock::new(|| {
    let mut index: HashMap<&'static str, Vec<&'static str>> = HashMap::new();
    for &(content_type, extensions) in REGISTRY {
        let exts = index.entry(content_type).or_default();
        for &ext in extensions {
            if !exts.contains(&ext) {
                exts.push(ext);
            }
        }
    }
    index
});

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

fn normalize_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Content type served for an extension
///
/// # Examples
/// ```
/// use devserve::mime::type_for_extension;
/// assert_eq!(type_for_extension("css"), "text/css");
/// assert_eq!(type_for_extension(".JPG"), "image/jpeg");
/// assert_eq!(type_for_extension("nope"), "application/octet-stream");
/// ```
pub fn type_for_extension(ext: &str) -> &'static str {
    let ext = normalize_extension(ext);
    BY_EXTENSION
        .get(ext.as_str())
        .and_then(|types| types.first().copied())
        .or_else(|| mime_guess::from_ext(&ext).first_raw())
        .unwrap_or(FALLBACK_TYPE)
}

/// Every content type registered for an extension
///
/// Table entries come first, then any extra ones from the database.
pub fn types_for_extension(ext: &str) -> Vec<&'static str> {
    let ext = normalize_extension(ext);
    let mut types = BY_EXTENSION.get(ext.as_str()).cloned().unwrap_or_default();
    for content_type in mime_guess::from_ext(&ext).iter_raw() {
        if !types.contains(&content_type) {
            types.push(content_type);
        }
    }
    types
}

/// Every extension registered for a content type
///
/// Parameters such as `; charset=utf-8` are ignored. Types the table lists
/// keep its extension order; others come from the database.
pub fn extensions_for_type(content_type: &str) -> Vec<&'static str> {
    let content_type = normalize_type(content_type);
    if let Some(exts) = BY_TYPE.get(content_type.as_str()) {
        return exts.clone();
    }
    mime_guess::get_mime_extensions_str(&content_type)
        .map(<[&str]>::to_vec)
        .unwrap_or_default()
}

/// Content type for a file path, based on its extension
pub fn type_for_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(FALLBACK_TYPE, type_for_extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(type_for_extension("html"), "text/html");
        assert_eq!(type_for_extension("css"), "text/css");
        assert_eq!(type_for_extension("js"), "text/javascript");
        assert_eq!(type_for_extension("json"), "application/json");
        assert_eq!(type_for_extension("png"), "image/png");
        assert_eq!(type_for_extension("jpg"), "image/jpeg");
        assert_eq!(type_for_extension("mp4"), "video/mp4");
    }

    #[test]
    fn test_extension_normalization() {
        assert_eq!(type_for_extension(".css"), "text/css");
        assert_eq!(type_for_extension("CSS"), "text/css");
        assert_eq!(type_for_extension(".Html"), "text/html");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(type_for_extension("no-such-ext"), FALLBACK_TYPE);
        assert_eq!(type_for_extension(""), FALLBACK_TYPE);
        assert_eq!(type_for_extension("."), FALLBACK_TYPE);
        assert!(types_for_extension("no-such-ext").is_empty());
    }

    #[test]
    fn test_types_for_extension() {
        assert_eq!(types_for_extension("jpg")[0], "image/jpeg");
        assert_eq!(
            types_for_extension("js")[..2],
            ["text/javascript", "application/javascript"]
        );
        assert_eq!(types_for_extension("xml")[..2], ["text/xml", "application/xml"]);
        assert_eq!(
            types_for_extension("rar")[..2],
            ["application/vnd.rar", "application/x-rar-compressed"]
        );
    }

    #[test]
    fn test_extensions_for_type() {
        assert_eq!(extensions_for_type("image/jpeg"), vec!["jpeg", "jpg", "jpe"]);
        assert_eq!(
            extensions_for_type("text/html; charset=utf-8"),
            vec!["html", "htm", "shtml"]
        );
        assert_eq!(extensions_for_type("IMAGE/PNG"), vec!["png"]);
        assert!(extensions_for_type("application/x-unknown").is_empty());
    }

    #[test]
    fn test_type_for_path() {
        assert_eq!(type_for_path(Path::new("assets/site.css")), "text/css");
        assert_eq!(type_for_path(Path::new("Makefile")), FALLBACK_TYPE);
        assert_eq!(type_for_path(Path::new("dir.d/archive.tar")), "application/x-tar");
    }

    #[test]
    fn test_every_registered_extension_resolves() {
        for &(content_type, extensions) in REGISTRY {
            for ext in extensions {
                assert!(types_for_extension(ext).contains(&content_type));
                assert!(extensions_for_type(content_type).contains(ext));
            }
        }
    }

    #[test]
    fn test_everyday_dev_assets() {
        let expected = [
            ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
            ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
            ("tif", "image/tiff"),
            ("tiff", "image/tiff"),
            ("xhtml", "application/xhtml+xml"),
            ("jsonld", "application/ld+json"),
            ("ts", "video/mp2t"),
            ("7z", "application/x-7z-compressed"),
            ("rar", "application/vnd.rar"),
            ("sh", "application/x-sh"),
            ("py", "text/x-python"),
            ("apng", "image/apng"),
            ("heic", "image/heic"),
            ("m3u8", "application/vnd.apple.mpegurl"),
            ("vtt", "text/vtt"),
            ("yaml", "text/yaml"),
            ("yml", "text/yaml"),
            ("rtf", "application/rtf"),
        ];
        for (ext, content_type) in expected {
            assert_eq!(type_for_extension(ext), content_type, "extension {ext}");
        }
        assert_eq!(extensions_for_type("image/tiff"), vec!["tif", "tiff"]);
        assert_eq!(extensions_for_type("video/mp2t"), vec!["ts", "m2t", "m2ts", "mts"]);
    }

    #[test]
    fn test_database_fallback() {
        assert_eq!(type_for_extension("wmv"), "video/x-ms-wmv");
        assert!(types_for_extension("WMV").contains(&"video/x-ms-wmv"));
        assert!(extensions_for_type("video/x-ms-wmv; codecs=x").contains(&"wmv"));
    }
}
