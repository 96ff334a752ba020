//! Request dispatch module
//!
//! Entry point for HTTP request processing: method validation, request path
//! normalization, asset resolution and access logging.

use crate::asset::Payload;
use crate::config::AppState;
use crate::http::{self, ResponseBody};
use crate::logger::{self, AccessLogEntry};
use hyper::{Method, Request, Response};
use percent_encoding::percent_decode_str;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
///
/// Generic over the request body since only the head is ever inspected.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<ResponseBody>, Infallible> {
    let started = Instant::now();
    let method = req.method();

    let (response, source) = match *method {
        Method::GET | Method::HEAD => {
            serve_asset(req.uri().path(), &state, *method == Method::HEAD).await
        }
        Method::OPTIONS => (http::build_options_response(), "-"),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            (http::build_405_response(), "-")
        }
    };

    if let Some(format) = state.access_log {
        let mut entry = AccessLogEntry::new(
            remote_addr.ip().to_string(),
            method.to_string(),
            req.uri().path().to_string(),
        );
        entry.query = req.uri().query().map(ToString::to_string);
        entry.http_version = version_label(req.version()).to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        entry.source = source;
        entry.referer = header_string(&req, "referer");
        entry.user_agent = header_string(&req, "user-agent");
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, format);
    }

    Ok(response)
}

/// Map a URI path to the resolver's request path
///
/// Strips leading slashes and percent-decodes. Returns `None` for paths that
/// are not valid UTF-8 once decoded, contain NUL, or contain a `..` segment.
pub fn request_path(uri_path: &str) -> Option<String> {
    let decoded = percent_decode_str(uri_path).decode_utf8().ok()?;
    let trimmed = decoded.trim_start_matches(['/', '\\']);
    if trimmed.contains('\0') || trimmed.split(['/', '\\']).any(|segment| segment == "..") {
        return None;
    }
    Some(trimmed.to_string())
}

async fn serve_asset(
    uri_path: &str,
    state: &AppState,
    is_head: bool,
) -> (Response<ResponseBody>, &'static str) {
    let Some(path) = request_path(uri_path) else {
        logger::log_warning(&format!("Rejected request path: {uri_path}"));
        return (http::build_404_response(), "-");
    };

    let resolved = if is_head {
        state.assets.stat_or_default(&path).await
    } else {
        state.assets.resolve_or_default(&path).await
    };
    let Some(record) = resolved else {
        return (http::build_404_response(), "-");
    };

    let source = record.source();
    if let Payload::Stream(stream) = &record.payload {
        if logger::debug_enabled() {
            let mut watch = stream.watch();
            tokio::spawn(async move {
                if let Some(reason) = watch.closed().await {
                    logger::log_debug(&format!("Stream for '{path}' closed: {reason:?}"));
                }
            });
        }
    }

    (http::build_asset_response(record, is_head), source)
}

fn header_string<B>(req: &Request<B>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

const fn version_label(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        hyper::Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
