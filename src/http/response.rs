//! HTTP response building module
//!
//! Builders for each status the dev server emits. Bodies are boxed so a
//! cached buffer and a reaped file stream share one response type.

use crate::asset::{AssetRecord, Payload};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;
use hyper::Response;
use std::io;

pub type ResponseBody = BoxBody<Bytes, io::Error>;

/// Browsers must always revalidate against the dev server
pub const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

pub fn full_body(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into()).map_err(|never| match never {}).boxed()
}

pub fn empty_body() -> ResponseBody {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed()
}

/// Build 200 response for a resolved asset
///
/// For HEAD the payload is dropped. HEAD requests normally arrive with a
/// metadata-only record, so no file is opened for them.
pub fn build_asset_response(record: AssetRecord, is_head: bool) -> Response<ResponseBody> {
    let body = match record.payload {
        _ if is_head => empty_body(),
        Payload::Buffer(bytes) => full_body(bytes),
        Payload::Omitted => empty_body(),
        Payload::Stream(stream) => stream.boxed(),
    };

    Response::builder()
        .status(200)
        .header("Cache-Control", NO_CACHE)
        .header("Last-Modified", record.last_modified)
        .header("Content-Length", record.size)
        .header("Content-Type", record.content_type)
        .body(body)
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            Response::new(empty_body())
        })
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<ResponseBody> {
    Response::builder()
        .status(404)
        .header("Content-Type", "text/plain")
        .header("Cache-Control", NO_CACHE)
        .body(full_body("404 Not Found"))
        .unwrap_or_else(|e| {
            log_build_error("404", &e);
            Response::new(full_body("404 Not Found"))
        })
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<ResponseBody> {
    Response::builder()
        .status(405)
        .header("Content-Type", "text/plain")
        .header("Allow", "GET, HEAD, OPTIONS")
        .body(full_body("405 Method Not Allowed"))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(full_body("405 Method Not Allowed"))
        })
}

/// Build OPTIONS response
pub fn build_options_response() -> Response<ResponseBody> {
    Response::builder()
        .status(204)
        .header("Allow", "GET, HEAD, OPTIONS")
        .body(empty_body())
        .unwrap_or_else(|e| {
            log_build_error("OPTIONS", &e);
            Response::new(empty_body())
        })
}

/// Build 302 redirect response with an empty body
pub fn build_redirect_response(location: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(302)
        .header("Location", location)
        .body(empty_body())
        .unwrap_or_else(|e| {
            log_build_error("302", &e);
            Response::new(empty_body())
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
