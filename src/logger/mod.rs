//! Logger module
//!
//! Logging utilities for the dev server:
//! - Server lifecycle logging
//! - Access logging in several formats
//! - Leveled error, warning, info and debug output
//! - Optional file targets

mod format;
pub mod writer;

pub use format::{AccessLogEntry, AccessLogFormat};
pub use writer::Level;

use crate::config::LoggingConfig;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &LoggingConfig) -> std::io::Result<()> {
    writer::init(
        Level::parse(&config.level),
        config.access_log_file.as_deref(),
        config.error_log_file.as_deref(),
    )
}

pub fn log_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

pub fn debug_enabled() -> bool {
    writer::get().is_some_and(|w| w.enabled(Level::Debug))
}

/// Debug lines are dropped until the writer is initialized at debug level
pub fn log_debug(message: &str) {
    if let Some(w) = writer::get() {
        w.write_debug(&format!("[DEBUG] {message}"));
    }
}

pub fn log_warning(message: &str) {
    let line = format!("[WARN] {message}");
    match writer::get() {
        Some(w) => w.write_warning(&line),
        None => eprintln!("{line}"),
    }
}

pub fn log_error(message: &str) {
    let line = format!("[ERROR] {message}");
    match writer::get() {
        Some(w) => w.write_error(&line),
        None => eprintln!("{line}"),
    }
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: AccessLogFormat) {
    let line = entry.format(format);
    match writer::get() {
        Some(w) => w.write_access(&line),
        None => println!("{line}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, scheme: &str, redirect: Option<&SocketAddr>, root: &Path) {
    log_info("======================================");
    log_info("Dev server started");
    log_info(&format!("Serving: {}", root.display()));
    log_info(&format!("Open server at {scheme}://{addr}"));
    if let Some(redirect) = redirect {
        log_info(&format!("Open redirect at http://{redirect}"));
    }
    log_info("Press CTRL+C to stop servers");
    log_info("======================================");
}

pub fn log_cache_built(entries: usize, bytes: u64, elapsed: Duration) {
    log_info(&format!(
        "[Cache] Preloaded {entries} files ({bytes} bytes) in {} ms",
        elapsed.as_millis()
    ));
}

pub fn log_connection_error(err: &impl std::fmt::Display) {
    log_debug(&format!("Connection closed with error: {err}"));
}

pub fn log_shutdown_started(active_connections: usize) {
    log_info(&format!(
        "[Shutdown] Closing servers, {active_connections} connection(s) in flight..."
    ));
}

pub fn log_shutdown_finished(graceful: bool, remaining: usize) {
    if graceful {
        log_info("[Shutdown] done");
    } else {
        log_warning(&format!(
            "[Shutdown] Timed out, dropping {remaining} connection(s)"
        ));
    }
}
