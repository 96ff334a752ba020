//! Local development HTTP(S) server.
//!
//! Serves a document root with a preloaded in-memory cache, falls back to
//! fresh disk reads guarded by an idle timeout, and redirects plain HTTP to
//! HTTPS.

pub mod asset;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod mime;
pub mod server;
pub mod tls;

use std::path::Path;
use std::sync::Arc;

use crate::asset::Assets;
use crate::config::{AppState, Config};
use crate::server::{Server, ShutdownOutcome};

/// Build the asset engine, bind the listeners and serve until a signal
/// triggers shutdown.
pub async fn run(cfg: Config) -> error::Result<ShutdownOutcome> {
    let options = cfg.asset_options()?;
    let assets = Assets::load(&options).await?;
    let state = Arc::new(AppState::new(&cfg, assets));

    let acceptor = if cfg.tls.enabled {
        Some(tls::load_acceptor(
            Path::new(&cfg.tls.cert_file),
            Path::new(&cfg.tls.key_file),
        )?)
    } else {
        None
    };

    let server = Server::bind(
        state,
        acceptor,
        cfg.get_socket_addr()?,
        cfg.get_redirect_socket_addr()?,
    )?;

    logger::log_server_start(
        &server.local_addr()?,
        server.scheme(),
        server.redirect_addr().as_ref(),
        &options.source_root,
    );
    server::signal::start_signal_handler(server.shutdown_handle(), cfg.shutdown_timeout());

    server.run().await
}
