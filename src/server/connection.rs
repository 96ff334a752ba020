// Connection handling module
// Serves a single accepted TCP connection, optionally behind TLS

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsAcceptor;

use super::redirect;
use super::shutdown::ShutdownHandle;
use crate::config::AppState;
use crate::handler;
use crate::logger;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// What a listener answers with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Resolve and serve assets
    Assets,
    /// Redirect everything to the HTTPS listener on `https_port`
    Redirect { https_port: u16 },
}

/// Accept a connection and serve it in a local task.
///
/// The connection is tracked by `shutdown` from this point on, including
/// the TLS handshake.
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    role: Role,
    tls: Option<&TlsAcceptor>,
    shutdown: &ShutdownHandle,
) {
    let guard = shutdown.track();
    let state = Arc::clone(state);
    let tls = tls.cloned();
    let shutdown = shutdown.clone();

    tokio::task::spawn_local(async move {
        let _guard = guard;
        match tls {
            Some(acceptor) => {
                match tokio::time::timeout(HANDSHAKE_TIMEOUT, acceptor.accept(stream)).await {
                    Ok(Ok(stream)) => {
                        serve_connection(stream, peer_addr, state, role, &shutdown).await;
                    }
                    Ok(Err(err)) => {
                        logger::log_debug(&format!("TLS handshake with {peer_addr} failed: {err}"));
                    }
                    Err(_) => {
                        logger::log_debug(&format!("TLS handshake with {peer_addr} timed out"));
                    }
                }
            }
            None => serve_connection(stream, peer_addr, state, role, &shutdown).await,
        }
    });
}

/// Drive HTTP/1.1 on an established stream until it closes.
///
/// Once shutdown begins the connection finishes its in-flight response and
/// then closes instead of waiting for the next keep-alive request.
async fn serve_connection<I>(
    io: I,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    role: Role,
    shutdown: &ShutdownHandle,
) where
    I: AsyncRead + AsyncWrite + Unpin + 'static,
{
    let read_timeout = Duration::from_secs(state.config.server.read_timeout);

    let mut builder = http1::Builder::new();
    builder.keep_alive(true);
    if read_timeout > Duration::ZERO {
        builder
            .timer(TokioTimer::new())
            .header_read_timeout(read_timeout);
    }

    let conn = builder.serve_connection(
        TokioIo::new(io),
        service_fn(move |req| {
            let state = Arc::clone(&state);
            async move {
                match role {
                    Role::Assets => handler::handle_request(req, state, peer_addr).await,
                    Role::Redirect { https_port } => {
                        Ok(redirect::handle_redirect(&req, https_port))
                    }
                }
            }
        }),
    );
    let mut conn = std::pin::pin!(conn);

    let mut draining = false;
    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(err) = result {
                    logger::log_connection_error(&err);
                }
                break;
            }
            () = shutdown.draining(), if !draining => {
                draining = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    }
}
