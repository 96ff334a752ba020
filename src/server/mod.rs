// Server module entry point
// Binds the listeners and runs the accept loops until shutdown completes

pub mod connection;
pub mod listener;
pub mod redirect;
pub mod shutdown;
pub mod signal;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::LocalSet;
use tokio_rustls::TlsAcceptor;

use crate::config::AppState;
use crate::error::{DevServeError, Result};
use crate::logger;

pub use connection::Role;
pub use listener::create_listener;
pub use shutdown::{ShutdownHandle, ShutdownOutcome};

/// Bound listeners plus everything needed to serve them
pub struct Server {
    state: Arc<AppState>,
    listener: TcpListener,
    tls: Option<TlsAcceptor>,
    redirect: Option<TcpListener>,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Bind the main listener and, when given, the redirect listener.
    ///
    /// The redirect listener only makes sense in front of TLS and is not
    /// bound without an acceptor.
    pub fn bind(
        state: Arc<AppState>,
        tls: Option<TlsAcceptor>,
        addr: SocketAddr,
        redirect_addr: Option<SocketAddr>,
    ) -> Result<Self> {
        let listener = bind(addr)?;
        let redirect = match redirect_addr {
            Some(addr) if tls.is_some() => Some(bind(addr)?),
            _ => None,
        };

        Ok(Self {
            state,
            listener,
            tls,
            redirect,
            shutdown: ShutdownHandle::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn redirect_addr(&self) -> Option<SocketAddr> {
        self.redirect.as_ref().and_then(|l| l.local_addr().ok())
    }

    pub const fn scheme(&self) -> &'static str {
        if self.tls.is_some() {
            "https"
        } else {
            "http"
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Serve until a shutdown triggered through the handle has finished
    pub async fn run(self) -> Result<ShutdownOutcome> {
        // Connections are served with spawn_local
        let local = LocalSet::new();
        local.run_until(self.serve()).await
    }

    async fn serve(self) -> Result<ShutdownOutcome> {
        let https_port = self.local_addr()?.port();

        if let Some(redirect) = self.redirect {
            tokio::task::spawn_local(accept_loop(
                redirect,
                Arc::clone(&self.state),
                Role::Redirect { https_port },
                None,
                self.shutdown.clone(),
            ));
        }

        accept_loop(
            self.listener,
            self.state,
            Role::Assets,
            self.tls,
            self.shutdown.clone(),
        )
        .await;

        Ok(self.shutdown.finished().await)
    }
}

fn bind(addr: SocketAddr) -> Result<TcpListener> {
    create_listener(addr).map_err(|source| DevServeError::Bind { addr, source })
}

/// Accept until shutdown begins, then drop the listener
async fn accept_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    role: Role,
    tls: Option<TlsAcceptor>,
    shutdown: ShutdownHandle,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => connection::accept_connection(
                    stream,
                    peer_addr,
                    &state,
                    role,
                    tls.as_ref(),
                    &shutdown,
                ),
                Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
            },
            () = shutdown.draining() => break,
        }
    }
}
