// Signal handling module
//
// SIGINT (Ctrl+C) and SIGTERM start a graceful shutdown bounded by the
// configured deadline. Signals arriving while shutdown is in progress are
// logged and otherwise ignored.

use std::time::Duration;

use super::shutdown::ShutdownHandle;
use crate::logger;

/// Start the signal listener task (Unix)
#[cfg(unix)]
pub fn start_signal_handler(shutdown: ShutdownHandle, deadline: Duration) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    logger::log_error(&format!("Failed to register signal handlers: {e}"));
                    return;
                }
            };

        loop {
            let name = tokio::select! {
                Some(()) = sigterm.recv() => "SIGTERM",
                Some(()) = sigint.recv() => "SIGINT",
                else => break,
            };
            begin_shutdown(&shutdown, name, deadline);
        }
    });
}

/// Non-Unix fallback: only Ctrl+C
#[cfg(not(unix))]
pub fn start_signal_handler(shutdown: ShutdownHandle, deadline: Duration) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            begin_shutdown(&shutdown, "Ctrl+C", deadline);
        }
    });
}

fn begin_shutdown(shutdown: &ShutdownHandle, name: &str, deadline: Duration) {
    if shutdown.is_shutting_down() {
        logger::log_info(&format!("[Signal] {name} received, already shutting down"));
        return;
    }
    logger::log_info(&format!("[Signal] {name} received, stopping servers"));
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        shutdown.shutdown(deadline).await;
    });
}
