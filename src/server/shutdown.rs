// Shutdown coordination
// Listeners stop accepting, live connections finish their current response,
// and the wait is bounded by a deadline after which the caller moves on.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::logger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every connection finished before the deadline
    Graceful,
    /// The deadline passed with connections still open
    TimedOut { remaining: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Draining,
    Finished(ShutdownOutcome),
}

struct Inner {
    phase: watch::Sender<Phase>,
    /// Each live connection holds a receiver; all dropped means drained
    connections: watch::Sender<()>,
    active: AtomicUsize,
}

/// Cloneable handle shared by listeners, connections and the signal task
#[derive(Clone)]
pub struct ShutdownHandle {
    inner: Arc<Inner>,
}

/// Keeps a connection counted until dropped
pub struct ConnectionGuard {
    inner: Arc<Inner>,
    _alive: watch::Receiver<()>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.inner.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(Phase::Running);
        let (connections, _) = watch::channel(());
        Self {
            inner: Arc::new(Inner {
                phase,
                connections,
                active: AtomicUsize::new(0),
            }),
        }
    }

    /// Register a live connection
    pub fn track(&self) -> ConnectionGuard {
        self.inner.active.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            inner: Arc::clone(&self.inner),
            _alive: self.inner.connections.subscribe(),
        }
    }

    pub fn active_connections(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.inner.phase.borrow() != Phase::Running
    }

    /// Resolves once shutdown has begun
    pub async fn draining(&self) {
        let mut rx = self.inner.phase.subscribe();
        let _ = rx.wait_for(|p| *p != Phase::Running).await;
    }

    /// Stop accepting and wait for in-flight connections, at most `deadline`
    ///
    /// Returns `None` if a shutdown was already started by someone else.
    pub async fn shutdown(&self, deadline: Duration) -> Option<ShutdownOutcome> {
        let started = self.inner.phase.send_if_modified(|p| {
            if *p == Phase::Running {
                *p = Phase::Draining;
                true
            } else {
                false
            }
        });
        if !started {
            return None;
        }

        logger::log_shutdown_started(self.active_connections());
        let outcome = match tokio::time::timeout(deadline, self.inner.connections.closed()).await {
            Ok(()) => ShutdownOutcome::Graceful,
            Err(_) => ShutdownOutcome::TimedOut {
                remaining: self.active_connections(),
            },
        };
        match outcome {
            ShutdownOutcome::Graceful => logger::log_shutdown_finished(true, 0),
            ShutdownOutcome::TimedOut { remaining } => {
                logger::log_shutdown_finished(false, remaining);
            }
        }

        self.inner.phase.send_replace(Phase::Finished(outcome));
        Some(outcome)
    }

    /// Resolves with the outcome once a shutdown has completed
    pub async fn finished(&self) -> ShutdownOutcome {
        let mut rx = self.inner.phase.subscribe();
        let phase = match rx.wait_for(|p| matches!(p, Phase::Finished(_))).await {
            Ok(phase) => *phase,
            Err(_) => Phase::Finished(ShutdownOutcome::Graceful),
        };
        match phase {
            Phase::Finished(outcome) => outcome,
            _ => ShutdownOutcome::Graceful,
        }
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_idle_shutdown_is_graceful() {
        let handle = ShutdownHandle::new();
        assert!(!handle.is_shutting_down());
        let outcome = handle.shutdown(Duration::from_secs(5)).await;
        assert_eq!(outcome, Some(ShutdownOutcome::Graceful));
        assert!(handle.is_shutting_down());
        assert_eq!(handle.finished().await, ShutdownOutcome::Graceful);
    }

    #[tokio::test]
    async fn test_waits_for_connections() {
        let handle = ShutdownHandle::new();
        let guard = handle.track();
        assert_eq!(handle.active_connections(), 1);

        let connection = {
            let handle = handle.clone();
            tokio::spawn(async move {
                handle.draining().await;
                tokio::time::sleep(Duration::from_millis(50)).await;
                drop(guard);
            })
        };

        let outcome = handle.shutdown(Duration::from_secs(5)).await;
        assert_eq!(outcome, Some(ShutdownOutcome::Graceful));
        assert_eq!(handle.active_connections(), 0);
        connection.await.unwrap();
    }

    #[tokio::test]
    async fn test_deadline_forces_shutdown() {
        let handle = ShutdownHandle::new();
        let _stuck = handle.track();
        let started = std::time::Instant::now();
        let outcome = handle.shutdown(Duration::from_millis(100)).await;
        assert_eq!(outcome, Some(ShutdownOutcome::TimedOut { remaining: 1 }));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(
            handle.finished().await,
            ShutdownOutcome::TimedOut { remaining: 1 }
        );
    }

    #[tokio::test]
    async fn test_second_shutdown_is_ignored() {
        let handle = ShutdownHandle::new();
        let _stuck = handle.track();
        let (first, second) = tokio::join!(
            handle.shutdown(Duration::from_millis(100)),
            handle.shutdown(Duration::from_millis(100)),
        );
        assert!(first.is_some());
        assert_eq!(second, None);
    }
}
