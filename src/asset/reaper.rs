//! Idle-stream reaper
//!
//! Every file opened on a cache miss is pumped by a dedicated task into a
//! single-slot channel. The task owns the file handle and releases it when
//! the file is exhausted, when the consumer goes away, or when a produced
//! chunk sits undelivered for longer than the idle timeout. Because the timer
//! lives in the pump task, an abandoned response still gets its handle back
//! even if nobody ever polls the body again.
//!
//! ```text
//! TimerUnset --chunk--> TimerRunning --chunk--> TimerRunning
//!     |                      |
//!     +--end/drop/error------+--end/drop/error/expiry--> Closed(reason)
//! ```

use hyper::body::{Body, Bytes, Frame};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, watch};

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

const CHUNK_SIZE: usize = 64 * 1024;

/// Why a stream's handle was released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Reached end of data
    Completed,
    /// No chunk was taken by the consumer within the idle window
    Idle,
    /// The consumer dropped the body
    Disconnected,
    /// Reading the file failed
    ReadError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaperState {
    TimerUnset,
    TimerRunning,
    Closed(CloseReason),
}

/// Response body over a reaped file handle
pub struct AssetStream {
    chunks: mpsc::Receiver<io::Result<Bytes>>,
    state: watch::Receiver<ReaperState>,
}

impl AssetStream {
    /// Start pumping `reader` in a background task
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<R>(reader: R, idle_timeout: Duration) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, chunks) = mpsc::channel(1);
        let (state_tx, state) = watch::channel(ReaperState::TimerUnset);
        let reaper = Reaper {
            handle: Some(reader),
            state: state_tx,
            idle_timeout,
        };
        tokio::spawn(reaper.run(tx));
        Self { chunks, state }
    }

    /// Observe the reaper from outside the body
    pub fn watch(&self) -> ReaperWatch {
        ReaperWatch(self.state.clone())
    }
}

impl Body for AssetStream {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        self.chunks
            .poll_recv(cx)
            .map(|chunk| chunk.map(|res| res.map(Frame::data)))
    }
}

/// Read-only view of a reaper's state
#[derive(Clone)]
pub struct ReaperWatch(watch::Receiver<ReaperState>);

impl ReaperWatch {
    pub fn state(&self) -> ReaperState {
        *self.0.borrow()
    }

    /// Wait until the handle has been released
    ///
    /// Returns `None` if the pump task was torn down without closing, which
    /// only happens when the runtime itself shuts down.
    pub async fn closed(&mut self) -> Option<CloseReason> {
        let state = self
            .0
            .wait_for(|s| matches!(s, ReaperState::Closed(_)))
            .await
            .ok()?;
        match *state {
            ReaperState::Closed(reason) => Some(reason),
            _ => None,
        }
    }
}

struct Reaper<R> {
    handle: Option<R>,
    state: watch::Sender<ReaperState>,
    idle_timeout: Duration,
}

impl<R> Reaper<R>
where
    R: AsyncRead + Unpin,
{
    /// Release the handle. Returns false if it was already released.
    fn close(&mut self, reason: CloseReason) -> bool {
        if self.handle.take().is_none() {
            return false;
        }
        self.state.send_replace(ReaperState::Closed(reason));
        true
    }

    async fn run(mut self, tx: mpsc::Sender<io::Result<Bytes>>) {
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let Some(handle) = self.handle.as_mut() else {
                return;
            };
            let chunk = match handle.read(&mut buf).await {
                Ok(0) => {
                    self.close(CloseReason::Completed);
                    return;
                }
                Ok(n) => Bytes::copy_from_slice(&buf[..n]),
                Err(e) => {
                    self.close(CloseReason::ReadError);
                    let _ = tokio::time::timeout(self.idle_timeout, tx.send(Err(e))).await;
                    return;
                }
            };

            // restart the idle window for this chunk
            self.state.send_replace(ReaperState::TimerRunning);
            match tokio::time::timeout(self.idle_timeout, tx.send(Ok(chunk))).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => {
                    self.close(CloseReason::Disconnected);
                    return;
                }
                Err(_) => {
                    self.close(CloseReason::Idle);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::time::Instant;

    const SHORT: Duration = Duration::from_millis(100);

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    /// Reader that fails on first use
    struct Broken;

    impl AsyncRead for Broken {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::other("disk on fire")))
        }
    }

    #[tokio::test]
    async fn test_full_read_closes_on_completion() {
        let data = payload(3 * CHUNK_SIZE + 17);
        let stream = AssetStream::spawn(io::Cursor::new(data.clone()), SHORT);
        let mut watch = stream.watch();

        let body = stream.collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), data.as_slice());
        assert_eq!(watch.closed().await, Some(CloseReason::Completed));

        // the idle timer must not fire afterwards
        tokio::time::sleep(SHORT * 3).await;
        assert_eq!(watch.state(), ReaperState::Closed(CloseReason::Completed));
    }

    #[tokio::test]
    async fn test_chunks_arrive_in_order() {
        let data = payload(2 * CHUNK_SIZE + 5);
        let mut stream = AssetStream::spawn(io::Cursor::new(data.clone()), SHORT);

        let mut received = Vec::new();
        let mut frames = 0;
        while let Some(frame) = stream.frame().await {
            let chunk = frame.unwrap().into_data().unwrap();
            received.extend_from_slice(&chunk);
            frames += 1;
        }
        assert_eq!(frames, 3);
        assert_eq!(received, data);
    }

    #[tokio::test]
    async fn test_empty_file_closes_without_timer() {
        let stream = AssetStream::spawn(io::Cursor::new(Vec::new()), SHORT);
        let mut watch = stream.watch();
        assert_eq!(watch.closed().await, Some(CloseReason::Completed));
        let body = stream.collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_stalled_consumer_is_reaped() {
        let data = payload(4 * CHUNK_SIZE);
        let mut stream = AssetStream::spawn(io::Cursor::new(data), SHORT);
        let mut watch = stream.watch();

        // take one chunk, then stop reading while keeping the body alive
        let first = stream.frame().await.unwrap().unwrap();
        assert!(first.is_data());
        let stalled_at = Instant::now();

        let reason = tokio::time::timeout(SHORT * 10, watch.closed())
            .await
            .expect("reaper did not fire");
        assert_eq!(reason, Some(CloseReason::Idle));
        assert!(stalled_at.elapsed() >= SHORT / 2);
        drop(stream);
    }

    #[tokio::test]
    async fn test_never_polled_stream_is_reaped() {
        let stream = AssetStream::spawn(io::Cursor::new(payload(4 * CHUNK_SIZE)), SHORT);
        let mut watch = stream.watch();
        let reason = tokio::time::timeout(SHORT * 10, watch.closed())
            .await
            .expect("reaper did not fire");
        assert_eq!(reason, Some(CloseReason::Idle));
        drop(stream);
    }

    #[tokio::test]
    async fn test_dropped_consumer_closes_early() {
        let stream = AssetStream::spawn(
            io::Cursor::new(payload(4 * CHUNK_SIZE)),
            Duration::from_secs(30),
        );
        let mut watch = stream.watch();
        drop(stream);
        let reason = tokio::time::timeout(Duration::from_secs(5), watch.closed())
            .await
            .expect("handle not released");
        assert_eq!(reason, Some(CloseReason::Disconnected));
    }

    #[tokio::test]
    async fn test_read_error_is_forwarded() {
        let stream = AssetStream::spawn(Broken, SHORT);
        let mut watch = stream.watch();
        let err = stream.collect().await.unwrap_err();
        assert_eq!(err.to_string(), "disk on fire");
        assert_eq!(watch.closed().await, Some(CloseReason::ReadError));
    }

    #[test]
    fn test_close_is_idempotent() {
        let (state, rx) = watch::channel(ReaperState::TimerRunning);
        let mut reaper = Reaper {
            handle: Some(io::Cursor::new(Vec::<u8>::new())),
            state,
            idle_timeout: SHORT,
        };
        assert!(reaper.close(CloseReason::Idle));
        assert!(!reaper.close(CloseReason::Completed));
        assert_eq!(*rx.borrow(), ReaperState::Closed(CloseReason::Idle));
    }
}
