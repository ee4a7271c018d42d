//! Streaming response delivery.
//!
//! A spawned reader task owns the upstream body and pushes frames into a
//! bounded channel. The consumer sees an ordered sequence of
//! [`StreamEvent::Frame`]s, optionally one terminal [`StreamEvent::Failed`],
//! and then the channel closes. Dropping the [`FrameStream`] stops the reader
//! at its next send.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::Stream;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::frame::{FrameReassembler, DEFAULT_MAX_FRAME, DEFAULT_MAX_READ};
use crate::HttpError;

pub const DEFAULT_STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug)]
pub enum StreamEvent {
    Frame { index: usize, data: Bytes },
    /// Terminal failure. `trailing` holds buffered bytes that never formed a
    /// complete frame.
    Failed { error: HttpError, trailing: Bytes },
}

#[derive(Debug, Clone)]
pub struct StreamOptions {
    pub max_read: usize,
    /// Longest unterminated frame before the stream is failed.
    pub max_frame: usize,
    /// Longest wait for a single read before the stream is failed.
    pub idle_timeout: Duration,
    pub capacity: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            max_read: DEFAULT_MAX_READ,
            max_frame: DEFAULT_MAX_FRAME,
            idle_timeout: DEFAULT_STREAM_IDLE_TIMEOUT,
            capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Debug)]
pub struct FrameStream {
    rx: mpsc::Receiver<StreamEvent>,
}

impl FrameStream {
    /// Starts a reader task over `reader`.
    pub fn spawn<R>(reader: R, options: StreamOptions) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        Self::spawn_at(reader, options, Instant::now())
    }

    pub(crate) fn spawn_at<R>(reader: R, options: StreamOptions, started: Instant) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(options.capacity.max(1));
        tokio::spawn(read_frames(reader, tx, options, started));
        Self { rx }
    }

    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }
}

impl Stream for FrameStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

async fn read_frames<R>(
    mut reader: R,
    tx: mpsc::Sender<StreamEvent>,
    options: StreamOptions,
    started: Instant,
) where
    R: AsyncRead + Unpin,
{
    let mut reassembler =
        FrameReassembler::new(options.max_read).with_max_frame(options.max_frame);
    let mut index = 0usize;

    loop {
        let read = tokio::time::timeout(options.idle_timeout, reassembler.fill(&mut reader)).await;
        let error = match read {
            Ok(Ok(0)) => break,
            Ok(Ok(_)) => {
                for data in reassembler.drain_frames() {
                    if tx.send(StreamEvent::Frame { index, data }).await.is_err() {
                        debug!(frames = index, "stream receiver dropped, stopping reader");
                        return;
                    }
                    index += 1;
                }
                if !reassembler.is_overflowing() {
                    continue;
                }
                HttpError::StreamRead(format!(
                    "frame exceeds {} bytes without a newline",
                    options.max_frame
                ))
            }
            Ok(Err(e)) => HttpError::StreamRead(e.to_string()),
            Err(_) => HttpError::StreamTimeout {
                elapsed: started.elapsed(),
            },
        };

        warn!(error = %error, frames = index, "upstream stream failed");
        let trailing = reassembler.take_remainder().unwrap_or_default();
        let _ = tx.send(StreamEvent::Failed { error, trailing }).await;
        return;
    }

    if let Some(data) = reassembler.take_remainder() {
        let _ = tx.send(StreamEvent::Frame { index, data }).await;
        index += 1;
    }
    debug!(
        frames = index,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "upstream stream complete"
    );
}
