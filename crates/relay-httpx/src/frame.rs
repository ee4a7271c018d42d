//! Newline-delimited frame reassembly over a byte stream.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read chunk size used for general HTTP streams.
pub const DEFAULT_MAX_READ: usize = 1024;
/// Longest pending frame accepted before the stream is failed.
pub const DEFAULT_MAX_FRAME: usize = 1024 * 1024;

/// Buffers raw reads and cuts them into frames terminated by `\n`.
///
/// An immediately following second `\n` belongs to the same frame, so an SSE
/// event separated by a blank line comes out as one frame. Bytes after the
/// last newline stay buffered until more data or [`Self::take_remainder`].
#[derive(Debug)]
pub struct FrameReassembler {
    buffer: BytesMut,
    max_read: usize,
    max_frame: usize,
    /// Prefix of `buffer` already known to hold no newline.
    scanned: usize,
}

impl FrameReassembler {
    pub fn new(max_read: usize) -> Self {
        let max_read = max_read.max(1);
        Self {
            buffer: BytesMut::with_capacity(max_read),
            max_read,
            max_frame: DEFAULT_MAX_FRAME,
            scanned: 0,
        }
    }

    pub fn with_max_frame(mut self, max_frame: usize) -> Self {
        self.max_frame = max_frame.max(1);
        self
    }

    /// True once the unterminated tail is longer than the frame limit.
    pub fn is_overflowing(&self) -> bool {
        self.buffer.len() > self.max_frame
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Reads at most `max_read` bytes from `reader` into the buffer.
    ///
    /// Returns the number of bytes read; `0` means end of stream.
    pub async fn fill<R>(&mut self, reader: &mut R) -> std::io::Result<usize>
    where
        R: AsyncRead + Unpin,
    {
        self.buffer.reserve(self.max_read);
        let mut limited = (&mut *reader).take(self.max_read as u64);
        limited.read_buf(&mut self.buffer).await
    }

    pub fn next_frame(&mut self) -> Option<Bytes> {
        let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') else {
            self.scanned = self.buffer.len();
            return None;
        };
        let mut end = self.scanned + offset + 1;
        if self.buffer.get(end) == Some(&b'\n') {
            end += 1;
        }
        self.scanned = 0;
        Some(self.buffer.split_to(end).freeze())
    }

    pub fn drain_frames(&mut self) -> impl Iterator<Item = Bytes> + '_ {
        std::iter::from_fn(move || self.next_frame())
    }

    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn take_remainder(&mut self) -> Option<Bytes> {
        self.scanned = 0;
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer.split().freeze())
        }
    }
}

impl Default for FrameReassembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_READ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_newline_stays_with_frame() {
        let mut r = FrameReassembler::default();
        r.push(b"data: a\n\ndata: b\n");
        assert_eq!(r.next_frame().unwrap(), Bytes::from_static(b"data: a\n\n"));
        assert_eq!(r.next_frame().unwrap(), Bytes::from_static(b"data: b\n"));
        assert!(r.next_frame().is_none());
    }

    #[test]
    fn test_partial_frame_is_retained() {
        let mut r = FrameReassembler::default();
        r.push(b"data: {\"id\":");
        assert!(r.next_frame().is_none());
        assert_eq!(r.pending(), b"data: {\"id\":");

        r.push(b"1}\n\n");
        assert_eq!(
            r.next_frame().unwrap(),
            Bytes::from_static(b"data: {\"id\":1}\n\n")
        );
        assert!(r.take_remainder().is_none());
    }

    #[test]
    fn test_triple_newline_splits_after_two() {
        let mut r = FrameReassembler::default();
        r.push(b"a\n\n\nb");
        assert_eq!(r.next_frame().unwrap(), Bytes::from_static(b"a\n\n"));
        assert_eq!(r.next_frame().unwrap(), Bytes::from_static(b"\n"));
        assert!(r.next_frame().is_none());
        assert_eq!(r.take_remainder().unwrap(), Bytes::from_static(b"b"));
    }

    #[test]
    fn test_scan_resumes_after_partial_push() {
        let mut r = FrameReassembler::default();
        r.push(b"data: abc");
        assert!(r.next_frame().is_none());
        r.push(b"def\n\nnext");
        assert_eq!(r.next_frame().unwrap(), Bytes::from_static(b"data: abcdef\n\n"));
        assert!(r.next_frame().is_none());
        r.push(b"\n");
        assert_eq!(r.next_frame().unwrap(), Bytes::from_static(b"next\n"));
    }

    #[test]
    fn test_overflow_past_max_frame() {
        let mut r = FrameReassembler::default().with_max_frame(8);
        r.push(b"12345678");
        assert!(r.next_frame().is_none());
        assert!(!r.is_overflowing());
        r.push(b"9");
        assert!(r.next_frame().is_none());
        assert!(r.is_overflowing());
    }

    #[tokio::test]
    async fn test_fill_respects_max_read() {
        let mut r = FrameReassembler::new(4);
        let mut source: &[u8] = b"0123456789";
        assert_eq!(r.fill(&mut source).await.unwrap(), 4);
        assert_eq!(r.fill(&mut source).await.unwrap(), 4);
        assert_eq!(r.fill(&mut source).await.unwrap(), 2);
        assert_eq!(r.fill(&mut source).await.unwrap(), 0);
        assert_eq!(r.pending(), b"0123456789");
    }
}
