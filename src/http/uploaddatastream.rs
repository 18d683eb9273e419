//! Request body sources.
//!
//! Based on Chromium's `UploadDataStream`: the transaction initializes the
//! body before building headers (so the size and chunking are known) and the
//! stream pulls bytes with `read`. A body must be rewindable with `reset`
//! unless it reports `has_null_source`.

use bytes::Bytes;
use std::collections::VecDeque;
use tokio::sync::mpsc;

use super::stream::StreamFuture;
use crate::base::neterror::NetError;

pub trait UploadDataStream: Send {
    /// Prepare for reading from the start. Called once per attempt.
    fn init(&mut self) -> StreamFuture<'_, Result<(), NetError>>;

    /// Total size, or 0 when chunked.
    fn size(&self) -> u64;

    fn is_chunked(&self) -> bool;

    /// The body comes from a single-use source and cannot be replayed.
    fn has_null_source(&self) -> bool {
        false
    }

    fn position(&self) -> u64;

    fn is_eof(&self) -> bool;

    /// Copy up to `buf.len()` bytes; `Ok(0)` at end of body.
    fn read<'a>(&'a mut self, buf: &'a mut [u8]) -> StreamFuture<'a, Result<usize, NetError>>;

    /// Rewind to the first byte.
    fn reset(&mut self);
}

/// A fixed, in-memory body.
#[derive(Debug, Clone, Default)]
pub struct ElementsUploadDataStream {
    data: Bytes,
    position: usize,
    null_source: bool,
}

impl ElementsUploadDataStream {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            position: 0,
            null_source: false,
        }
    }

    /// Mark the body as single-use (e.g. a streamed upload the embedder will
    /// not produce twice).
    pub fn single_use(mut self) -> Self {
        self.null_source = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

impl From<String> for ElementsUploadDataStream {
    fn from(s: String) -> Self {
        Self::new(Bytes::from(s))
    }
}

impl From<Vec<u8>> for ElementsUploadDataStream {
    fn from(v: Vec<u8>) -> Self {
        Self::new(Bytes::from(v))
    }
}

impl From<&str> for ElementsUploadDataStream {
    fn from(s: &str) -> Self {
        Self::new(Bytes::from(s.to_owned()))
    }
}

impl UploadDataStream for ElementsUploadDataStream {
    fn init(&mut self) -> StreamFuture<'_, Result<(), NetError>> {
        self.position = 0;
        Box::pin(async { Ok(()) })
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn is_chunked(&self) -> bool {
        false
    }

    fn has_null_source(&self) -> bool {
        self.null_source
    }

    fn position(&self) -> u64 {
        self.position as u64
    }

    fn is_eof(&self) -> bool {
        self.position >= self.data.len()
    }

    fn read<'a>(&'a mut self, buf: &'a mut [u8]) -> StreamFuture<'a, Result<usize, NetError>> {
        Box::pin(async move {
            let remaining = &self.data[self.position..];
            let n = remaining.len().min(buf.len());
            buf[..n].copy_from_slice(&remaining[..n]);
            self.position += n;
            Ok(n)
        })
    }

    fn reset(&mut self) {
        self.position = 0;
    }
}

/// Feeds a [`ChunkedUploadDataStream`] while the request is in flight.
#[derive(Debug, Clone)]
pub struct ChunkedUploadWriter {
    tx: mpsc::UnboundedSender<Option<Bytes>>,
}

impl ChunkedUploadWriter {
    /// Append a chunk; `is_done` marks the final one.
    pub fn append_data(&self, data: impl Into<Bytes>, is_done: bool) -> Result<(), NetError> {
        self.tx
            .send(Some(data.into()))
            .map_err(|_| NetError::ConnectionClosed)?;
        if is_done {
            self.tx.send(None).map_err(|_| NetError::ConnectionClosed)?;
        }
        Ok(())
    }
}

/// A body of unknown length, sent with `Transfer-Encoding: chunked`.
///
/// Chunks already read are kept so the body can be replayed on a resend.
#[derive(Debug)]
pub struct ChunkedUploadDataStream {
    rx: mpsc::UnboundedReceiver<Option<Bytes>>,
    pending: VecDeque<Bytes>,
    consumed: Vec<Bytes>,
    position: u64,
    all_received: bool,
}

impl ChunkedUploadDataStream {
    pub fn new() -> (Self, ChunkedUploadWriter) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                rx,
                pending: VecDeque::new(),
                consumed: Vec::new(),
                position: 0,
                all_received: false,
            },
            ChunkedUploadWriter { tx },
        )
    }
}

impl UploadDataStream for ChunkedUploadDataStream {
    fn init(&mut self) -> StreamFuture<'_, Result<(), NetError>> {
        self.reset();
        Box::pin(async { Ok(()) })
    }

    fn size(&self) -> u64 {
        0
    }

    fn is_chunked(&self) -> bool {
        true
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn is_eof(&self) -> bool {
        self.all_received && self.pending.is_empty()
    }

    fn read<'a>(&'a mut self, buf: &'a mut [u8]) -> StreamFuture<'a, Result<usize, NetError>> {
        Box::pin(async move {
            while self.pending.is_empty() && !self.all_received {
                match self.rx.recv().await {
                    Some(Some(chunk)) if chunk.is_empty() => continue,
                    Some(Some(chunk)) => self.pending.push_back(chunk),
                    Some(None) => self.all_received = true,
                    // Writer dropped without finishing.
                    None => return Err(NetError::Aborted),
                }
            }
            let Some(mut chunk) = self.pending.pop_front() else {
                return Ok(0);
            };
            let n = chunk.len().min(buf.len());
            let head = chunk.split_to(n);
            buf[..n].copy_from_slice(&head);
            self.consumed.push(head);
            if !chunk.is_empty() {
                self.pending.push_front(chunk);
            }
            self.position += n as u64;
            Ok(n)
        })
    }

    fn reset(&mut self) {
        for chunk in self.consumed.drain(..).rev() {
            self.pending.push_front(chunk);
        }
        self.position = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read_all(stream: &mut dyn UploadDataStream) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 3];
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                return out;
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    #[tokio::test]
    async fn test_elements_read_and_reset() {
        let mut body = ElementsUploadDataStream::from("hello");
        body.init().await.unwrap();
        assert_eq!(body.size(), 5);
        assert!(!body.is_chunked());
        assert_eq!(read_all(&mut body).await, b"hello");
        assert!(body.is_eof());

        body.reset();
        assert_eq!(body.position(), 0);
        assert_eq!(read_all(&mut body).await, b"hello");
    }

    #[test]
    fn test_single_use() {
        let body = ElementsUploadDataStream::from("x");
        assert!(!body.has_null_source());
        assert!(body.single_use().has_null_source());
    }

    #[tokio::test]
    async fn test_chunked_replay() {
        let (mut body, writer) = ChunkedUploadDataStream::new();
        writer.append_data("abcd", false).unwrap();
        writer.append_data("ef", true).unwrap();

        body.init().await.unwrap();
        assert!(body.is_chunked());
        assert_eq!(read_all(&mut body).await, b"abcdef");

        body.init().await.unwrap();
        assert_eq!(read_all(&mut body).await, b"abcdef");
    }

    #[tokio::test]
    async fn test_chunked_writer_dropped() {
        let (mut body, writer) = ChunkedUploadDataStream::new();
        writer.append_data("ab", false).unwrap();
        drop(writer);
        let mut buf = [0u8; 8];
        assert_eq!(body.read(&mut buf).await.unwrap(), 2);
        assert_eq!(body.read(&mut buf).await, Err(NetError::Aborted));
    }
}
