//! Bridge from a blocking encoder to a streamed response body
//!
//! The encoder writes into a [`ChannelSink`] on a blocking thread. Bytes are
//! cut into fixed-size chunks and pushed through a bounded channel, so a slow
//! client stalls the encoder instead of growing a buffer. When the client goes
//! away the receiver is dropped and the next write fails.

use axum::body::Bytes;
use std::io::{self, Write};
use std::mem;
use tokio::sync::mpsc;

/// One item of a streamed body
pub type Chunk = Result<Bytes, io::Error>;

pub struct ChannelSink {
    tx: mpsc::Sender<Chunk>,
    buffer: Vec<u8>,
    chunk_size: usize,
}

impl ChannelSink {
    /// Create a sink and the receiving half of its channel
    pub fn channel(chunk_size: usize, depth: usize) -> (Self, mpsc::Receiver<Chunk>) {
        let (tx, rx) = mpsc::channel(depth.max(1));
        let chunk_size = chunk_size.max(1);
        let sink = Self {
            tx,
            buffer: Vec::with_capacity(chunk_size),
            chunk_size,
        };
        (sink, rx)
    }

    /// Abort the body with an error item so the client sees a broken transfer
    pub fn fail(self, reason: &str) {
        let err = io::Error::new(io::ErrorKind::Other, reason.to_string());
        // The receiver may already be gone; nothing left to tell it then
        let _ = self.tx.blocking_send(Err(err));
    }

    fn send(&mut self, chunk: Vec<u8>) -> io::Result<()> {
        self.tx
            .blocking_send(Ok(Bytes::from(chunk)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected"))
    }
}

impl Write for ChannelSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        while self.buffer.len() >= self.chunk_size {
            let rest = self.buffer.split_off(self.chunk_size);
            let chunk = mem::replace(&mut self.buffer, rest);
            self.send(chunk)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk = mem::take(&mut self.buffer);
        self.send(chunk)
    }
}
