//! Byte source/sink collaborator interfaces.
//!
//! The transport owns the channel; this layer only borrows it. Sources
//! support nested peek scopes so speculative reads (magic sniffing, CRC
//! validation, version negotiation) can be rolled back without consuming
//! bytes. Sinks support cache scopes so deferred writes can be buffered and
//! either flushed or discarded.

use bytes::Bytes;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::CoreError;

/// A blocking, incrementally consumed byte stream.
pub trait ByteSource: Send {
    /// Read one byte, consuming it (or advancing the peek cursor inside a
    /// peek scope).
    fn get(&mut self) -> Result<u8, CoreError>;

    /// Fill `buf` completely.
    fn read(&mut self, buf: &mut [u8]) -> Result<(), CoreError> {
        for slot in buf.iter_mut() {
            *slot = self.get()?;
        }
        Ok(())
    }

    /// Consume and discard `n` bytes.
    fn skip(&mut self, n: usize) -> Result<(), CoreError> {
        for _ in 0..n {
            self.get()?;
        }
        Ok(())
    }

    /// True when no further bytes will ever be available.
    fn is_finished(&self) -> bool;

    /// Close the source. Subsequent reads fail with
    /// [`CoreError::SourceClosed`].
    fn close(&mut self);

    /// Open a peek scope at the current position.
    fn peek_start(&mut self);

    /// Commit the current peek scope: bytes read since the matching
    /// [`ByteSource::peek_start`] stay consumed.
    fn peek_skip(&mut self) -> Result<(), CoreError>;

    /// Abandon the current peek scope, rewinding to where it began.
    fn peek_rewind(&mut self) -> Result<(), CoreError>;

    /// True while at least one peek scope is open.
    fn is_peeking(&self) -> bool;
}

/// A byte stream being produced.
pub trait ByteSink: Send {
    /// Write one byte.
    fn put(&mut self, byte: u8) -> Result<(), CoreError>;

    /// Write a slice.
    fn write(&mut self, data: &[u8]) -> Result<(), CoreError> {
        for &byte in data {
            self.put(byte)?;
        }
        Ok(())
    }

    /// Open a cache scope: subsequent writes are buffered, not emitted.
    fn cache_start(&mut self);

    /// Discard everything written inside the current cache scope.
    fn cache_clear(&mut self) -> Result<(), CoreError>;

    /// Emit everything written inside the current cache scope.
    fn cache_flush(&mut self) -> Result<(), CoreError>;

    /// True while at least one cache scope is open.
    fn is_caching(&self) -> bool;

    /// Close the sink. Subsequent writes fail with
    /// [`CoreError::SinkClosed`].
    fn close(&mut self);
}

/// In-memory [`ByteSource`] over a byte buffer.
///
/// Used by tests and by composition roots that already hold the full frame.
pub struct BufferSource {
    data: Bytes,
    pos: usize,
    marks: Vec<usize>,
    closed: bool,
}

impl BufferSource {
    /// Create a source over the given bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
            marks: Vec::new(),
            closed: false,
        }
    }

    /// Bytes remaining from the current position.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl ByteSource for BufferSource {
    fn get(&mut self) -> Result<u8, CoreError> {
        if self.closed {
            return Err(CoreError::SourceClosed);
        }
        let byte = *self.data.get(self.pos).ok_or(CoreError::SourceExhausted)?;
        self.pos += 1;
        Ok(byte)
    }

    fn is_finished(&self) -> bool {
        self.closed || self.pos >= self.data.len()
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn peek_start(&mut self) {
        self.marks.push(self.pos);
    }

    fn peek_skip(&mut self) -> Result<(), CoreError> {
        self.marks.pop().map(|_| ()).ok_or(CoreError::NotPeeking)
    }

    fn peek_rewind(&mut self) -> Result<(), CoreError> {
        let mark = self.marks.pop().ok_or(CoreError::NotPeeking)?;
        self.pos = mark;
        Ok(())
    }

    fn is_peeking(&self) -> bool {
        !self.marks.is_empty()
    }
}

/// In-memory [`ByteSink`] accumulating into a `Vec<u8>`.
#[derive(Default)]
pub struct BufferSink {
    out: Vec<u8>,
    caches: Vec<Vec<u8>>,
    closed: bool,
}

impl BufferSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// The emitted bytes. Open cache scopes are not included.
    pub fn as_slice(&self) -> &[u8] {
        &self.out
    }

    /// Consume the sink, returning the emitted bytes.
    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.out)
    }
}

impl ByteSink for BufferSink {
    fn put(&mut self, byte: u8) -> Result<(), CoreError> {
        if self.closed {
            return Err(CoreError::SinkClosed);
        }
        match self.caches.last_mut() {
            Some(cache) => cache.push(byte),
            None => self.out.push(byte),
        }
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), CoreError> {
        if self.closed {
            return Err(CoreError::SinkClosed);
        }
        match self.caches.last_mut() {
            Some(cache) => cache.extend_from_slice(data),
            None => self.out.extend_from_slice(data),
        }
        Ok(())
    }

    fn cache_start(&mut self) {
        self.caches.push(Vec::new());
    }

    fn cache_clear(&mut self) -> Result<(), CoreError> {
        self.caches.pop().map(|_| ()).ok_or(CoreError::NotCaching)
    }

    fn cache_flush(&mut self) -> Result<(), CoreError> {
        let cache = self.caches.pop().ok_or(CoreError::NotCaching)?;
        match self.caches.last_mut() {
            Some(parent) => parent.extend_from_slice(&cache),
            None => self.out.extend_from_slice(&cache),
        }
        Ok(())
    }

    fn is_caching(&self) -> bool {
        !self.caches.is_empty()
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// A [`ByteSource`] shared between the contexts of one conversation.
///
/// Wraps the source in a mutual-exclusion monitor so concurrent accesses
/// from contexts referencing the same source are serialized rather than
/// corrupting the cursor. One conversation still has exactly one logical
/// reader; the monitor guards against accidental interleaving, it does not
/// make interleaved parsing meaningful.
#[derive(Clone)]
pub struct SharedSource {
    inner: Arc<Mutex<Box<dyn ByteSource>>>,
}

impl SharedSource {
    /// Wrap a source for sharing.
    pub fn new(source: impl ByteSource + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(source))),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut dyn ByteSource) -> R) -> R {
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(guard.as_mut())
    }
}

impl ByteSource for SharedSource {
    fn get(&mut self) -> Result<u8, CoreError> {
        self.with(|s| s.get())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), CoreError> {
        self.with(|s| s.read(buf))
    }

    fn skip(&mut self, n: usize) -> Result<(), CoreError> {
        self.with(|s| s.skip(n))
    }

    fn is_finished(&self) -> bool {
        self.with(|s| s.is_finished())
    }

    fn close(&mut self) {
        self.with(|s| s.close());
    }

    fn peek_start(&mut self) {
        self.with(|s| s.peek_start());
    }

    fn peek_skip(&mut self) -> Result<(), CoreError> {
        self.with(|s| s.peek_skip())
    }

    fn peek_rewind(&mut self) -> Result<(), CoreError> {
        self.with(|s| s.peek_rewind())
    }

    fn is_peeking(&self) -> bool {
        self.with(|s| s.is_peeking())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_sequential_reads() {
        let mut source = BufferSource::new(vec![1, 2, 3]);
        assert_eq!(source.get().unwrap(), 1);
        assert_eq!(source.get().unwrap(), 2);
        assert_eq!(source.get().unwrap(), 3);
        assert!(source.is_finished());
        assert_eq!(source.get().unwrap_err(), CoreError::SourceExhausted);
    }

    #[test]
    fn test_source_peek_rewind() {
        let mut source = BufferSource::new(vec![10, 20, 30]);
        source.peek_start();
        assert!(source.is_peeking());
        assert_eq!(source.get().unwrap(), 10);
        assert_eq!(source.get().unwrap(), 20);
        source.peek_rewind().unwrap();
        assert!(!source.is_peeking());
        assert_eq!(source.get().unwrap(), 10);
    }

    #[test]
    fn test_source_peek_commit() {
        let mut source = BufferSource::new(vec![10, 20, 30]);
        source.peek_start();
        assert_eq!(source.get().unwrap(), 10);
        source.peek_skip().unwrap();
        assert_eq!(source.get().unwrap(), 20);
    }

    #[test]
    fn test_source_nested_peeks() {
        let mut source = BufferSource::new(vec![1, 2, 3, 4]);
        source.peek_start();
        assert_eq!(source.get().unwrap(), 1);
        source.peek_start();
        assert_eq!(source.get().unwrap(), 2);
        source.peek_rewind().unwrap(); // back to after 1
        assert!(source.is_peeking());
        assert_eq!(source.get().unwrap(), 2);
        source.peek_rewind().unwrap(); // back to the start
        assert_eq!(source.get().unwrap(), 1);
    }

    #[test]
    fn test_source_rewind_without_peek() {
        let mut source = BufferSource::new(vec![1]);
        assert_eq!(source.peek_rewind().unwrap_err(), CoreError::NotPeeking);
    }

    #[test]
    fn test_source_closed() {
        let mut source = BufferSource::new(vec![1, 2]);
        source.close();
        assert!(source.is_finished());
        assert_eq!(source.get().unwrap_err(), CoreError::SourceClosed);
    }

    #[test]
    fn test_sink_cache_flush() {
        let mut sink = BufferSink::new();
        sink.write(b"head").unwrap();
        sink.cache_start();
        sink.write(b"body").unwrap();
        assert_eq!(sink.as_slice(), b"head");
        sink.cache_flush().unwrap();
        assert_eq!(sink.as_slice(), b"headbody");
    }

    #[test]
    fn test_sink_cache_clear() {
        let mut sink = BufferSink::new();
        sink.cache_start();
        sink.write(b"discarded").unwrap();
        sink.cache_clear().unwrap();
        sink.write(b"kept").unwrap();
        assert_eq!(sink.as_slice(), b"kept");
    }

    #[test]
    fn test_sink_nested_caches() {
        let mut sink = BufferSink::new();
        sink.cache_start();
        sink.put(b'a').unwrap();
        sink.cache_start();
        sink.put(b'b').unwrap();
        sink.cache_flush().unwrap(); // b joins a's cache
        sink.cache_flush().unwrap();
        assert_eq!(sink.as_slice(), b"ab");
    }

    #[test]
    fn test_sink_closed() {
        let mut sink = BufferSink::new();
        sink.close();
        assert_eq!(sink.put(0).unwrap_err(), CoreError::SinkClosed);
    }

    #[test]
    fn test_shared_source_serializes_access() {
        let mut shared = SharedSource::new(BufferSource::new(vec![5, 6]));
        let mut other = shared.clone();
        assert_eq!(shared.get().unwrap(), 5);
        assert_eq!(other.get().unwrap(), 6);
        assert!(shared.is_finished());
    }
}
