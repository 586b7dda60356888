//! In-memory sources and sinks.

use super::buffer::SourceBuffer;
use super::{ByteSink, ByteSource, DEFAULT_BUFFER_SIZE, ReadStatus};
use crate::{Error, Result};

/// A source reading from an owned byte vector.
///
/// Data is exposed through the same fixed-capacity window as file-backed
/// sources, so a small window can be used to exercise callers against
/// short fills.
#[derive(Debug)]
pub struct MemorySource {
    name: String,
    data: Vec<u8>,
    pos: usize,
    buffer: SourceBuffer,
}

impl MemorySource {
    /// Creates a source over `data` with the default window size.
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::with_window(name, data, DEFAULT_BUFFER_SIZE)
    }

    /// Creates a source over `data` that buffers at most `window` bytes at a time.
    pub fn with_window(name: impl Into<String>, data: impl Into<Vec<u8>>, window: usize) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            pos: 0,
            buffer: SourceBuffer::new(window),
        }
    }

    /// Number of bytes not yet pulled into the window.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns true once the backing data has been fully pulled into the window.
    pub fn is_eof(&self) -> bool {
        self.buffer.is_eof()
    }
}

impl ByteSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fill(&mut self, want: usize) -> Result<ReadStatus> {
        let data = &self.data;
        let pos = &mut self.pos;
        self.buffer.fill_with(want, &self.name, |spare| {
            let n = spare.len().min(data.len() - *pos);
            spare[..n].copy_from_slice(&data[*pos..*pos + n]);
            *pos += n;
            Ok(n)
        })
    }

    fn peek(&self) -> &[u8] {
        self.buffer.peek()
    }

    fn advance(&mut self, n: usize) {
        self.buffer.advance(n);
    }
}

/// A sink collecting everything appended to it.
#[derive(Debug, Default)]
pub struct MemorySink {
    name: String,
    data: Vec<u8>,
    flushes: usize,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Vec::new(),
            flushes: 0,
        }
    }

    /// Returns everything appended so far.
    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    /// Number of times [`flush`](ByteSink::flush) was called.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    /// Consumes the sink and returns its contents.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl ByteSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn append(&mut self, data: &[u8]) -> Result<()> {
        self.data.extend_from_slice(data);
        Ok(())
    }

    fn append_sparse(&mut self, len: u64) -> Result<()> {
        let too_large = || Error::InvalidArgument(format!("{}: hole of {} bytes is too large", self.name, len));
        let new_len = usize::try_from(len)
            .ok()
            .and_then(|l| self.data.len().checked_add(l))
            .ok_or_else(too_large)?;
        self.data
            .try_reserve(new_len - self.data.len())
            .map_err(|_| too_large())?;
        self.data.resize(new_len, 0);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
