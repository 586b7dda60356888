//! Buffered byte streams.
//!
//! Every readable stream implements [`ByteSource`] and every writable one
//! implements [`ByteSink`]. Sources expose their internal buffer directly:
//! a caller asks for data with [`fill`](ByteSource::fill), looks at it with
//! [`peek`](ByteSource::peek) and consumes it with
//! [`advance`](ByteSource::advance), so no copy is made until the data
//! reaches its destination.
//!
//! Compression is layered on top with [`TransformSource`] and
//! [`TransformSink`], which wrap another stream and a codec and are
//! themselves ordinary sources and sinks.
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use sqimage::codec::{build_decoder, build_encoder, EncoderOptions, Method};
//! use sqimage::io::{ByteSink, ByteSource, MemorySink, MemorySource, SharedSink, SharedSource};
//! use sqimage::io::{create_transform_sink, create_transform_source};
//!
//! # fn main() -> sqimage::Result<()> {
//! let compressed = Rc::new(RefCell::new(MemorySink::new("out")));
//! let downstream: SharedSink = compressed.clone();
//! let encoder = build_encoder(Method::Zstd, &EncoderOptions::default())?;
//!
//! let mut sink = create_transform_sink(downstream, encoder);
//! sink.append(b"hello, image")?;
//! sink.flush()?;
//! drop(sink);
//!
//! let bytes = compressed.borrow().contents().to_vec();
//! let upstream: SharedSource = Rc::new(RefCell::new(MemorySource::new("in", bytes)));
//! let mut source = create_transform_source(upstream, build_decoder(Method::Zstd)?);
//!
//! let mut plain = Vec::new();
//! source.read_to_end(&mut plain)?;
//! assert_eq!(plain, b"hello, image");
//! # Ok(())
//! # }
//! ```

mod buffer;
mod config;
mod file;
mod memory;
mod xfrm;

use std::cell::RefCell;
use std::rc::Rc;

pub use config::{DEFAULT_BUFFER_SIZE, DEFAULT_SINK_BUFFER_SIZE, StreamConfig};
pub use file::{
    FileSink, FileSource, ReaderSource, SinkOptions, StdinSource, StdoutSink, WriterSink,
    open_file_sink, open_file_sink_with_config, open_file_source, open_file_source_with_config,
    open_stdin_source, open_stdout_sink,
};
pub use memory::{MemorySink, MemorySource};
pub use xfrm::{
    TransformSink, TransformSource, create_transform_sink, create_transform_source,
    open_compressed_source,
};

use crate::Result;

/// Outcome of a [`ByteSource::fill`] call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// Data is buffered; [`peek`](ByteSource::peek) is not empty.
    Ready,
    /// The stream is exhausted and nothing is buffered.
    ///
    /// Every later `fill` reports the same without touching the medium.
    EndOfData,
}

/// A buffered, readable stream.
pub trait ByteSource {
    /// Diagnostic name of the stream, used in error messages.
    fn name(&self) -> &str;

    /// Makes at least `want` bytes available through [`peek`](Self::peek).
    ///
    /// `want` is clamped to `1..=capacity`. Fewer bytes are buffered only if
    /// the stream ends first. Returns [`ReadStatus::EndOfData`] once the
    /// stream is exhausted and its buffer is empty.
    fn fill(&mut self, want: usize) -> Result<ReadStatus>;

    /// Returns the buffered, unread bytes.
    fn peek(&self) -> &[u8];

    /// Consumes `n` bytes from the front of the buffer.
    ///
    /// # Panics
    ///
    /// Panics if `n` is larger than the number of buffered bytes.
    fn advance(&mut self, n: usize);

    /// Copies up to `buf.len()` bytes into `buf`.
    ///
    /// Returns 0 at end of data, on every call after the first.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.peek().is_empty() && self.fill(buf.len())? == ReadStatus::EndOfData {
            return Ok(0);
        }

        let data = self.peek();
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        self.advance(n);
        Ok(n)
    }

    /// Reads everything up to end of data, appending it to `out`.
    ///
    /// Returns the number of bytes appended.
    fn read_to_end(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        let mut total = 0;
        while self.fill(1)? == ReadStatus::Ready {
            let data = self.peek();
            out.extend_from_slice(data);
            let n = data.len();
            self.advance(n);
            total += n;
        }
        Ok(total)
    }

    /// Discards up to `len` bytes.
    ///
    /// Returns the number skipped, which is less than `len` only at end of data.
    fn skip(&mut self, len: u64) -> Result<u64> {
        let mut skipped = 0;
        while skipped < len {
            let want = usize::try_from(len - skipped).unwrap_or(usize::MAX);
            if self.fill(want)? == ReadStatus::EndOfData {
                break;
            }
            let n = self.peek().len().min(want);
            self.advance(n);
            skipped += n as u64;
        }
        Ok(skipped)
    }

    /// Copies up to `len` bytes from this source into `sink`.
    ///
    /// Returns the number copied, which is less than `len` only at end of data.
    fn splice(&mut self, sink: &mut dyn ByteSink, len: u64) -> Result<u64> {
        let mut copied = 0;
        while copied < len {
            let want = usize::try_from(len - copied).unwrap_or(usize::MAX);
            if self.fill(want)? == ReadStatus::EndOfData {
                break;
            }
            let data = self.peek();
            let n = data.len().min(want);
            sink.append(&data[..n])?;
            self.advance(n);
            copied += n as u64;
        }
        Ok(copied)
    }
}

/// A writable stream.
pub trait ByteSink {
    /// Diagnostic name of the stream, used in error messages.
    fn name(&self) -> &str;

    /// Appends `data` to the stream.
    fn append(&mut self, data: &[u8]) -> Result<()>;

    /// Appends `len` zero bytes.
    ///
    /// Sinks backed by a seekable medium may leave a hole instead of writing.
    fn append_sparse(&mut self, len: u64) -> Result<()> {
        append_zeros(self, len)
    }

    /// Pushes everything appended so far to the backing medium.
    fn flush(&mut self) -> Result<()>;
}

fn append_zeros<S: ByteSink + ?Sized>(sink: &mut S, len: u64) -> Result<()> {
    const ZEROS: [u8; 4096] = [0; 4096];
    let mut remaining = len;
    while remaining > 0 {
        let n = remaining.min(ZEROS.len() as u64) as usize;
        sink.append(&ZEROS[..n])?;
        remaining -= n as u64;
    }
    Ok(())
}

/// A source with shared ownership.
pub type SharedSource = Rc<RefCell<dyn ByteSource>>;

/// A sink with shared ownership.
pub type SharedSink = Rc<RefCell<dyn ByteSink>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn source(data: &[u8], window: usize) -> MemorySource {
        MemorySource::with_window("mem", data.to_vec(), window)
    }

    #[test]
    fn test_read_in_small_pieces() {
        let mut src = source(b"Hello, World!", 4);
        let mut out = Vec::new();
        let mut buf = [0u8; 3];
        loop {
            let n = src.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, b"Hello, World!");
        assert_eq!(src.read(&mut buf).unwrap(), 0);
        assert_eq!(src.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_read_empty_buffer() {
        let mut src = source(b"abc", 4);
        assert_eq!(src.read(&mut []).unwrap(), 0);
        assert_eq!(src.peek(), b"");
    }

    #[test]
    fn test_read_to_end() {
        let data: Vec<u8> = (0..=255).cycle().take(1000).collect();
        let mut src = source(&data, 7);
        let mut out = Vec::new();
        assert_eq!(src.read_to_end(&mut out).unwrap(), 1000);
        assert_eq!(out, data);
        assert_eq!(src.read_to_end(&mut out).unwrap(), 0);
    }

    #[test]
    fn test_skip() {
        let mut src = source(b"0123456789", 3);
        assert_eq!(src.skip(4).unwrap(), 4);
        let mut buf = [0u8; 2];
        src.read(&mut buf).unwrap();
        assert_eq!(&buf, b"45");
        assert_eq!(src.skip(100).unwrap(), 4);
        assert_eq!(src.skip(1).unwrap(), 0);
    }

    #[test]
    fn test_splice() {
        let mut src = source(b"0123456789", 4);
        let mut sink = MemorySink::new("sink");
        assert_eq!(src.splice(&mut sink, 6).unwrap(), 6);
        assert_eq!(sink.contents(), b"012345");
        assert_eq!(src.splice(&mut sink, 100).unwrap(), 4);
        assert_eq!(sink.contents(), b"0123456789");
    }

    #[test]
    fn test_append_sparse_default() {
        let mut sink = MemorySink::new("sink");
        sink.append(b"a").unwrap();
        sink.append_sparse(5000).unwrap();
        sink.append(b"b").unwrap();
        assert_eq!(sink.contents().len(), 5002);
        assert!(sink.contents()[1..5001].iter().all(|&b| b == 0));
        assert_eq!(sink.contents()[5001], b'b');
    }

    #[test]
    fn test_shared_source_as_trait_object() {
        let shared: SharedSource = Rc::new(RefCell::new(source(b"xyz", 8)));
        let mut out = Vec::new();
        shared.borrow_mut().read_to_end(&mut out).unwrap();
        assert_eq!(out, b"xyz");
        assert_eq!(shared.borrow().name(), "mem");
    }
}
