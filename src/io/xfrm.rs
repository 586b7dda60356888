//! Compression decorators for sources and sinks.
//!
//! A [`TransformSource`] decompresses the bytes of another source, and a
//! [`TransformSink`] compresses everything appended to it into another sink.
//! Both hold shared references to the wrapped stream and codec, so the
//! creator can keep its own handles and inspect them afterwards.

use std::cell::RefCell;
use std::rc::Rc;

use super::buffer::SourceBuffer;
use super::{ByteSink, ByteSource, ReadStatus, SharedSink, SharedSource, StreamConfig};
use crate::codec::{DecodeStatus, Method, SharedDecoder, SharedEncoder, build_decoder, detect_method};
use crate::{Error, Result};

/// Number of leading bytes needed to recognize every supported magic.
const MAGIC_PROBE_LEN: usize = 6;

/// A source producing the decompressed contents of another source.
///
/// Concatenated frames are decoded as one continuous stream: when a frame
/// ends and the upstream still has data, the decoder is reset and decoding
/// continues with the next frame.
///
/// Any error is fatal. Later calls to [`fill`](ByteSource::fill) return
/// [`Error::StreamFinished`].
pub struct TransformSource {
    name: String,
    upstream: SharedSource,
    decoder: SharedDecoder,
    buffer: SourceBuffer,
    /// The decoder has seen data of a frame that has not ended yet.
    in_frame: bool,
    failed: bool,
}

impl std::fmt::Debug for TransformSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformSource")
            .field("name", &self.name)
            .field("buffer", &self.buffer)
            .field("in_frame", &self.in_frame)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

impl TransformSource {
    /// Wraps `upstream` with the default configuration.
    pub fn new(upstream: SharedSource, decoder: SharedDecoder) -> Self {
        Self::with_config(upstream, decoder, &StreamConfig::default())
    }

    /// Wraps `upstream`, buffering up to `config.buffer_size` decoded bytes.
    pub fn with_config(upstream: SharedSource, decoder: SharedDecoder, config: &StreamConfig) -> Self {
        let name = upstream.borrow().name().to_string();
        log::debug!(
            "decoding {} as {}",
            name,
            decoder.borrow().method().name()
        );
        Self {
            name,
            upstream,
            decoder,
            buffer: SourceBuffer::new(config.buffer_size),
            in_frame: false,
            failed: false,
        }
    }

    /// Returns the wrapped source.
    pub fn upstream(&self) -> &SharedSource {
        &self.upstream
    }

    /// Returns the decoder.
    pub fn decoder(&self) -> &SharedDecoder {
        &self.decoder
    }

    fn fill_buffer(&mut self, want: usize) -> Result<()> {
        let want = self.buffer.clamp_want(want);
        if self.buffer.available() >= want || self.buffer.is_eof() {
            return Ok(());
        }

        self.buffer.compact();
        while !self.buffer.is_eof() && self.buffer.available() < want {
            self.decode_step()?;
        }
        Ok(())
    }

    /// Feeds the decoder once and moves whatever it produced into the buffer.
    fn decode_step(&mut self) -> Result<()> {
        let mut upstream = self.upstream.borrow_mut();
        let mut decoder = self.decoder.borrow_mut();

        if upstream.peek().is_empty() {
            upstream.fill(1)?;
        }
        let input = upstream.peek();
        let exhausted = input.is_empty();
        let buffered = input.len();

        let progress = decoder.decode(input, self.buffer.spare_mut())?;
        upstream.advance(progress.consumed);
        self.buffer.commit(progress.produced);
        let moved = progress.consumed > 0 || progress.produced > 0;
        if moved {
            self.in_frame = true;
        }

        match progress.status {
            DecodeStatus::FrameEnd => {
                self.in_frame = false;
                if upstream.fill(1)? == ReadStatus::EndOfData {
                    self.buffer.mark_eof();
                } else {
                    decoder.reset()?;
                    log::debug!("{}: starting new {} frame", self.name, decoder.method());
                }
            }
            _ if exhausted => {
                if progress.produced == 0 {
                    if self.in_frame {
                        return Err(Error::codec(
                            decoder.method().name(),
                            format!("{}: truncated input", self.name),
                        ));
                    }
                    self.buffer.mark_eof();
                }
            }
            _ if !moved => {
                // The decoder wants more than is buffered upstream.
                upstream.fill(buffered + 1)?;
                if upstream.peek().len() <= buffered {
                    return Err(Error::codec(
                        decoder.method().name(),
                        format!("{}: truncated input", self.name),
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl ByteSource for TransformSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fill(&mut self, want: usize) -> Result<ReadStatus> {
        if self.failed {
            return Err(Error::StreamFinished {
                name: self.name.clone(),
            });
        }
        if let Err(e) = self.fill_buffer(want) {
            self.failed = true;
            return Err(e);
        }
        Ok(self.buffer.status())
    }

    fn peek(&self) -> &[u8] {
        self.buffer.peek()
    }

    fn advance(&mut self, n: usize) {
        self.buffer.advance(n);
    }
}

/// A sink compressing everything appended to it into another sink.
///
/// Compressed output is forwarded downstream as soon as the encoder emits
/// it. [`flush`](ByteSink::flush) ends the current frame and flushes the
/// downstream sink; appending afterwards starts a new frame, so a stream
/// flushed several times decodes as concatenated frames.
///
/// Flushing again with nothing appended since the last flush writes an
/// empty frame and flushes the downstream sink a second time. That is almost
/// always a caller mistake and is logged as a warning.
///
/// Dropping the sink without flushing leaves the last frame incomplete.
pub struct TransformSink {
    name: String,
    downstream: SharedSink,
    encoder: SharedEncoder,
    scratch: Vec<u8>,
    flushed: bool,
    failed: bool,
}

impl std::fmt::Debug for TransformSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformSink")
            .field("name", &self.name)
            .field("flushed", &self.flushed)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

impl TransformSink {
    /// Wraps `downstream`.
    pub fn new(downstream: SharedSink, encoder: SharedEncoder) -> Self {
        let name = downstream.borrow().name().to_string();
        log::debug!(
            "encoding {} as {}",
            name,
            encoder.borrow().method().name()
        );
        Self {
            name,
            downstream,
            encoder,
            scratch: Vec::new(),
            flushed: false,
            failed: false,
        }
    }

    /// Returns true if the sink was flushed and nothing was appended since.
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// Returns the wrapped sink.
    pub fn downstream(&self) -> &SharedSink {
        &self.downstream
    }

    /// Returns the encoder.
    pub fn encoder(&self) -> &SharedEncoder {
        &self.encoder
    }

    fn check(&self) -> Result<()> {
        if self.failed {
            return Err(Error::StreamFinished {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    fn forward(&mut self) -> Result<()> {
        if !self.scratch.is_empty() {
            self.downstream.borrow_mut().append(&self.scratch)?;
            self.scratch.clear();
        }
        Ok(())
    }

    fn append_inner(&mut self, data: &[u8]) -> Result<()> {
        self.encoder.borrow_mut().encode(data, &mut self.scratch)?;
        self.forward()
    }

    fn flush_inner(&mut self) -> Result<()> {
        self.encoder.borrow_mut().finish(&mut self.scratch)?;
        self.forward()?;
        self.downstream.borrow_mut().flush()?;
        self.encoder.borrow_mut().reset()
    }
}

impl ByteSink for TransformSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn append(&mut self, data: &[u8]) -> Result<()> {
        self.check()?;
        if data.is_empty() {
            return Ok(());
        }
        self.flushed = false;
        self.append_inner(data).inspect_err(|_| self.failed = true)
    }

    fn flush(&mut self) -> Result<()> {
        self.check()?;
        if self.flushed {
            log::warn!("{}: flushed again with no new data, writing an empty frame", self.name);
        }
        self.flush_inner().inspect_err(|_| self.failed = true)?;
        self.flushed = true;
        Ok(())
    }
}

/// Creates a source decoding `upstream` with `decoder`.
pub fn create_transform_source(upstream: SharedSource, decoder: SharedDecoder) -> TransformSource {
    TransformSource::new(upstream, decoder)
}

/// Creates a sink encoding into `downstream` with `encoder`.
pub fn create_transform_sink(downstream: SharedSink, encoder: SharedEncoder) -> TransformSink {
    TransformSink::new(downstream, encoder)
}

/// Wraps `upstream` in a decoder if it starts with a known compression magic.
///
/// Data without a recognized magic is returned unchanged.
///
/// # Errors
///
/// Returns [`Error::UnsupportedMethod`] if the magic belongs to a method
/// without a compiled-in codec, [`Error::InvalidArgument`] if fewer leading
/// bytes than a magic needs could be buffered and they match the start of
/// one, and any error from reading the first bytes.
pub fn open_compressed_source(upstream: SharedSource) -> Result<SharedSource> {
    let method = {
        let mut source = upstream.borrow_mut();
        source.fill(MAGIC_PROBE_LEN)?;
        let head = source.peek();
        let method = detect_method(head);
        if method.is_none() && head.len() < MAGIC_PROBE_LEN && is_partial_magic(head) {
            return Err(Error::InvalidArgument(format!(
                "{}: cannot detect compression from {} leading byte(s)",
                source.name(),
                head.len()
            )));
        }
        method
    };

    match method {
        Some(method) => {
            let decoder = build_decoder(method)?;
            Ok(Rc::new(RefCell::new(TransformSource::new(upstream, decoder))))
        }
        None => Ok(upstream),
    }
}

/// Returns true if `head` is a proper prefix of some method's magic.
fn is_partial_magic(head: &[u8]) -> bool {
    !head.is_empty() && Method::ALL.iter().any(|m| m.magic().starts_with(head))
}
