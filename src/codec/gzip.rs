//! gzip codec implementation.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use super::{DecodeProgress, Decoder, Encoder, Method, status_from};
use crate::{Error, Result};

const NAME: &str = "gzip";

/// zlib window size; 15 is the only value gzip streams use in practice.
const WINDOW_BITS: u8 = 15;

/// Output reserved per encoder call.
const CHUNK_SIZE: usize = 32 * 1024;

/// gzip decoder.
pub struct GzipDecoder {
    inner: Decompress,
}

impl std::fmt::Debug for GzipDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GzipDecoder")
            .field("total_in", &self.inner.total_in())
            .field("total_out", &self.inner.total_out())
            .finish()
    }
}

impl GzipDecoder {
    /// Creates a new gzip decoder.
    pub fn new() -> Self {
        Self {
            inner: Decompress::new_gzip(WINDOW_BITS),
        }
    }
}

impl Default for GzipDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for GzipDecoder {
    fn method(&self) -> Method {
        Method::Gzip
    }

    fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<DecodeProgress> {
        let in_before = self.inner.total_in();
        let out_before = self.inner.total_out();

        let status = self
            .inner
            .decompress(input, output, FlushDecompress::None)
            .map_err(|e| Error::codec(NAME, e))?;

        let consumed = (self.inner.total_in() - in_before) as usize;
        let produced = (self.inner.total_out() - out_before) as usize;

        Ok(DecodeProgress {
            consumed,
            produced,
            status: status_from(status == Status::StreamEnd, produced, output.len()),
        })
    }

    fn reset(&mut self) -> Result<()> {
        // Decompress::reset takes a zlib-header flag and would drop the gzip
        // wrapper, so start from a fresh state instead.
        self.inner = Decompress::new_gzip(WINDOW_BITS);
        Ok(())
    }
}

/// gzip encoder.
pub struct GzipEncoder {
    inner: Compress,
    level: u32,
}

impl std::fmt::Debug for GzipEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GzipEncoder")
            .field("level", &self.level)
            .field("total_in", &self.inner.total_in())
            .finish()
    }
}

impl GzipEncoder {
    /// Creates a new gzip encoder with the given level (0-9).
    pub fn new(level: u32) -> Self {
        let level = level.min(9);
        Self {
            inner: Compress::new_gzip(Compression::new(level), WINDOW_BITS),
            level,
        }
    }

    fn run(&mut self, mut input: &[u8], output: &mut Vec<u8>, flush: FlushCompress) -> Result<Status> {
        loop {
            output.reserve(CHUNK_SIZE);
            let in_before = self.inner.total_in();
            let status = self
                .inner
                .compress_vec(input, output, flush)
                .map_err(|e| Error::codec(NAME, e))?;
            input = &input[(self.inner.total_in() - in_before) as usize..];

            let done = match flush {
                FlushCompress::Finish => status == Status::StreamEnd,
                _ => input.is_empty(),
            };
            if done {
                return Ok(status);
            }
        }
    }
}

impl Encoder for GzipEncoder {
    fn method(&self) -> Method {
        Method::Gzip
    }

    fn encode(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
        if input.is_empty() {
            return Ok(());
        }
        self.run(input, output, FlushCompress::None)?;
        Ok(())
    }

    fn finish(&mut self, output: &mut Vec<u8>) -> Result<()> {
        self.run(&[], output, FlushCompress::Finish)?;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.inner = Compress::new_gzip(Compression::new(self.level), WINDOW_BITS);
        Ok(())
    }
}
