//! bzip2 codec implementation.

use bzip2::{Action, Compress, Compression, Decompress, Status};

use super::{DecodeProgress, Decoder, Encoder, Method, status_from};
use crate::{Error, Result};

const NAME: &str = "bzip2";

/// Default work factor used by the reference implementation.
const WORK_FACTOR: u32 = 30;

const CHUNK_SIZE: usize = 32 * 1024;

/// bzip2 decoder.
pub struct Bzip2Decoder {
    inner: Decompress,
}

impl std::fmt::Debug for Bzip2Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bzip2Decoder")
            .field("total_in", &self.inner.total_in())
            .field("total_out", &self.inner.total_out())
            .finish()
    }
}

impl Bzip2Decoder {
    /// Creates a new bzip2 decoder.
    pub fn new() -> Self {
        Self {
            inner: Decompress::new(false),
        }
    }
}

impl Default for Bzip2Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for Bzip2Decoder {
    fn method(&self) -> Method {
        Method::Bzip2
    }

    fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<DecodeProgress> {
        let in_before = self.inner.total_in();
        let out_before = self.inner.total_out();

        let status = self
            .inner
            .decompress(input, output)
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
        self.inner = Decompress::new(false);
        Ok(())
    }
}

/// bzip2 encoder.
pub struct Bzip2Encoder {
    inner: Compress,
    level: u32,
}

impl std::fmt::Debug for Bzip2Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bzip2Encoder")
            .field("level", &self.level)
            .field("total_in", &self.inner.total_in())
            .finish()
    }
}

impl Bzip2Encoder {
    /// Creates a new bzip2 encoder with the given block size level (1-9).
    pub fn new(level: u32) -> Self {
        let level = level.clamp(1, 9);
        Self {
            inner: Compress::new(Compression::new(level), WORK_FACTOR),
            level,
        }
    }
}

impl Encoder for Bzip2Encoder {
    fn method(&self) -> Method {
        Method::Bzip2
    }

    fn encode(&mut self, mut input: &[u8], output: &mut Vec<u8>) -> Result<()> {
        while !input.is_empty() {
            output.reserve(CHUNK_SIZE);
            let in_before = self.inner.total_in();
            self.inner
                .compress_vec(input, output, Action::Run)
                .map_err(|e| Error::codec(NAME, e))?;
            input = &input[(self.inner.total_in() - in_before) as usize..];
        }
        Ok(())
    }

    fn finish(&mut self, output: &mut Vec<u8>) -> Result<()> {
        loop {
            output.reserve(CHUNK_SIZE);
            let status = self
                .inner
                .compress_vec(&[], output, Action::Finish)
                .map_err(|e| Error::codec(NAME, e))?;
            if status == Status::StreamEnd {
                return Ok(());
            }
        }
    }

    fn reset(&mut self) -> Result<()> {
        self.inner = Compress::new(Compression::new(self.level), WORK_FACTOR);
        Ok(())
    }
}
