//! Zstandard codec implementation.

use zstd::stream::raw::{Decoder as RawDecoder, Encoder as RawEncoder, InBuffer, Operation, OutBuffer};

use super::{DecodeProgress, Decoder, Encoder, Method, status_from};
use crate::{Error, Result};

const NAME: &str = "zstd";

const CHUNK_SIZE: usize = 32 * 1024;

/// Zstandard decoder.
pub struct ZstdDecoder {
    inner: RawDecoder<'static>,
}

impl std::fmt::Debug for ZstdDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZstdDecoder").finish_non_exhaustive()
    }
}

impl ZstdDecoder {
    /// Creates a new Zstandard decoder.
    pub fn new() -> Result<Self> {
        let inner = RawDecoder::new().map_err(|e| Error::codec(NAME, e))?;
        Ok(Self { inner })
    }
}

impl Decoder for ZstdDecoder {
    fn method(&self) -> Method {
        Method::Zstd
    }

    fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<DecodeProgress> {
        let capacity = output.len();
        let mut src = InBuffer::around(input);
        let mut dst = OutBuffer::around(output);

        let hint = self
            .inner
            .run(&mut src, &mut dst)
            .map_err(|e| Error::codec(NAME, e))?;

        let produced = dst.pos();
        Ok(DecodeProgress {
            consumed: src.pos(),
            produced,
            status: status_from(hint == 0, produced, capacity),
        })
    }

    fn reset(&mut self) -> Result<()> {
        self.inner.reinit().map_err(|e| Error::codec(NAME, e))
    }
}

/// Zstandard encoder.
pub struct ZstdEncoder {
    inner: RawEncoder<'static>,
    level: i32,
}

impl std::fmt::Debug for ZstdEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZstdEncoder")
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

impl ZstdEncoder {
    /// Creates a new Zstandard encoder with the given level (1-22).
    pub fn new(level: i32) -> Result<Self> {
        let level = level.clamp(1, 22);
        let inner = RawEncoder::new(level).map_err(|e| Error::codec(NAME, e))?;
        Ok(Self { inner, level })
    }
}

impl Encoder for ZstdEncoder {
    fn method(&self) -> Method {
        Method::Zstd
    }

    fn encode(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()> {
        let mut chunk = vec![0u8; CHUNK_SIZE];
        let mut src = InBuffer::around(input);

        while src.pos() < input.len() {
            let written = {
                let mut dst = OutBuffer::around(&mut chunk[..]);
                self.inner
                    .run(&mut src, &mut dst)
                    .map_err(|e| Error::codec(NAME, e))?;
                dst.pos()
            };
            output.extend_from_slice(&chunk[..written]);
        }
        Ok(())
    }

    fn finish(&mut self, output: &mut Vec<u8>) -> Result<()> {
        let mut chunk = vec![0u8; CHUNK_SIZE];

        loop {
            let (remaining, written) = {
                let mut dst = OutBuffer::around(&mut chunk[..]);
                let remaining = self
                    .inner
                    .finish(&mut dst, true)
                    .map_err(|e| Error::codec(NAME, e))?;
                (remaining, dst.pos())
            };
            output.extend_from_slice(&chunk[..written]);
            if remaining == 0 {
                return Ok(());
            }
        }
    }

    fn reset(&mut self) -> Result<()> {
        self.inner.reinit().map_err(|e| Error::codec(NAME, e))
    }
}
