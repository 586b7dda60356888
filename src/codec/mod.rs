//! Compression codec infrastructure.
//!
//! This module provides the push-style [`Decoder`] and [`Encoder`] traits
//! that [`TransformSource`](crate::io::TransformSource) and
//! [`TransformSink`](crate::io::TransformSink) drive, plus the concrete
//! gzip, bzip2 and zstd codecs.
//!
//! Codecs never pull or push data themselves. A decoder is handed whatever
//! compressed bytes the caller has and a slice to write into, and reports how
//! much it consumed, how much it produced and whether the current frame ended.
//! An encoder appends compressed bytes to a caller-provided `Vec`.

#[cfg(feature = "gzip")]
pub mod gzip;

#[cfg(feature = "bzip2")]
pub mod bzip2;

#[cfg(feature = "zstd")]
pub mod zstd;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::{Error, Result};

#[cfg(feature = "gzip")]
pub use gzip::{GzipDecoder, GzipEncoder};

#[cfg(feature = "bzip2")]
pub use self::bzip2::{Bzip2Decoder, Bzip2Encoder};

#[cfg(feature = "zstd")]
pub use self::zstd::{ZstdDecoder, ZstdEncoder};

/// What a decoder needs next after a [`Decoder::decode`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// All usable input was consumed; more input is required to continue.
    NeedsInput,
    /// The output slice was filled; call again to get more output.
    OutputFull,
    /// The current compressed frame ended and all of its output was produced.
    ///
    /// Input after the end of the frame is not consumed. Call
    /// [`Decoder::reset`] before feeding the next frame.
    FrameEnd,
}

/// Result of one [`Decoder::decode`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeProgress {
    /// Number of input bytes consumed.
    pub consumed: usize,
    /// Number of bytes written to the output slice.
    pub produced: usize,
    /// What the decoder needs next.
    pub status: DecodeStatus,
}

/// A stateful decompressor.
pub trait Decoder {
    /// Returns the compression method of this decoder.
    fn method(&self) -> Method;

    /// Decompresses as much of `input` into `output` as possible.
    ///
    /// `output` is never empty when called from the stream layer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Codec`] if the input is not valid compressed data.
    /// The decoder must not be used afterwards except through
    /// [`reset`](Self::reset).
    fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<DecodeProgress>;

    /// Prepares the decoder for a new, independent frame.
    fn reset(&mut self) -> Result<()>;
}

/// A stateful compressor.
pub trait Encoder {
    /// Returns the compression method of this encoder.
    fn method(&self) -> Method;

    /// Compresses all of `input`, appending whatever output the codec emits.
    ///
    /// The codec may hold back data internally; nothing is lost until
    /// [`finish`](Self::finish) is called.
    fn encode(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<()>;

    /// Ends the current frame, appending all remaining output.
    ///
    /// Everything encoded so far can be decoded in isolation once this
    /// returns. Call [`reset`](Self::reset) before encoding another frame.
    fn finish(&mut self, output: &mut Vec<u8>) -> Result<()>;

    /// Prepares the encoder for a new, independent frame.
    fn reset(&mut self) -> Result<()>;
}

/// A decoder shared between a stream and its creator.
pub type SharedDecoder = Rc<RefCell<dyn Decoder>>;

/// An encoder shared between a stream and its creator.
pub type SharedEncoder = Rc<RefCell<dyn Encoder>>;

/// Compression methods known to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Method {
    /// gzip (RFC 1952).
    Gzip,
    /// bzip2.
    Bzip2,
    /// Zstandard.
    Zstd,
    /// xz. Recognized by [`detect_method`] only; no codec is provided.
    Xz,
}

impl Method {
    /// All known methods.
    pub const ALL: [Method; 4] = [Method::Gzip, Method::Bzip2, Method::Zstd, Method::Xz];

    /// Returns a human-readable name for this method.
    pub fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Zstd => "zstd",
            Self::Xz => "xz",
        }
    }

    /// Returns the magic bytes every frame of this method starts with.
    pub fn magic(self) -> &'static [u8] {
        match self {
            Self::Gzip => &[0x1f, 0x8b, 0x08],
            Self::Bzip2 => b"BZh",
            Self::Zstd => &[0x28, 0xb5, 0x2f, 0xfd],
            Self::Xz => &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00],
        }
    }

    /// Returns true if a codec for this method is compiled in.
    pub fn is_supported(self) -> bool {
        match self {
            Self::Gzip => cfg!(feature = "gzip"),
            Self::Bzip2 => cfg!(feature = "bzip2"),
            Self::Zstd => cfg!(feature = "zstd"),
            Self::Xz => false,
        }
    }

    /// Returns the valid compression level range (inclusive).
    pub fn level_range(self) -> (i32, i32) {
        match self {
            Self::Gzip => (0, 9),
            Self::Bzip2 => (1, 9),
            Self::Zstd => (1, 22),
            Self::Xz => (0, 9),
        }
    }

    /// Returns the compression level used when none is configured.
    pub fn default_level(self) -> i32 {
        match self {
            Self::Gzip => 6,
            Self::Bzip2 => 9,
            Self::Zstd => 3,
            Self::Xz => 6,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnsupportedMethod { name: s.to_string() })
    }
}

/// Identifies the compression method from the first bytes of a stream.
///
/// Returns `None` if `data` does not start with any known magic. At least
/// six bytes are needed to recognize every method.
pub fn detect_method(data: &[u8]) -> Option<Method> {
    Method::ALL.into_iter().find(|m| data.starts_with(m.magic()))
}

/// Encoder options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderOptions {
    /// Compression level; `None` selects the method's default.
    pub level: Option<i32>,
}

impl EncoderOptions {
    /// Creates options with the default level.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options with the given compression level.
    pub fn with_level(level: i32) -> Self {
        Self { level: Some(level) }
    }

    /// Returns the effective level for `method`, clamped to its valid range.
    pub fn level_for(&self, method: Method) -> i32 {
        let (min, max) = method.level_range();
        self.level
            .unwrap_or_else(|| method.default_level())
            .clamp(min, max)
    }
}

/// Builds a decoder for the given method.
///
/// # Errors
///
/// Returns [`Error::UnsupportedMethod`] if no codec for `method` is compiled in.
pub fn build_decoder(method: Method) -> Result<SharedDecoder> {
    match method {
        #[cfg(feature = "gzip")]
        Method::Gzip => Ok(Rc::new(RefCell::new(GzipDecoder::new()))),

        #[cfg(feature = "bzip2")]
        Method::Bzip2 => Ok(Rc::new(RefCell::new(Bzip2Decoder::new()))),

        #[cfg(feature = "zstd")]
        Method::Zstd => Ok(Rc::new(RefCell::new(ZstdDecoder::new()?))),

        #[allow(unreachable_patterns)]
        other => Err(Error::UnsupportedMethod {
            name: other.name().to_string(),
        }),
    }
}

/// Builds an encoder for the given method.
///
/// # Errors
///
/// Returns [`Error::UnsupportedMethod`] if no codec for `method` is compiled in.
pub fn build_encoder(method: Method, options: &EncoderOptions) -> Result<SharedEncoder> {
    #[allow(unused_variables)]
    let level = options.level_for(method);

    match method {
        #[cfg(feature = "gzip")]
        Method::Gzip => Ok(Rc::new(RefCell::new(GzipEncoder::new(level as u32)))),

        #[cfg(feature = "bzip2")]
        Method::Bzip2 => Ok(Rc::new(RefCell::new(Bzip2Encoder::new(level as u32)))),

        #[cfg(feature = "zstd")]
        Method::Zstd => Ok(Rc::new(RefCell::new(ZstdEncoder::new(level)?))),

        #[allow(unreachable_patterns)]
        other => Err(Error::UnsupportedMethod {
            name: other.name().to_string(),
        }),
    }
}

/// Classifies the outcome of a decode call from the progress it made.
#[cfg_attr(
    not(any(feature = "gzip", feature = "bzip2", feature = "zstd")),
    allow(dead_code)
)]
pub(crate) fn status_from(frame_end: bool, produced: usize, capacity: usize) -> DecodeStatus {
    if frame_end {
        DecodeStatus::FrameEnd
    } else if produced == capacity {
        DecodeStatus::OutputFull
    } else {
        DecodeStatus::NeedsInput
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_method() {
        assert_eq!(detect_method(&[0x1f, 0x8b, 0x08, 0x00]), Some(Method::Gzip));
        assert_eq!(detect_method(b"BZh91AY&SY"), Some(Method::Bzip2));
        assert_eq!(
            detect_method(&[0x28, 0xb5, 0x2f, 0xfd, 0x04]),
            Some(Method::Zstd)
        );
        assert_eq!(
            detect_method(&[0xfd, b'7', b'z', b'X', b'Z', 0x00, 0x00]),
            Some(Method::Xz)
        );
        assert_eq!(detect_method(b"plain text"), None);
        assert_eq!(detect_method(&[0x1f]), None);
        assert_eq!(detect_method(&[]), None);
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("gzip".parse::<Method>().unwrap(), Method::Gzip);
        assert_eq!("ZSTD".parse::<Method>().unwrap(), Method::Zstd);
        assert!(matches!(
            "lzo".parse::<Method>(),
            Err(Error::UnsupportedMethod { .. })
        ));
    }

    #[test]
    fn test_encoder_options_level() {
        let opts = EncoderOptions::default();
        assert_eq!(opts.level_for(Method::Gzip), 6);
        assert_eq!(opts.level_for(Method::Bzip2), 9);
        assert_eq!(opts.level_for(Method::Zstd), 3);

        let opts = EncoderOptions::with_level(100);
        assert_eq!(opts.level_for(Method::Gzip), 9);
        assert_eq!(opts.level_for(Method::Zstd), 22);

        let opts = EncoderOptions::with_level(0);
        assert_eq!(opts.level_for(Method::Bzip2), 1); // Clamped
    }

    #[test]
    fn test_xz_unsupported() {
        assert!(!Method::Xz.is_supported());
        assert!(matches!(
            build_decoder(Method::Xz),
            Err(Error::UnsupportedMethod { .. })
        ));
        assert!(matches!(
            build_encoder(Method::Xz, &EncoderOptions::new()),
            Err(Error::UnsupportedMethod { .. })
        ));
    }

    #[test]
    fn test_status_from() {
        assert_eq!(status_from(true, 10, 10), DecodeStatus::FrameEnd);
        assert_eq!(status_from(false, 10, 10), DecodeStatus::OutputFull);
        assert_eq!(status_from(false, 3, 10), DecodeStatus::NeedsInput);
    }
}
