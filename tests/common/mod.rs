//! Shared test utilities for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use sqimage::codec::{EncoderOptions, Method, build_decoder, build_encoder};
use sqimage::io::{
    ByteSink, ByteSource, MemorySink, MemorySource, SharedSink, SharedSource, StreamConfig,
    TransformSink, TransformSource,
};

/// Methods with a compiled-in codec.
pub fn supported_methods() -> Vec<Method> {
    Method::ALL
        .into_iter()
        .filter(|m| m.is_supported())
        .collect()
}

/// Test payloads.
pub mod data {
    /// Highly compressible text.
    pub fn text() -> Vec<u8> {
        b"squashfs images pack directory trees into a single read-only file. ".repeat(200)
    }

    /// Random, incompressible data (deterministically seeded).
    pub fn random(len: usize) -> Vec<u8> {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(0x5EED_1A6E_0F00_0001);
        let mut data = vec![0u8; len];
        rng.fill(&mut data[..]);
        data
    }

    /// Short known plaintext.
    pub fn small() -> Vec<u8> {
        b"Hello, World!".to_vec()
    }
}

/// Compresses `data` as one frame, appending it in `chunk`-sized pieces.
///
/// Returns the compressed bytes and the number of times the memory sink was
/// flushed.
pub fn compress_chunked(method: Method, data: &[u8], chunk: usize) -> (Vec<u8>, usize) {
    let out = Rc::new(RefCell::new(MemorySink::new("compressed")));
    let downstream: SharedSink = out.clone();
    let encoder = build_encoder(method, &EncoderOptions::default()).unwrap();

    let mut sink = TransformSink::new(downstream, encoder);
    for piece in data.chunks(chunk.max(1)) {
        sink.append(piece).unwrap();
    }
    sink.flush().unwrap();
    drop(sink);

    let out = out.borrow();
    (out.contents().to_vec(), out.flush_count())
}

/// Compresses `data` as one frame.
pub fn compress(method: Method, data: &[u8]) -> Vec<u8> {
    compress_chunked(method, data, data.len()).0
}

/// Builds a decoding source over `compressed` with a `window`-byte upstream
/// window and a `window`-byte output buffer.
pub fn decoding_source(method: Method, compressed: Vec<u8>, window: usize) -> TransformSource {
    let upstream: SharedSource = Rc::new(RefCell::new(MemorySource::with_window(
        "compressed",
        compressed,
        window,
    )));
    let config = StreamConfig::new().buffer_size(window);
    TransformSource::with_config(upstream, build_decoder(method).unwrap(), &config)
}

/// Decodes `compressed`, reading `read_size` bytes at a time.
pub fn decompress(
    method: Method,
    compressed: Vec<u8>,
    window: usize,
    read_size: usize,
) -> sqimage::Result<Vec<u8>> {
    let mut source = decoding_source(method, compressed, window);
    let mut out = Vec::new();
    let mut buf = vec![0u8; read_size.max(1)];
    loop {
        let n = source.read(&mut buf)?;
        if n == 0 {
            return Ok(out);
        }
        out.extend_from_slice(&buf[..n]);
    }
}
