//! Fuzz target for decoding arbitrary bytes through a transform source.
//!
//! Run with: cargo +nightly fuzz run transform_decode
//!
//! The first byte selects the codec and the buffer size; the rest is fed to
//! the decoder. Decoding must either succeed or fail with an error, never
//! panic or loop, and a failed stream must stay failed.

#![no_main]

use std::cell::RefCell;
use std::rc::Rc;

use libfuzzer_sys::fuzz_target;
use sqimage::codec::{Method, build_decoder};
use sqimage::io::{ByteSource, MemorySource, SharedSource, StreamConfig, TransformSource};

/// Cap on decoded output, to keep decompression bombs cheap.
const MAX_OUTPUT: usize = 16 * 1024 * 1024;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, payload)) = data.split_first() else {
        return;
    };
    let method = match selector % 3 {
        0 => Method::Gzip,
        1 => Method::Bzip2,
        _ => Method::Zstd,
    };
    let window = 1 + usize::from(selector >> 2) * 64;

    let upstream: SharedSource = Rc::new(RefCell::new(MemorySource::with_window(
        "fuzz",
        payload.to_vec(),
        window,
    )));
    let decoder = build_decoder(method).expect("codec compiled in");
    let config = StreamConfig::new().buffer_size(window);
    let mut source = TransformSource::with_config(upstream, decoder, &config);

    let mut total = 0;
    let mut buf = [0u8; 4096];
    loop {
        match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                if total > MAX_OUTPUT {
                    break;
                }
            }
            Err(_) => {
                assert!(source.fill(1).is_err());
                break;
            }
        }
    }
});
