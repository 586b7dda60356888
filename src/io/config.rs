//! Configuration for stream buffering.

/// Default capacity of a source buffer (256 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;

/// Default write buffer of a file sink (64 KiB).
pub const DEFAULT_SINK_BUFFER_SIZE: usize = 64 * 1024;

/// Buffer sizes used when opening streams.
///
/// # Example
///
/// ```rust
/// use sqimage::io::StreamConfig;
///
/// let config = StreamConfig::new()
///     .buffer_size(4096)
///     .sink_buffer_size(8192);
/// assert_eq!(config.buffer_size, 4096);
///
/// // A zero-sized buffer could never make progress.
/// assert_eq!(StreamConfig::new().buffer_size(0).buffer_size, 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Capacity of the fixed-size buffer every source reads into.
    ///
    /// This is also the largest amount a single `fill` can guarantee.
    /// Default: 256 KiB.
    pub buffer_size: usize,

    /// Size of the write buffer in front of a file sink.
    ///
    /// Default: 64 KiB.
    pub sink_buffer_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            sink_buffer_size: DEFAULT_SINK_BUFFER_SIZE,
        }
    }
}

impl StreamConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration with small buffers, for memory-constrained use.
    pub fn low_memory() -> Self {
        Self {
            buffer_size: 16 * 1024,
            sink_buffer_size: 8 * 1024,
        }
    }

    /// Sets the source buffer capacity (at least 1).
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Sets the file sink write buffer size.
    pub fn sink_buffer_size(mut self, size: usize) -> Self {
        self.sink_buffer_size = size;
        self
    }
}
