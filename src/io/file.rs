//! File, stdin and stdout streams.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use super::buffer::SourceBuffer;
use super::{ByteSink, ByteSource, ReadStatus, StreamConfig, append_zeros};
use crate::{Error, Result};

/// A source reading from any [`Read`] implementation.
pub struct ReaderSource<R> {
    name: String,
    inner: R,
    buffer: SourceBuffer,
}

/// A source reading from a file.
pub type FileSource = ReaderSource<File>;

/// A source reading from standard input.
pub type StdinSource = ReaderSource<io::Stdin>;

impl<R> std::fmt::Debug for ReaderSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderSource")
            .field("name", &self.name)
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}

impl<R: Read> ReaderSource<R> {
    /// Wraps `inner`, reporting errors under `name`.
    pub fn new(name: impl Into<String>, inner: R, config: &StreamConfig) -> Self {
        Self {
            name: name.into(),
            inner,
            buffer: SourceBuffer::new(config.buffer_size),
        }
    }

    /// Returns a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn fill(&mut self, want: usize) -> Result<ReadStatus> {
        let inner = &mut self.inner;
        self.buffer.fill_with(want, &self.name, |spare| inner.read(spare))
    }

    fn peek(&self) -> &[u8] {
        self.buffer.peek()
    }

    fn advance(&mut self, n: usize) {
        self.buffer.advance(n);
    }
}

/// Opens `path` for reading with the default configuration.
pub fn open_file_source(path: impl AsRef<Path>) -> Result<FileSource> {
    open_file_source_with_config(path, &StreamConfig::default())
}

/// Opens `path` for reading.
///
/// # Errors
///
/// Returns [`Error::Io`] naming the path if it cannot be opened.
pub fn open_file_source_with_config(path: impl AsRef<Path>, config: &StreamConfig) -> Result<FileSource> {
    let path = path.as_ref();
    let name = path.display().to_string();
    let file = File::open(path).map_err(|e| Error::io(&name, e))?;
    log::debug!("opened {} for reading", name);
    Ok(ReaderSource::new(name, file, config))
}

/// Returns a source reading from standard input.
pub fn open_stdin_source() -> StdinSource {
    ReaderSource::new("stdin", io::stdin(), &StreamConfig::default())
}

/// Options for [`open_file_sink`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkOptions {
    /// Truncate an existing file instead of failing.
    pub overwrite: bool,
    /// Leave holes for [`ByteSink::append_sparse`] instead of writing zeros.
    pub sparse: bool,
}

impl SinkOptions {
    /// Creates options that refuse to overwrite and write zeros.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether an existing file may be truncated.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Sets whether zero runs become holes.
    pub fn sparse(mut self, sparse: bool) -> Self {
        self.sparse = sparse;
        self
    }
}

/// A sink writing to a file.
#[derive(Debug)]
pub struct FileSink {
    name: String,
    writer: BufWriter<File>,
    sparse: bool,
    /// Logical length, including any trailing hole.
    len: u64,
    /// Length actually written; differs from `len` after a trailing hole.
    written_end: u64,
}

impl FileSink {
    /// Returns the number of bytes appended, holes included.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl ByteSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn append(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        self.writer
            .write_all(data)
            .map_err(|e| Error::io(&self.name, e))?;
        self.len += data.len() as u64;
        self.written_end = self.len;
        Ok(())
    }

    fn append_sparse(&mut self, len: u64) -> Result<()> {
        if !self.sparse {
            return append_zeros(self, len);
        }
        if len == 0 {
            return Ok(());
        }
        let offset = i64::try_from(len)
            .map_err(|_| Error::InvalidArgument(format!("{}: hole of {} bytes is too large", self.name, len)))?;
        self.writer
            .seek(SeekFrom::Current(offset))
            .map_err(|e| Error::io(&self.name, e))?;
        self.len += len;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| Error::io(&self.name, e))?;
        let file = self.writer.get_ref();
        if self.len > self.written_end {
            // A trailing hole only moved the cursor.
            file.set_len(self.len).map_err(|e| Error::io(&self.name, e))?;
            self.written_end = self.len;
        }
        file.sync_data().map_err(|e| Error::io(&self.name, e))
    }
}

/// Creates `path` for writing with the default configuration.
pub fn open_file_sink(path: impl AsRef<Path>, options: SinkOptions) -> Result<FileSink> {
    open_file_sink_with_config(path, options, &StreamConfig::default())
}

/// Creates `path` for writing.
///
/// # Errors
///
/// Returns [`Error::Io`] naming the path if the file exists and
/// `options.overwrite` is not set, or if it cannot be created.
pub fn open_file_sink_with_config(
    path: impl AsRef<Path>,
    options: SinkOptions,
    config: &StreamConfig,
) -> Result<FileSink> {
    let path = path.as_ref();
    let name = path.display().to_string();

    let mut open = OpenOptions::new();
    open.write(true);
    if options.overwrite {
        open.create(true).truncate(true);
    } else {
        open.create_new(true);
    }
    let file = open.open(path).map_err(|e| Error::io(&name, e))?;
    log::debug!("opened {} for writing", name);

    Ok(FileSink {
        name,
        writer: BufWriter::with_capacity(config.sink_buffer_size, file),
        sparse: options.sparse,
        len: 0,
        written_end: 0,
    })
}

/// A sink writing to any [`Write`] implementation.
pub struct WriterSink<W: Write> {
    name: String,
    inner: W,
}

/// A sink writing to standard output.
pub type StdoutSink = WriterSink<io::Stdout>;

impl<W: Write> std::fmt::Debug for WriterSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterSink")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<W: Write> WriterSink<W> {
    /// Wraps `inner`, reporting errors under `name`.
    pub fn new(name: impl Into<String>, inner: W) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }

    /// Consumes the sink and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> ByteSink for WriterSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn append(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data).map_err(|e| Error::io(&self.name, e))
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush().map_err(|e| Error::io(&self.name, e))
    }
}

/// Returns a sink writing to standard output.
pub fn open_stdout_sink() -> StdoutSink {
    WriterSink::new("stdout", io::stdout())
}
