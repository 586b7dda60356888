//! Fixed-capacity read buffer shared by every source implementation.

use std::io;

use super::ReadStatus;
use crate::{Error, Result};

/// A fixed-capacity window over data pulled from some backing medium.
///
/// Unread bytes live in `data[offset..used]`. Before more data is read in,
/// the unread region is moved to the front so the whole spare tail is
/// available to the next read.
pub(crate) struct SourceBuffer {
    data: Box<[u8]>,
    offset: usize,
    used: usize,
    eof: bool,
}

impl std::fmt::Debug for SourceBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceBuffer")
            .field("capacity", &self.data.len())
            .field("buffered", &self.available())
            .field("eof", &self.eof)
            .finish()
    }
}

impl SourceBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity.max(1)].into_boxed_slice(),
            offset: 0,
            used: 0,
            eof: false,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn available(&self) -> usize {
        self.used - self.offset
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.eof
    }

    pub(crate) fn mark_eof(&mut self) {
        self.eof = true;
    }

    pub(crate) fn peek(&self) -> &[u8] {
        &self.data[self.offset..self.used]
    }

    pub(crate) fn advance(&mut self, n: usize) {
        assert!(
            n <= self.available(),
            "advance({}) past the {} buffered bytes",
            n,
            self.available()
        );
        self.offset += n;
        if self.offset == self.used {
            self.offset = 0;
            self.used = 0;
        }
    }

    /// Moves the unread bytes to the start of the buffer.
    pub(crate) fn compact(&mut self) {
        if self.offset > 0 {
            self.data.copy_within(self.offset..self.used, 0);
            self.used -= self.offset;
            self.offset = 0;
        }
    }

    /// Writable tail of the buffer, after the unread bytes.
    pub(crate) fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.used..]
    }

    /// Marks `n` bytes written into [`spare_mut`](Self::spare_mut) as unread data.
    pub(crate) fn commit(&mut self, n: usize) {
        debug_assert!(self.used + n <= self.data.len());
        self.used += n;
    }

    /// Clamps a fill request to what the buffer can hold.
    pub(crate) fn clamp_want(&self, want: usize) -> usize {
        want.clamp(1, self.capacity())
    }

    /// Status to report once a fill attempt is over.
    pub(crate) fn status(&self) -> ReadStatus {
        if self.eof && self.available() == 0 {
            ReadStatus::EndOfData
        } else {
            ReadStatus::Ready
        }
    }

    /// Reads from `read` until at least `want` bytes are buffered or the
    /// medium reports end of data.
    ///
    /// A read returning 0 bytes marks the buffer as exhausted for good.
    /// `ErrorKind::Interrupted` is retried; any other error is returned
    /// tagged with `name`.
    pub(crate) fn fill_with<F>(&mut self, want: usize, name: &str, mut read: F) -> Result<ReadStatus>
    where
        F: FnMut(&mut [u8]) -> io::Result<usize>,
    {
        let want = self.clamp_want(want);

        if self.available() < want && !self.eof {
            self.compact();
            while !self.eof && self.available() < want {
                match read(self.spare_mut()) {
                    Ok(0) => self.eof = true,
                    Ok(n) => self.commit(n),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(Error::io(name, e)),
                }
            }
        }

        Ok(self.status())
    }
}
