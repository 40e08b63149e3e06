//! Fixed-capacity byte buffer with separate read and write cursors.
//!
//! Sockets read straight into the writable tail; parsers consume from the
//! readable region between `read_pos` and `used`. Consumed bytes are only
//! reclaimed by [`ByteStream::realign`], which parsers call whenever they
//! block on missing input.

use memchr::memmem;

/// Default per-socket buffer size.
pub const DEFAULT_CAPACITY: usize = 4096;

#[derive(Debug)]
pub struct ByteStream {
    buffer: Vec<u8>,
    used: usize,
    read_pos: usize,
}

impl ByteStream {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity],
            used: 0,
            read_pos: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Number of unread bytes.
    pub fn len(&self) -> usize {
        self.used - self.read_pos
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn writable_size(&self) -> usize {
        self.capacity() - self.used
    }

    /// Free tail of the buffer, for a direct `read(2)` into it.
    pub fn writable_buffer(&mut self) -> &mut [u8] {
        &mut self.buffer[self.used..]
    }

    /// Commits `count` bytes written into [`writable_buffer`](Self::writable_buffer).
    pub fn advance_written(&mut self, count: usize) {
        self.used = (self.used + count).min(self.capacity());
    }

    /// Up to `count` unread bytes, without consuming them.
    pub fn peek(&self, count: usize) -> &[u8] {
        let end = self.read_pos + count.min(self.len());
        &self.buffer[self.read_pos..end]
    }

    /// All unread bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[self.read_pos..self.used]
    }

    /// Offset of `delimiter` within the unread region.
    pub fn find(&self, delimiter: &[u8]) -> Option<usize> {
        match delimiter {
            [] => Some(0),
            [byte] => memchr::memchr(*byte, self.as_slice()),
            _ => memmem::find(self.as_slice(), delimiter),
        }
    }

    pub fn skip(&mut self, count: usize) {
        self.read_pos += count.min(self.len());
    }

    /// Consumes and returns up to `count` bytes.
    pub fn take(&mut self, count: usize) -> &[u8] {
        let start = self.read_pos;
        self.skip(count);
        &self.buffer[start..self.read_pos]
    }

    /// Consumes everything before `delimiter`.
    ///
    /// Returns `(prefix, true)` when the whole delimiter is present; the
    /// delimiter itself is left in the stream for the caller to skip. When
    /// it is missing the call returns `found = false` and consumes the
    /// unread region, except for a trailing partial match of the delimiter
    /// which stays put so the next fill can complete it.
    pub fn take_until(&mut self, delimiter: &[u8]) -> (&[u8], bool) {
        if let Some(pos) = self.find(delimiter) {
            return (self.take(pos), true);
        }

        let keep_from = self.partial_match_start(delimiter);
        (self.take(keep_from), false)
    }

    /// Earliest offset whose suffix of the unread region is a proper prefix
    /// of `delimiter`, or the region length if there is none.
    fn partial_match_start(&self, delimiter: &[u8]) -> usize {
        let data = self.as_slice();
        if delimiter.len() < 2 {
            return data.len();
        }

        let first_candidate = data.len().saturating_sub(delimiter.len() - 1);
        (first_candidate..data.len())
            .find(|&pos| delimiter.starts_with(&data[pos..]))
            .unwrap_or(data.len())
    }

    /// Appends as much of `data` as fits and returns how much that was.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let count = data.len().min(self.writable_size());
        self.buffer[self.used..self.used + count].copy_from_slice(&data[..count]);
        self.used += count;
        count
    }

    /// Moves the unread tail to offset 0, reclaiming consumed space.
    pub fn realign(&mut self) {
        if self.read_pos == 0 {
            return;
        }
        self.buffer.copy_within(self.read_pos..self.used, 0);
        self.used -= self.read_pos;
        self.read_pos = 0;
    }
}

impl Default for ByteStream {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl From<&[u8]> for ByteStream {
    fn from(data: &[u8]) -> Self {
        Self {
            buffer: data.to_vec(),
            used: data.len(),
            read_pos: 0,
        }
    }
}

impl From<&str> for ByteStream {
    fn from(data: &str) -> Self {
        Self::from(data.as_bytes())
    }
}
