//! The sliding scan window.
//!
//! A growable byte window fed by bounded reads from the source stream. The
//! parser consumes a prefix of the window as an emitted chunk while the
//! unconsumed suffix is compacted to the front for the next scan, so memory
//! stays bounded by the window size even though the source may be unbounded.
//! The window doubles on demand when a structural unit (a header line) does
//! not fit, and shrinks back once the oversized region has been consumed.

use std::io::{ErrorKind, Read};

use crate::error::Error;

pub(crate) struct ScanBuffer<R> {
    /// `None` once the source reported end-of-stream and was released.
    source: Option<R>,
    data: Vec<u8>,
    len: usize,
    base_capacity: usize,
    total_read: u64,
    max_total: u64,
}

impl<R: Read> ScanBuffer<R> {
    pub(crate) fn new(source: R, base_capacity: usize, max_total: u64) -> Self {
        Self {
            source: Some(source),
            data: vec![0; base_capacity],
            len: 0,
            base_capacity,
            total_read: 0,
            max_total,
        }
    }

    /// Bytes currently in the window.
    pub(crate) fn filled(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Whether the source has been exhausted and released.
    pub(crate) fn at_eof(&self) -> bool {
        self.source.is_none()
    }

    /// Reads from the source until the window is full or the source is
    /// exhausted, enforcing the total-bytes cap.
    pub(crate) fn fill(&mut self) -> Result<(), Error> {
        while self.len < self.data.len() {
            let Some(source) = self.source.as_mut() else {
                break;
            };
            let read = match source.read(&mut self.data[self.len..]) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if read == 0 {
                self.close_source();
                break;
            }
            self.len += read;
            self.total_read += read as u64;
            if self.total_read > self.max_total {
                return Err(Error::SizeLimitExceeded {
                    limit: self.max_total,
                });
            }
        }
        Ok(())
    }

    /// Emits the first `chunk` bytes and keeps the last `keep` bytes,
    /// compacted to the front of the window. Bytes between the two regions
    /// are dropped.
    pub(crate) fn take(&mut self, chunk: usize, keep: usize) -> Vec<u8> {
        debug_assert!(chunk <= self.len);
        debug_assert!(keep <= self.len);
        let emitted = self.data[..chunk].to_vec();
        self.data.copy_within(self.len - keep..self.len, 0);
        self.len = keep;
        self.shrink();
        emitted
    }

    /// Drops the first `n` bytes without emitting them.
    pub(crate) fn discard(&mut self, n: usize) {
        debug_assert!(n <= self.len);
        self.data.copy_within(n..self.len, 0);
        self.len -= n;
        self.shrink();
    }

    /// Doubles the window and refills it. Used when a header line does not
    /// fit in the current window.
    pub(crate) fn grow(&mut self) -> Result<(), Error> {
        let doubled = self.data.len() * 2;
        self.data.resize(doubled, 0);
        self.fill()
    }

    /// Releases the source; subsequent fills are no-ops.
    pub(crate) fn close_source(&mut self) {
        self.source = None;
    }

    fn shrink(&mut self) {
        if self.data.len() > self.base_capacity && self.len <= self.base_capacity {
            self.data.truncate(self.base_capacity);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn buffer(bytes: &[u8], capacity: usize) -> ScanBuffer<Cursor<Vec<u8>>> {
        ScanBuffer::new(Cursor::new(bytes.to_vec()), capacity, u64::MAX)
    }

    #[test]
    fn fill_reads_to_capacity_then_eof() {
        let mut buf = buffer(b"abcdefgh", 4);
        buf.fill().unwrap();
        assert_eq!(buf.filled(), b"abcd");
        assert!(!buf.at_eof());

        buf.discard(4);
        buf.fill().unwrap();
        assert_eq!(buf.filled(), b"efgh");
        buf.discard(4);
        buf.fill().unwrap();
        assert!(buf.at_eof());
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn take_emits_prefix_and_keeps_suffix() {
        let mut buf = buffer(b"0123456789", 10);
        buf.fill().unwrap();
        let chunk = buf.take(4, 3);
        assert_eq!(chunk, b"0123");
        assert_eq!(buf.filled(), b"789");
    }

    #[test]
    fn take_can_drop_bytes_between_chunk_and_tail() {
        let mut buf = buffer(b"0123456789", 10);
        buf.fill().unwrap();
        // Emit four, keep two: "4567" vanish.
        let chunk = buf.take(4, 2);
        assert_eq!(chunk, b"0123");
        assert_eq!(buf.filled(), b"89");
    }

    #[test]
    fn grow_doubles_and_refills() {
        let mut buf = buffer(b"0123456789", 4);
        buf.fill().unwrap();
        assert_eq!(buf.len(), 4);
        buf.grow().unwrap();
        assert_eq!(buf.filled(), b"01234567");
    }

    #[test]
    fn window_shrinks_back_after_oversized_region_is_consumed() {
        let mut buf = buffer(b"0123456789abcdef", 4);
        buf.fill().unwrap();
        buf.grow().unwrap();
        buf.grow().unwrap();
        assert_eq!(buf.len(), 16);
        buf.discard(14);
        assert_eq!(buf.filled(), b"ef");
        assert_eq!(buf.data.len(), 4);
    }

    #[test]
    fn byte_cap_is_enforced_during_fill() {
        let mut buf = ScanBuffer::new(Cursor::new(vec![0u8; 64]), 16, 10);
        let err = buf.fill().unwrap_err();
        assert!(matches!(err, Error::SizeLimitExceeded { limit: 10 }));
    }
}
