//! Boundary pattern matching.
//!
//! A compiled boundary line (`--` plus the token) with the two shift tables
//! of the Boyer-Moore search: a bad-character table indexed by the low seven
//! bits of a byte, and a good-suffix table indexed by pattern position. Only
//! the last seven bits participate in the bad-character table; this keeps the
//! table small and covers the heavily used ASCII range, at the cost of an
//! occasional aliased candidate that the full comparison rejects.

/// A compiled boundary delimiter.
///
/// Immutable after construction; a single instance backs every scan of one
/// message.
pub(crate) struct BoundaryPattern {
    bytes: Vec<u8>,
    bad_char: [usize; 128],
    good_suffix: Vec<usize>,
}

impl BoundaryPattern {
    /// Compiles `--` + `token` into a searchable pattern.
    pub(crate) fn new(token: &str) -> Self {
        let mut bytes = Vec::with_capacity(token.len() + 2);
        bytes.extend_from_slice(b"--");
        bytes.extend_from_slice(token.as_bytes());
        let len = bytes.len();

        // Last occurrence (plus one) of each low-7-bit value in the pattern.
        let mut bad_char = [0usize; 128];
        for (i, &b) in bytes.iter().enumerate() {
            bad_char[usize::from(b & 0x7f)] = i + 1;
        }

        // For each position, the shift that realigns a matched suffix.
        let mut good_suffix = vec![0usize; len];
        'next: for i in (1..=len).rev() {
            let mut j = len - 1;
            while j >= i {
                if bytes[j] != bytes[j - i] {
                    continue 'next;
                }
                good_suffix[j - 1] = i;
                j -= 1;
            }
            // A suffix cannot shift farther than its own sub-suffix.
            while j > 0 {
                j -= 1;
                good_suffix[j] = i;
            }
        }
        good_suffix[len - 1] = 1;

        Self {
            bytes,
            bad_char,
            good_suffix,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Finds the lowest index in `window` where the pattern occurs.
    ///
    /// Compares right to left, skipping ahead by the larger of the two
    /// precomputed shifts on a mismatch.
    pub(crate) fn find(&self, window: &[u8]) -> Option<usize> {
        let pattern = &self.bytes;
        if window.len() < pattern.len() {
            return None;
        }
        let last = window.len() - pattern.len();
        let mut offset = 0usize;
        'next: while offset <= last {
            for j in (0..pattern.len()).rev() {
                let b = window[offset + j];
                if b != pattern[j] {
                    let bad = j as isize + 1 - self.bad_char[usize::from(b & 0x7f)] as isize;
                    let good = self.good_suffix[j] as isize;
                    offset += usize::try_from(bad.max(good)).unwrap_or(1);
                    continue 'next;
                }
            }
            return Some(offset);
        }
        None
    }
}
