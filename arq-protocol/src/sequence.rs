//! Sequence Number Handling
//!
//! ARQ sequence numbers live on a small finite ring `[0, size)`. This module
//! provides the ring type together with the modular distance and
//! window-membership tests used by both the sender and the receiver.

use std::fmt;

/// Largest ring size that still fits the signed 32-bit packet header fields
pub const MAX_SEQ_SPACE: u32 = i32::MAX as u32;

/// A sequence-number ring of `size` values
///
/// All arithmetic wraps modulo `size`. Values passed in are reduced modulo
/// `size` first, so callers never observe a number outside the ring.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct SeqSpace {
    size: u32,
}

impl SeqSpace {
    /// Create a new ring
    ///
    /// # Panics
    /// Panics if `size` is zero or exceeds [`MAX_SEQ_SPACE`]
    pub fn new(size: u32) -> Self {
        assert!(
            size > 0 && size <= MAX_SEQ_SPACE,
            "Sequence space {} outside 1..={}",
            size,
            MAX_SEQ_SPACE
        );
        SeqSpace { size }
    }

    /// Number of distinct sequence numbers on the ring
    #[inline]
    pub fn size(self) -> u32 {
        self.size
    }

    /// Interpret a raw header field as a sequence number on this ring
    ///
    /// Returns `None` for the `NOT_IN_USE` sentinel and for any value a
    /// corrupting channel may have written outside `[0, size)`.
    #[inline]
    pub fn checked(self, raw: i32) -> Option<u32> {
        u32::try_from(raw).ok().filter(|&seq| seq < self.size)
    }

    /// The sequence number following `seq`
    #[inline]
    pub fn next(self, seq: u32) -> u32 {
        self.add(seq, 1)
    }

    /// The sequence number preceding `seq`
    #[inline]
    pub fn prev(self, seq: u32) -> u32 {
        self.sub(seq, 1)
    }

    /// `seq + n` on the ring
    pub fn add(self, seq: u32, n: u32) -> u32 {
        let size = u64::from(self.size);
        ((u64::from(seq) % size + u64::from(n) % size) % size) as u32
    }

    /// `seq - n` on the ring
    pub fn sub(self, seq: u32, n: u32) -> u32 {
        let size = u64::from(self.size);
        ((u64::from(seq) % size + size - u64::from(n) % size) % size) as u32
    }

    /// Forward distance from `base` to `seq`
    ///
    /// Computes `(seq - base + size) mod size`, always in `[0, size)`.
    #[inline]
    pub fn distance(self, seq: u32, base: u32) -> u32 {
        self.sub(seq, base)
    }

    /// Check whether `seq` lies in the `len`-wide window starting at `base`
    ///
    /// `base` itself is inside the window; `base + len` is the first value
    /// outside it.
    #[inline]
    pub fn in_window(self, seq: u32, base: u32, len: usize) -> bool {
        (self.distance(seq, base) as usize) < len
    }
}

impl fmt::Debug for SeqSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeqSpace({})", self.size)
    }
}

impl fmt::Display for SeqSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0..{}", self.size)
    }
}
