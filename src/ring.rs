//! Fixed-capacity byte ring with contiguous run views.
//!
//! The ring tracks a read position and a fill count over one flat allocation. Producers write
//! into the run returned by [`writable`](RingBuffer::writable) and then [`commit`](RingBuffer::commit)
//! what they filled, consumers read from [`readable`](RingBuffer::readable) and then
//! [`consume`](RingBuffer::consume) what they took. A run never wraps around the end of the
//! allocation, so one transfer may need two rounds to see all stored bytes.
//!
//! Arithmetic in here stays within `capacity` by the asserted contracts of `consume` and `commit`.
#![allow(clippy::arithmetic_side_effects, clippy::indexing_slicing)]

/// Bounded byte queue backed by a single allocation.
pub(crate) struct RingBuffer {
    buf: Box<[u8]>,
    /// Index of the oldest stored byte.
    head: usize,
    /// Number of stored bytes.
    used: usize,
}

impl RingBuffer {
    /// Creates an empty ring of the given capacity.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be nonzero");
        Self { buf: vec![0; capacity].into_boxed_slice(), head: 0, used: 0 }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
    /// Total number of stored bytes, wrapped or not.
    #[inline]
    pub fn len(&self) -> usize {
        self.used
    }
    /// Total number of bytes that can still be stored.
    #[inline]
    pub fn free(&self) -> usize {
        self.capacity() - self.used
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Index one past the newest stored byte.
    #[inline]
    fn tail(&self) -> usize {
        (self.head + self.used) % self.capacity()
    }

    /// Length of the contiguous run of stored bytes starting at the read position.
    #[inline]
    pub fn filled(&self) -> usize {
        self.used.min(self.capacity() - self.head)
    }
    /// Length of the contiguous run of free space starting at the write position.
    #[inline]
    pub fn available(&self) -> usize {
        self.free().min(self.capacity() - self.tail())
    }

    /// Contiguous run of stored bytes. Empty when the ring is empty.
    pub fn readable(&self) -> &[u8] {
        &self.buf[self.head..self.head + self.filled()]
    }
    /// Contiguous run of free space. Empty when the ring is full.
    pub fn writable(&mut self) -> &mut [u8] {
        let (tail, run) = (self.tail(), self.available());
        &mut self.buf[tail..tail + run]
    }

    /// Marks `n` stored bytes as read, freeing their space.
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.filled(), "consumed past the readable run");
        self.head = (self.head + n) % self.capacity();
        self.used -= n;
    }
    /// Marks `n` bytes of free space as written.
    pub fn commit(&mut self, n: usize) {
        assert!(n <= self.available(), "committed past the writable run");
        self.used += n;
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
