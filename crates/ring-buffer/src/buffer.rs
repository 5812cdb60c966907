//! Lock-Free Byte Ring Buffer Implementation

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Default buffer capacity (4096 bytes = ~1 s of NMEA traffic at 38400 baud)
pub const DEFAULT_CAPACITY: usize = 4096;

/// Lock-free SPSC ring buffer for raw serial bytes
///
/// The producer (UART read task) owns the head cursor; the consumer (logger
/// loop) owns the tail cursor. The one exception is the overflow path: when
/// the buffer is full, `push` advances the tail past the oldest byte so that
/// the producer never blocks (oldest-data-loss policy).
pub struct ByteRing {
    /// Pre-allocated storage
    storage: Box<[u8]>,
    /// Capacity of the buffer
    capacity: usize,
    /// Head position (write cursor)
    head: AtomicUsize,
    /// Tail position (read cursor)
    tail: AtomicUsize,
    /// Total bytes pushed (for statistics)
    total_pushed: AtomicU64,
    /// Bytes dropped on overflow
    overflow: AtomicU64,
}

impl ByteRing {
    /// Create a new ring buffer with given capacity
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 1, "ring capacity must be at least 2");
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            capacity,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            total_pushed: AtomicU64::new(0),
            overflow: AtomicU64::new(0),
        }
    }

    /// Create a buffer with default capacity (4096 bytes)
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Push a byte into the buffer (overwrites oldest if full)
    ///
    /// O(1), never fails, never blocks. Safe to call from the producer side
    /// only; the overflow counter records every byte dropped.
    pub fn push(&self, byte: u8) {
        let head = self.head.load(Ordering::Relaxed);
        let next_head = (head + 1) % self.capacity;

        // SAFETY: we're the only writer, storage is pre-allocated
        unsafe {
            let ptr = self.storage.as_ptr() as *mut u8;
            std::ptr::write(ptr.add(head), byte);
        }

        self.head.store(next_head, Ordering::Release);
        self.total_pushed.fetch_add(1, Ordering::Relaxed);

        // If buffer is full, advance tail past the oldest byte. A concurrent
        // drain may advance tail first; the byte only counts as dropped when
        // this side wins the exchange.
        let tail = self.tail.load(Ordering::Relaxed);
        if next_head == tail
            && self
                .tail
                .compare_exchange(
                    tail,
                    (tail + 1) % self.capacity,
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                )
                .is_ok()
        {
            self.overflow.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Drain the bytes available at call time
    ///
    /// Lazy and finite: the iterator is bounded by the write position observed
    /// when `drain` was called, so a fast producer cannot starve the consumer.
    /// Each yielded byte advances the tail cursor.
    pub fn drain(&self) -> Drain<'_> {
        Drain {
            ring: self,
            end: self.head.load(Ordering::Acquire),
        }
    }

    /// Get the number of bytes currently in the buffer
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        if head >= tail {
            head - tail
        } else {
            self.capacity - tail + head
        }
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get total bytes pushed (for statistics)
    pub fn total_pushed(&self) -> u64 {
        self.total_pushed.load(Ordering::Relaxed)
    }

    /// Get the number of bytes dropped on overflow
    pub fn overflow_count(&self) -> u64 {
        self.overflow.load(Ordering::Relaxed)
    }
}

// SAFETY: ByteRing is designed for SPSC use, but we mark it Send+Sync
// for flexibility in async contexts where the runtime may move it between threads.
unsafe impl Send for ByteRing {}
unsafe impl Sync for ByteRing {}

/// Draining iterator over a [`ByteRing`], bounded at creation time
pub struct Drain<'a> {
    ring: &'a ByteRing,
    end: usize,
}

impl Iterator for Drain<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        loop {
            let tail = self.ring.tail.load(Ordering::Acquire);
            if tail == self.end {
                return None;
            }
            let byte = self.ring.storage[tail];
            // A lost exchange means the producer's overflow path dropped this
            // byte out from under us; reload and move on.
            if self
                .ring
                .tail
                .compare_exchange(
                    tail,
                    (tail + 1) % self.ring.capacity,
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                return Some(byte);
            }
        }
    }
}
