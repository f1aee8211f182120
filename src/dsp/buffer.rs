//! Fixed-capacity rolling window of complex samples

use std::fmt;

use ringbuf::traits::{Consumer, Observer, RingBuffer};
use ringbuf::HeapRb;

use crate::domain::Sample;

/// Rolling window over the most recent samples
///
/// Pushing into a full window silently evicts the oldest sample, like a
/// Python `collections.deque(maxlen=n)`.
pub struct SampleBuffer {
    ring: HeapRb<Sample>,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: HeapRb::new(capacity.max(1)),
        }
    }

    /// Append a sample, returning the evicted one if the window was full
    pub fn push(&mut self, sample: Sample) -> Option<Sample> {
        self.ring.push_overwrite(sample)
    }

    pub fn len(&self) -> usize {
        self.ring.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity().get()
    }

    /// Samples from oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Sample> + '_ {
        self.ring.iter()
    }

    /// The most recent `n` samples (fewer if not yet available), oldest first
    pub fn latest(&self, n: usize) -> impl Iterator<Item = &Sample> + '_ {
        self.ring.iter().skip(self.len().saturating_sub(n))
    }

    pub fn to_vec(&self) -> Vec<Sample> {
        self.ring.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.ring.clear();
    }
}

impl fmt::Debug for SampleBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleBuffer")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
