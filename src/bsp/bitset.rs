//! Fixed-size atomic bitset
//!
//! Bits are set concurrently with `fetch_or`; clearing and range queries
//! are word-oriented. The word layout is private to this module.

use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};

use super::vertex::{Vertex, VertexRange};

const WORD_BITS: usize = 64;

#[inline]
fn word_of(bit: usize) -> usize {
    bit / WORD_BITS
}

#[inline]
fn mask_of(bit: usize) -> u64 {
    1u64 << (bit % WORD_BITS)
}

/// Mask selecting bits `[lo, hi)` of a single word, with `lo < hi <= 64`
#[inline]
fn span_mask(lo: usize, hi: usize) -> u64 {
    let upper = if hi == WORD_BITS { u64::MAX } else { (1u64 << hi) - 1 };
    upper & !((1u64 << lo) - 1)
}

/// A bitset of `len` bits that can be set from many threads at once
#[derive(Debug, Default)]
pub struct AtomicBitset {
    words: Vec<AtomicU64>,
    len: usize,
}

impl AtomicBitset {
    /// Create an all-zero bitset of `len` bits
    pub fn new(len: usize) -> Self {
        let words = (0..len.div_ceil(WORD_BITS)).map(|_| AtomicU64::new(0)).collect();
        Self { words, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Atomically set `bit`. Returns `true` if the bit was previously clear.
    ///
    /// # Panics
    ///
    /// Panics if `bit >= len`. Callers that take handles from app code check
    /// the range first (see `Frontier::mark`).
    #[inline]
    pub fn set(&self, bit: usize) -> bool {
        assert!(bit < self.len, "bit {} out of range {}", bit, self.len);
        let mask = mask_of(bit);
        self.words[word_of(bit)].fetch_or(mask, Ordering::AcqRel) & mask == 0
    }

    #[inline]
    pub fn get(&self, bit: usize) -> bool {
        bit < self.len && self.words[word_of(bit)].load(Ordering::Acquire) & mask_of(bit) != 0
    }

    /// Clear every bit (single thread)
    pub fn clear(&mut self) {
        for word in &mut self.words {
            *word.get_mut() = 0;
        }
    }

    /// Clear every bit, each of `threads` tasks zeroing a disjoint word range
    pub fn parallel_clear(&mut self, pool: &rayon::ThreadPool, threads: usize) {
        let chunk = self.words.len().div_ceil(threads.max(1)).max(1);
        pool.install(|| {
            self.words.par_chunks_mut(chunk).for_each(|words| {
                for word in words {
                    *word.get_mut() = 0;
                }
            });
        });
    }

    /// Whether no bit is set in `range` (clamped to the bitset length)
    pub fn is_empty_in(&self, range: VertexRange) -> bool {
        self.count_in(range) == 0
    }

    /// Number of set bits in `range` (clamped to the bitset length)
    pub fn count_in(&self, range: VertexRange) -> usize {
        let range = range.intersect(VertexRange::new(0, self.len));
        if range.is_empty() {
            return 0;
        }
        let (lo, hi) = (range.start(), range.end());
        let (first, last) = (word_of(lo), word_of(hi - 1));

        let mut count = 0;
        for w in first..=last {
            let span_lo = if w == first { lo % WORD_BITS } else { 0 };
            let span_hi = if w == last { (hi - 1) % WORD_BITS + 1 } else { WORD_BITS };
            let bits = self.words[w].load(Ordering::Acquire) & span_mask(span_lo, span_hi);
            count += bits.count_ones() as usize;
        }
        count
    }

    /// Total number of set bits
    pub fn count(&self) -> usize {
        self.count_in(VertexRange::new(0, self.len))
    }

    /// Iterate the set bits inside `range` as vertex handles, skipping zero words
    pub fn ones_in(&self, range: VertexRange) -> impl Iterator<Item = Vertex> + '_ {
        let range = range.intersect(VertexRange::new(0, self.len));
        let (lo, hi) = (range.start(), range.end());
        let words = if range.is_empty() {
            0..0
        } else {
            word_of(lo)..word_of(hi - 1) + 1
        };

        words.flat_map(move |w| {
            let base = w * WORD_BITS;
            let span_lo = lo.saturating_sub(base).min(WORD_BITS);
            let span_hi = (hi - base).min(WORD_BITS);
            let mut bits = self.words[w].load(Ordering::Acquire) & span_mask(span_lo, span_hi);
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let offset = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(Vertex::new(base + offset))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_is_idempotent() {
        let bits = AtomicBitset::new(100);
        assert!(bits.set(70));
        assert!(!bits.set(70));
        assert!(bits.get(70));
        assert_eq!(bits.count(), 1);
    }

    #[test]
    #[should_panic]
    fn test_set_out_of_range_panics() {
        AtomicBitset::new(10).set(10);
    }

    #[test]
    fn test_get_out_of_range_is_false() {
        assert!(!AtomicBitset::new(10).get(200));
    }

    #[test]
    fn test_range_queries_across_words() {
        let bits = AtomicBitset::new(200);
        for b in [0, 63, 64, 127, 128, 199] {
            bits.set(b);
        }
        assert_eq!(bits.count_in(VertexRange::new(0, 64)), 2);
        assert_eq!(bits.count_in(VertexRange::new(63, 65)), 2);
        assert_eq!(bits.count_in(VertexRange::new(65, 127)), 0);
        assert!(bits.is_empty_in(VertexRange::new(1, 63)));
        assert!(!bits.is_empty_in(VertexRange::new(1, 64)));
        assert_eq!(bits.count_in(VertexRange::new(190, 500)), 1);
    }

    #[test]
    fn test_ones_in_range() {
        let bits = AtomicBitset::new(150);
        for b in [3, 64, 65, 100, 149] {
            bits.set(b);
        }
        let ones: Vec<_> = bits.ones_in(VertexRange::new(4, 149)).map(Vertex::index).collect();
        assert_eq!(ones, vec![64, 65, 100]);

        let all: Vec<_> = bits.ones_in(VertexRange::new(0, 150)).map(Vertex::index).collect();
        assert_eq!(all, vec![3, 64, 65, 100, 149]);

        assert_eq!(bits.ones_in(VertexRange::new(10, 10)).count(), 0);
    }

    #[test]
    fn test_parallel_clear() {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(3).build().unwrap();
        let mut bits = AtomicBitset::new(1000);
        for b in (0..1000).step_by(7) {
            bits.set(b);
        }
        bits.parallel_clear(&pool, 3);
        assert_eq!(bits.count(), 0);
    }
}
