//! Double-buffered active-vertex frontier
//!
//! `current` drives iteration during a superstep and is read-only while it
//! does; `next` collects marks from concurrent workers. [`Frontier::swap`]
//! exchanges the two at the end of the step.
//!
//! Vertices lowered by inbound messages are added to `current` with
//! [`Frontier::activate`] before iteration starts, so they are evaluated in
//! the superstep that received them.

use super::bitset::AtomicBitset;
use super::error::BspError;
use super::parallel::ParallelEngine;
use super::vertex::{Vertex, VertexRange};

/// Pair of bitsets indexed by fragment-local vertex handle
#[derive(Debug)]
pub struct Frontier {
    current: AtomicBitset,
    next: AtomicBitset,
}

impl Frontier {
    /// Create an empty frontier covering `len` vertex handles (inner + outer)
    pub fn new(len: usize) -> Self {
        Self {
            current: AtomicBitset::new(len),
            next: AtomicBitset::new(len),
        }
    }

    /// Number of handles covered
    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Reset `next`, splitting the words across the engine's threads
    pub fn clear_next(&mut self, engine: &ParallelEngine) {
        self.next.parallel_clear(engine.pool(), engine.thread_num());
    }

    /// Mark `v` for the next superstep. Safe to call concurrently; marking
    /// an already marked vertex is a no-op. Returns `true` if newly marked.
    #[inline]
    pub fn mark(&self, v: Vertex) -> Result<bool, BspError> {
        self.check(v)?;
        Ok(self.next.set(v.index()))
    }

    /// Activate `v` in `current`. Safe to call concurrently.
    ///
    /// Only valid before `current` starts driving iteration, i.e. from a
    /// `parallel_process` callback ahead of `for_each_active`.
    #[inline]
    pub fn activate(&self, v: Vertex) -> Result<bool, BspError> {
        self.check(v)?;
        Ok(self.current.set(v.index()))
    }

    /// Exchange `current` and `next` in O(1)
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }

    /// Whether `v` is active in the current superstep
    #[inline]
    pub fn is_active(&self, v: Vertex) -> bool {
        self.current.get(v.index())
    }

    /// Whether `v` has been marked for the next superstep
    #[inline]
    pub fn is_marked(&self, v: Vertex) -> bool {
        self.next.get(v.index())
    }

    /// Whether no vertex in `range` is active in `current`
    pub fn is_empty_in_range(&self, range: VertexRange) -> bool {
        self.current.is_empty_in(range)
    }

    /// Whether no vertex in `range` has been marked in `next`
    pub fn next_is_empty_in_range(&self, range: VertexRange) -> bool {
        self.next.is_empty_in(range)
    }

    pub fn count_active_in_range(&self, range: VertexRange) -> usize {
        self.current.count_in(range)
    }

    pub fn current(&self) -> &AtomicBitset {
        &self.current
    }

    pub fn next(&self) -> &AtomicBitset {
        &self.next
    }

    fn check(&self, v: Vertex) -> Result<(), BspError> {
        if v.index() < self.current.len() {
            Ok(())
        } else {
            Err(BspError::vertex_out_of_range(v, 0..self.current.len()))
        }
    }
}
