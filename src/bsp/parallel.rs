//! Thread-parallel vertex iteration
//!
//! The engine splits a vertex range into one contiguous chunk per thread and
//! runs a body over every vertex of its chunk. Chunks are disjoint, so the
//! only possible write conflicts are on state shared through adjacency; those
//! must go through [`atomic_merge_min`](super::atomic::atomic_merge_min).
//!
//! Contiguous chunking keeps adjacency traversal cache-friendly and costs no
//! per-vertex coordination. Skewed degree distributions are left unbalanced.

use rayon::prelude::*;

use super::bitset::AtomicBitset;
use super::config::WorkerConfig;
use super::error::BspError;
use super::vertex::{Vertex, VertexRange};

/// Fixed-size thread pool running per-vertex bodies
pub struct ParallelEngine {
    pool: rayon::ThreadPool,
    thread_num: usize,
}

impl std::fmt::Debug for ParallelEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelEngine")
            .field("thread_num", &self.thread_num)
            .finish()
    }
}

impl ParallelEngine {
    /// Build a pool of `config.thread_num` threads
    pub fn new(config: &WorkerConfig) -> Result<Self, BspError> {
        let thread_num = config.thread_num.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(thread_num)
            .thread_name(|i| format!("bsp-worker-{}", i))
            .build()
            .map_err(|e| BspError::ThreadPool(e.to_string()))?;
        Ok(Self { pool, thread_num })
    }

    pub fn thread_num(&self) -> usize {
        self.thread_num
    }

    pub fn pool(&self) -> &rayon::ThreadPool {
        &self.pool
    }

    /// Call `body(tid, v)` once for every `v` in `range`.
    ///
    /// Returns the first error raised by any body; remaining chunks stop at
    /// their next vertex boundary.
    pub fn for_each<F>(&self, range: VertexRange, body: F) -> Result<(), BspError>
    where
        F: Fn(usize, Vertex) -> Result<(), BspError> + Sync,
    {
        let chunks = range.split(self.thread_num);
        self.pool.install(|| {
            chunks
                .into_par_iter()
                .enumerate()
                .try_for_each(|(tid, chunk)| chunk.iter().try_for_each(|v| body(tid, v)))
        })
    }

    /// Call `body(tid, v)` once for every `v` in `range` whose bit is set in `active`
    pub fn for_each_active<F>(
        &self,
        active: &AtomicBitset,
        range: VertexRange,
        body: F,
    ) -> Result<(), BspError>
    where
        F: Fn(usize, Vertex) -> Result<(), BspError> + Sync,
    {
        let chunks = range.split(self.thread_num);
        self.pool.install(|| {
            chunks
                .into_par_iter()
                .enumerate()
                .try_for_each(|(tid, chunk)| active.ones_in(chunk).try_for_each(|v| body(tid, v)))
        })
    }

    /// Like [`for_each_active`](Self::for_each_active), but chunk `tid` also
    /// gets exclusive access to `locals[tid]`.
    ///
    /// `locals` must hold at least `thread_num` entries.
    pub fn for_each_active_with<T, F>(
        &self,
        active: &AtomicBitset,
        range: VertexRange,
        locals: &mut [T],
        body: F,
    ) -> Result<(), BspError>
    where
        T: Send,
        F: Fn(&mut T, Vertex) -> Result<(), BspError> + Sync,
    {
        if locals.len() < self.thread_num {
            return Err(BspError::ChannelIndexOutOfRange {
                index: self.thread_num - 1,
                count: locals.len(),
            });
        }
        let chunks = range.split(self.thread_num);
        self.pool.install(|| {
            chunks
                .into_par_iter()
                .zip(locals.par_iter_mut())
                .try_for_each(|(chunk, local)| {
                    active.ones_in(chunk).try_for_each(|v| body(&mut *local, v))
                })
        })
    }

    /// Run `body(tid, item)` over `items` split into one contiguous chunk per thread
    pub fn for_each_item<I, F>(&self, items: Vec<I>, body: F) -> Result<(), BspError>
    where
        I: Send,
        F: Fn(usize, I) -> Result<(), BspError> + Sync,
    {
        if items.is_empty() {
            return Ok(());
        }
        let chunk_size = items.len().div_ceil(self.thread_num);
        let mut chunks: Vec<Vec<I>> = Vec::with_capacity(self.thread_num);
        let mut items = items.into_iter();
        loop {
            let chunk: Vec<I> = items.by_ref().take(chunk_size).collect();
            if chunk.is_empty() {
                break;
            }
            chunks.push(chunk);
        }

        self.pool.install(|| {
            chunks
                .into_par_iter()
                .enumerate()
                .try_for_each(|(tid, chunk)| chunk.into_iter().try_for_each(|item| body(tid, item)))
        })
    }
}
