//! BSP superstep engine for partitioned graphs
//!
//! A graph is cut into fragments. Each fragment is driven by one [`Worker`]
//! with its own thread pool; fragments meet only at the superstep barrier.
//! Key concepts:
//!
//! - **Fragment**: inner vertices owned here plus outer mirrors of neighbours
//! - **Frontier**: double-buffered bitset of vertices to re-evaluate
//! - **Channel**: per-thread outgoing buffer, drained at the barrier
//! - **Superstep**: PEval once, then IncEval until every fragment votes to stop
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Worker (fragment i)                    │
//! │  ┌─────────┐  ┌─────────┐  ┌─────────┐                      │
//! │  │  PEval  │→ │ IncEval │→ │ IncEval │→ ...                 │
//! │  │    0    │  │    1    │  │    2    │                      │
//! │  └─────────┘  └─────────┘  └─────────┘                      │
//! │       │            │            │                           │
//! │       ▼            ▼            ▼                           │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │ Per-Superstep: Compute → Flush → Exchange → Vote    │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A message sent in superstep `k` is delivered at the start of superstep
//! `k + 1`, never earlier. Shared per-vertex state is written concurrently
//! only through [`atomic_merge_min`].

pub mod app;
pub mod atomic;
pub mod bitset;
pub mod channel;
pub mod config;
pub mod error;
pub mod fragment;
pub mod frontier;
pub mod message;
pub mod message_manager;
pub mod parallel;
pub mod transport;
pub mod vertex;
pub mod worker;

// Re-exports
pub use app::{App, Step};
pub use atomic::{atomic_merge_min, AtomicF64, AtomicSlot};
pub use bitset::AtomicBitset;
pub use channel::Channel;
pub use config::{LimitAction, WorkerConfig};
pub use error::BspError;
pub use fragment::{hash_partition, Edge, EdgeCutFragment, Fragment};
pub use frontier::Frontier;
pub use message::{Message, MessagePayload, Outbox};
pub use message_manager::{FlushSummary, MessageManager};
pub use parallel::ParallelEngine;
pub use transport::{LocalTransport, Transport};
pub use vertex::{FragmentId, Gid, Vertex, VertexArray, VertexRange};
pub use worker::{run_local, PhaseTimings, RunSummary, Worker};
