//! bsp-engine: partition-parallel BSP superstep engine
//!
//! Runs vertex-centric graph algorithms over an edge-cut partitioned graph.
//! Each fragment is evaluated by a thread pool; fragments exchange boundary
//! updates at a barrier between supersteps.
//!
//! ```rust,no_run
//! use bsp_engine::apps::Sssp;
//! use bsp_engine::{hash_partition, run_local, EdgeCutFragment, WorkerConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let edges = [(0, 1, 2.0), (0, 2, 5.0), (1, 2, 1.0)];
//! let fragments = EdgeCutFragment::partition(2, [], &edges, |g| hash_partition(g, 2))?;
//! for (summary, output) in run_local(Sssp::new(0), fragments, WorkerConfig::from_env()?).await? {
//!     println!("fragment {} converged in {} supersteps", summary.fid, summary.supersteps);
//!     output.write_to(std::io::stdout())?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod apps;
pub mod bsp;

// Re-exports for convenience
pub use bsp::{
    atomic_merge_min, hash_partition, run_local, App, AtomicF64, BspError, EdgeCutFragment, Fragment,
    LimitAction, LocalTransport, RunSummary, Step, Transport, Vertex, VertexRange, Worker, WorkerConfig,
};
