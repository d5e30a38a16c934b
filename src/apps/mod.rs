//! Graph algorithms built on the BSP engine

pub mod sssp;

pub use sssp::{Sssp, SsspOutput};
