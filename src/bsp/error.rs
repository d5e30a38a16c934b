//! Error types for the BSP engine
//!
//! Every variant is fatal to the whole distributed computation: once any
//! fragment faults, no fragment's partial result is considered valid.
//! Recoverable conditions (a seed that is not local to a fragment) never
//! reach this type.

use std::ops::Range;
use std::time::Duration;
use thiserror::Error;

use super::vertex::{FragmentId, Gid, Vertex};

/// Errors that can occur while running a BSP computation
#[derive(Debug, Error)]
pub enum BspError {
    /// Invalid worker configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The intra-fragment thread pool could not be built
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// A vertex handle outside the valid range was used
    #[error("Vertex {vertex} out of range {range:?}")]
    VertexOutOfRange { vertex: Vertex, range: Range<usize> },

    /// An inbound message targets a vertex the receiving fragment does not own
    #[error("Fragment {fid} received a message for vertex {gid} it does not own")]
    MessageTargetNotOwned { fid: FragmentId, gid: Gid },

    /// Outer-vertex synchronisation was requested for a vertex that is not outer
    #[error("Vertex {0} is not an outer vertex")]
    NotOuterVertex(Vertex),

    /// A message was addressed to a fragment id outside `[0, fnum)`
    #[error("Unknown destination fragment {fid} (fnum = {fnum})")]
    UnknownFragment { fid: FragmentId, fnum: usize },

    /// Inbound messages were still pending when the next set arrived
    #[error("Fragment {fid} left {count} inbound messages unprocessed")]
    UnprocessedMessages { fid: FragmentId, count: usize },

    /// A channel index did not name an allocated channel
    #[error("Channel {index} out of range ({count} channels)")]
    ChannelIndexOutOfRange { index: usize, count: usize },

    /// Message transport failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// A transport barrier did not complete in time
    #[error("Transport timeout after {0:?}")]
    TransportTimeout(Duration),

    /// A worker thread exited without reporting a result
    #[error("Worker for fragment {0} panicked")]
    WorkerPanicked(FragmentId),

    /// The superstep cap was reached with the abort action configured
    #[error("Superstep limit exceeded: {0}")]
    SuperstepLimitExceeded(usize),
}

impl BspError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create a vertex-out-of-range error
    pub fn vertex_out_of_range(vertex: Vertex, range: Range<usize>) -> Self {
        Self::VertexOutOfRange { vertex, range }
    }

    /// Create a message-target-not-owned error
    pub fn target_not_owned(fid: FragmentId, gid: Gid) -> Self {
        Self::MessageTargetNotOwned { fid, gid }
    }

    /// Whether the error aborts the whole computation.
    ///
    /// All current variants do; the method exists so callers do not match
    /// on the variant list.
    pub fn is_fatal(&self) -> bool {
        true
    }

    /// Check if the error is a contract violation (a programming error in
    /// the app or fragment rather than an environmental failure)
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            BspError::VertexOutOfRange { .. }
                | BspError::MessageTargetNotOwned { .. }
                | BspError::NotOuterVertex(_)
                | BspError::UnknownFragment { .. }
                | BspError::ChannelIndexOutOfRange { .. }
                | BspError::UnprocessedMessages { .. }
        )
    }

    /// Check if the error came from the transport layer
    pub fn is_transport(&self) -> bool {
        matches!(self, BspError::Transport(_) | BspError::TransportTimeout(_))
    }
}

#[cfg(test)]
mod tests {
    static_assertions::assert_impl_all!(super::BspError: Send, Sync);
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BspError::SuperstepLimitExceeded(100);
        assert_eq!(format!("{}", err), "Superstep limit exceeded: 100");

        let err = BspError::vertex_out_of_range(Vertex::new(12), 0..10);
        assert_eq!(format!("{}", err), "Vertex 12 out of range 0..10");

        let err = BspError::WorkerPanicked(3);
        assert_eq!(format!("{}", err), "Worker for fragment 3 panicked");
    }

    #[test]
    fn test_target_not_owned() {
        let err = BspError::target_not_owned(1, 42);
        match err {
            BspError::MessageTargetNotOwned { fid, gid } => {
                assert_eq!(fid, 1);
                assert_eq!(gid, 42);
            }
            _ => panic!("Wrong error type"),
        }
    }

    #[test]
    fn test_classification() {
        assert!(BspError::NotOuterVertex(Vertex::new(0)).is_contract_violation());
        assert!(BspError::UnknownFragment { fid: 3, fnum: 2 }.is_contract_violation());
        assert!(BspError::UnprocessedMessages { fid: 0, count: 2 }.is_contract_violation());
        assert!(!BspError::transport("peer gone").is_contract_violation());

        assert!(BspError::TransportTimeout(Duration::from_secs(1)).is_transport());
        assert!(!BspError::config("bad").is_transport());

        assert!(BspError::SuperstepLimitExceeded(3).is_fatal());
    }
}
