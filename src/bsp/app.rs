//! Application interface
//!
//! An app is written as two fragment-local functions. `peval` runs once and
//! seeds the computation; `inc_eval` runs every following superstep and
//! folds the messages of the previous one into the fragment's state. Both see
//! the fragment through a [`Step`].

use super::error::BspError;
use super::fragment::Fragment;
use super::frontier::Frontier;
use super::message::MessagePayload;
use super::message_manager::MessageManager;
use super::parallel::ParallelEngine;

/// Everything an app can touch during one superstep
pub struct Step<'a, F, S, M> {
    /// The fragment being evaluated
    pub fragment: &'a F,
    /// Per-vertex state, shared across the engine's threads
    pub state: &'a mut S,
    /// Active-vertex frontier
    pub frontier: &'a mut Frontier,
    /// Channels out, inbound messages in
    pub messages: &'a mut MessageManager<M>,
    /// Intra-fragment thread pool
    pub engine: &'a ParallelEngine,
    /// 0 for PEval, then 1, 2, ... for each incremental superstep
    pub superstep: usize,
}

impl<F, S, M> Step<'_, F, S, M> {
    pub fn is_peval(&self) -> bool {
        self.superstep == 0
    }
}

/// A vertex-centric graph algorithm run by a [`Worker`](super::worker::Worker)
///
/// Contract:
/// - `peval` must call `force_continue()` unconditionally so that every
///   fragment reaches the first incremental superstep.
/// - `inc_eval` clears `next`, merges inbound messages through
///   `parallel_process` (activating lowered vertices in `current`), relaxes
///   the active inner vertices, emits changed outer
///   vertices, calls `force_continue()` if `next` is non-empty over the inner
///   range, and swaps the frontier.
/// - Concurrent writes to shared per-vertex state go through
///   [`atomic_merge_min`](super::atomic::atomic_merge_min) or another
///   commutative merge.
pub trait App<F: Fragment>: Send + Sync {
    /// Per-vertex state of one fragment
    type State: Send + Sync;
    /// Payload carried between fragments
    type Message: MessagePayload;
    /// Result extracted after convergence
    type Output;

    /// Allocate the state of `fragment`
    fn init_state(&self, fragment: &F) -> Self::State;

    /// Partial evaluation, superstep 0
    fn peval(&self, step: &mut Step<'_, F, Self::State, Self::Message>) -> Result<(), BspError>;

    /// Incremental evaluation, supersteps 1..
    fn inc_eval(&self, step: &mut Step<'_, F, Self::State, Self::Message>)
        -> Result<(), BspError>;

    /// Extract the result from a converged state
    fn output(&self, fragment: &F, state: &Self::State) -> Self::Output;
}
