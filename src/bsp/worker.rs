//! Worker - drives one fragment through the superstep loop
//!
//! Each superstep follows the sequence: Compute → Flush → Exchange → Vote.
//! Superstep 0 runs the app's PEval, every later superstep its IncEval. The
//! loop ends when no fragment votes to continue or the superstep cap is hit.
//!
//! Compute blocks the calling thread inside the worker's rayon pool, so each
//! worker needs a thread of its own. [`run_local`] gives every fragment a
//! dedicated OS thread driving a current-thread runtime.

use std::future::Future;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio::runtime;
use tokio::sync::oneshot;
use tokio::time::timeout;

use super::app::{App, Step};
use super::config::{LimitAction, WorkerConfig};
use super::error::BspError;
use super::fragment::Fragment;
use super::frontier::Frontier;
use super::message_manager::MessageManager;
use super::parallel::ParallelEngine;
use super::transport::{LocalTransport, Transport};
use super::vertex::FragmentId;

/// Wall-clock time spent per phase, summed over the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseTimings {
    #[serde(with = "humantime_serde")]
    pub peval: Duration,
    #[serde(with = "humantime_serde")]
    pub inc_eval: Duration,
    #[serde(with = "humantime_serde")]
    pub exchange: Duration,
    #[serde(with = "humantime_serde")]
    pub vote: Duration,
}

/// Result of a worker run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Fragment the worker ran
    pub fid: FragmentId,
    /// Incremental supersteps executed (PEval not counted)
    pub supersteps: usize,
    /// Whether every fragment voted to stop before the cap
    pub converged: bool,
    /// Messages sent over the whole run
    pub messages_sent: usize,
    /// Messages received over the whole run
    pub messages_received: usize,
    /// Phase timings, present when profiling is enabled
    pub timings: Option<PhaseTimings>,
}

/// Runs an [`App`] on one fragment, synchronising with its peers through `T`
pub struct Worker<A, F, T>
where
    F: Fragment,
    A: App<F>,
    T: Transport<A::Message>,
{
    app: A,
    fragment: Arc<F>,
    transport: T,
    config: WorkerConfig,
    engine: ParallelEngine,
    frontier: Frontier,
    state: A::State,
    messages: MessageManager<A::Message>,
}

impl<A, F, T> Worker<A, F, T>
where
    F: Fragment,
    A: App<F>,
    T: Transport<A::Message>,
{
    /// Build the thread pool, frontier, state and channels for `fragment`
    pub fn new(app: A, fragment: Arc<F>, transport: T, config: WorkerConfig) -> Result<Self, BspError> {
        config.validate()?;
        if transport.fid() != fragment.fid() || transport.fnum() != fragment.fnum() {
            return Err(BspError::config(format!(
                "transport endpoint {}/{} does not match fragment {}/{}",
                transport.fid(),
                transport.fnum(),
                fragment.fid(),
                fragment.fnum()
            )));
        }

        let engine = ParallelEngine::new(&config)?;
        let frontier = Frontier::new(fragment.vertices().len());
        let state = app.init_state(&fragment);
        let mut messages = MessageManager::new(fragment.fid(), fragment.fnum());
        messages.init_channels(engine.thread_num());

        Ok(Self {
            app,
            fragment,
            transport,
            config,
            engine,
            frontier,
            state,
            messages,
        })
    }

    pub fn fragment(&self) -> &F {
        &self.fragment
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Per-vertex state, final once `run` has returned
    pub fn state(&self) -> &A::State {
        &self.state
    }

    /// Extract the app's output from the current state
    pub fn output(&self) -> A::Output {
        self.app.output(&self.fragment, &self.state)
    }

    /// Run PEval, then IncEval until global convergence or the superstep cap
    pub async fn run(&mut self) -> Result<RunSummary, BspError> {
        let fid = self.fragment.fid();
        tracing::info!(
            fid,
            fnum = self.fragment.fnum(),
            inner_vertices = self.fragment.inner_vertices().len(),
            outer_vertices = self.fragment.outer_vertices().len(),
            threads = self.engine.thread_num(),
            "Worker starting"
        );

        let mut timings = PhaseTimings::default();

        let started = Instant::now();
        self.compute(0)?;
        timings.peval += started.elapsed();
        let mut keep_going = self.synchronize(0, &mut timings).await?;

        let mut supersteps = 0;
        let mut converged = true;
        while keep_going {
            let superstep = supersteps + 1;
            if self.config.exceeds_limit(superstep) {
                let max = self.config.max_supersteps.unwrap_or(supersteps);
                match self.config.limit_action {
                    LimitAction::Warn => {
                        tracing::warn!(
                            fid,
                            max_supersteps = max,
                            "Superstep limit reached before convergence"
                        );
                        converged = false;
                        break;
                    }
                    LimitAction::Abort => return Err(BspError::SuperstepLimitExceeded(max)),
                }
            }

            let started = Instant::now();
            self.compute(superstep)?;
            timings.inc_eval += started.elapsed();
            supersteps = superstep;
            keep_going = self.synchronize(superstep, &mut timings).await?;
        }

        let summary = RunSummary {
            fid,
            supersteps,
            converged,
            messages_sent: self.messages.messages_sent(),
            messages_received: self.messages.messages_received(),
            timings: self.config.profiling.then_some(timings),
        };

        tracing::info!(
            fid,
            supersteps,
            converged,
            messages_sent = summary.messages_sent,
            messages_received = summary.messages_received,
            "Worker finished"
        );
        if let Some(timings) = &summary.timings {
            tracing::info!(
                fid,
                peval = ?timings.peval,
                inc_eval = ?timings.inc_eval,
                exchange = ?timings.exchange,
                vote = ?timings.vote,
                "Phase timings"
            );
        }

        Ok(summary)
    }

    /// Run to completion on the calling thread and extract the output.
    ///
    /// Builds a current-thread runtime for the transport; must not be called
    /// from inside an async context.
    pub fn run_blocking(&mut self) -> Result<(RunSummary, A::Output), BspError> {
        let runtime = runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| BspError::ThreadPool(e.to_string()))?;
        let summary = runtime.block_on(self.run())?;
        Ok((summary, self.output()))
    }

    fn compute(&mut self, superstep: usize) -> Result<(), BspError> {
        let mut step = Step {
            fragment: &*self.fragment,
            state: &mut self.state,
            frontier: &mut self.frontier,
            messages: &mut self.messages,
            engine: &self.engine,
            superstep,
        };
        if superstep == 0 {
            self.app.peval(&mut step)
        } else {
            self.app.inc_eval(&mut step)
        }
    }

    /// Flush, exchange and vote. Returns the global continue decision.
    async fn synchronize(&mut self, superstep: usize, timings: &mut PhaseTimings) -> Result<bool, BspError> {
        let flush = self.messages.flush()?;
        let inner = self.fragment.inner_vertices();
        let local = flush.wants_continue() || !self.frontier.is_empty_in_range(inner);
        let active = self.frontier.count_active_in_range(inner);
        let sent = flush.sent;

        let limit = self.config.exchange_timeout;

        let started = Instant::now();
        let inbound = bounded(limit, self.transport.exchange(flush.outbox)).await?;
        timings.exchange += started.elapsed();
        let received = inbound.len();
        self.messages.deliver(inbound)?;

        let started = Instant::now();
        let global = bounded(limit, self.transport.any_continue(local)).await?;
        timings.vote += started.elapsed();

        tracing::debug!(
            fid = self.fragment.fid(),
            superstep,
            active,
            sent,
            received,
            local_continue = local,
            global_continue = global,
            "Superstep complete"
        );
        Ok(global)
    }
}

async fn bounded<R>(limit: Duration, fut: impl Future<Output = Result<R, BspError>>) -> Result<R, BspError> {
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(BspError::TransportTimeout(limit)),
    }
}

/// Run `app` over every fragment of an in-process graph.
///
/// `fragments` must be the complete set, indexed by fid. Every fragment runs
/// on its own thread, so compute phases of different fragments overlap.
/// Returns one `(summary, output)` pair per fragment, in fid order.
pub async fn run_local<A, F>(
    app: A,
    fragments: Vec<F>,
    config: WorkerConfig,
) -> Result<Vec<(RunSummary, A::Output)>, BspError>
where
    F: Fragment + 'static,
    A: App<F> + Clone + 'static,
    A::Output: Send + 'static,
{
    let fnum = fragments.len();
    if fnum == 0 {
        return Err(BspError::config("no fragments to run"));
    }
    if let Some((index, frag)) = fragments
        .iter()
        .enumerate()
        .find(|(i, f)| f.fid() != *i || f.fnum() != fnum)
    {
        return Err(BspError::config(format!(
            "fragment at position {} reports fid {} of {}, expected {} of {}",
            index,
            frag.fid(),
            frag.fnum(),
            index,
            fnum
        )));
    }

    let workers = fragments
        .into_iter()
        .zip(LocalTransport::<A::Message>::group(fnum))
        .map(|(fragment, transport)| Worker::new(app.clone(), Arc::new(fragment), transport, config.clone()))
        .collect::<Result<Vec<_>, _>>()?;

    let pending = workers.into_iter().map(spawn_worker).collect::<Result<Vec<_>, _>>()?;
    try_join_all(pending).await
}

/// Start `worker` on a dedicated thread; the returned future resolves with
/// its result
fn spawn_worker<A, F, T>(
    mut worker: Worker<A, F, T>,
) -> Result<impl Future<Output = Result<(RunSummary, A::Output), BspError>>, BspError>
where
    F: Fragment + 'static,
    A: App<F> + 'static,
    A::Output: Send + 'static,
    T: Transport<A::Message> + 'static,
{
    let fid = worker.fragment().fid();
    let (tx, rx) = oneshot::channel();
    thread::Builder::new()
        .name(format!("bsp-fragment-{}", fid))
        .spawn(move || {
            let _ = tx.send(worker.run_blocking());
        })
        .map_err(|e| BspError::ThreadPool(e.to_string()))?;

    Ok(async move { rx.await.map_err(|_| BspError::WorkerPanicked(fid))? })
}
