//! Single-source shortest paths
//!
//! Distances are kept for inner and outer vertices alike. An improvement of
//! an outer vertex is sent to its owner, which folds it in with the same
//! min-merge used for local relaxation. Edge weights must be non-negative.

use std::io::{self, Write};
use std::sync::atomic::Ordering;

use crate::bsp::{
    atomic_merge_min, App, AtomicF64, AtomicSlot, BspError, Fragment, Gid, Step, VertexArray,
};

/// Shortest-path distances from `source`
#[derive(Debug, Clone, Copy)]
pub struct Sssp {
    source: Gid,
}

impl Sssp {
    pub fn new(source: Gid) -> Self {
        Self { source }
    }

    pub fn source(&self) -> Gid {
        self.source
    }
}

/// Final distances of one fragment's inner vertices
#[derive(Debug, Clone, PartialEq)]
pub struct SsspOutput {
    distances: Vec<(Gid, f64)>,
}

impl SsspOutput {
    /// `(gid, distance)` pairs in local handle order
    pub fn iter(&self) -> impl Iterator<Item = (Gid, f64)> + '_ {
        self.distances.iter().copied()
    }

    /// Distance of `gid`, if this fragment owns it
    pub fn distance(&self, gid: Gid) -> Option<f64> {
        self.distances.iter().find(|(g, _)| *g == gid).map(|(_, d)| *d)
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Write one `gid<TAB>distance` line per vertex; unreachable vertices
    /// are written as `infinity`
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for &(gid, distance) in &self.distances {
            if distance.is_infinite() {
                writeln!(writer, "{}\tinfinity", gid)?;
            } else {
                writeln!(writer, "{}\t{}", gid, distance)?;
            }
        }
        writer.flush()
    }
}

impl<F> App<F> for Sssp
where
    F: Fragment<EdgeData = f64>,
{
    type State = VertexArray<AtomicF64>;
    type Message = f64;
    type Output = SsspOutput;

    fn init_state(&self, fragment: &F) -> Self::State {
        VertexArray::from_fn(fragment.vertices().len(), |_| AtomicF64::new(f64::INFINITY))
    }

    fn peval(&self, step: &mut Step<'_, F, Self::State, f64>) -> Result<(), BspError> {
        let fragment = step.fragment;
        step.frontier.clear_next(step.engine);

        match fragment.inner_vertex(self.source) {
            Some(source) => {
                let state = &*step.state;
                state[source].store(0.0, Ordering::Release);

                let channel = step.messages.channel(0)?;
                for edge in fragment.outgoing_edges(source) {
                    let v = edge.neighbor;
                    atomic_merge_min(&state[v], edge.data);
                    if fragment.is_outer(v) {
                        channel.sync_state_on_outer_vertex(fragment, v, state[v].load(Ordering::Acquire))?;
                    } else {
                        step.frontier.mark(v)?;
                    }
                }
                tracing::debug!(
                    fid = fragment.fid(),
                    source = self.source,
                    seeded = fragment.outgoing_edges(source).len(),
                    "Seeded source"
                );
            }
            None => {
                tracing::trace!(fid = fragment.fid(), source = self.source, "Source not local");
            }
        }

        step.messages.force_continue();
        step.frontier.swap();
        Ok(())
    }

    fn inc_eval(&self, step: &mut Step<'_, F, Self::State, f64>) -> Result<(), BspError> {
        let fragment = step.fragment;
        let engine = step.engine;
        let inner = fragment.inner_vertices();

        step.frontier.clear_next(engine);
        let state = &*step.state;
        let frontier = &*step.frontier;

        // received improvements are relaxed in this superstep
        step.messages.parallel_process(engine, fragment, |_, u, distance| {
            if atomic_merge_min(&state[u], distance) {
                frontier.activate(u)?;
            }
            Ok(())
        })?;

        engine.for_each_active(frontier.current(), inner, |_, v| {
            let dist_v = state[v].load(Ordering::Acquire);
            for edge in fragment.outgoing_edges(v) {
                let u = edge.neighbor;
                if atomic_merge_min(&state[u], dist_v + edge.data) {
                    frontier.mark(u)?;
                }
            }
            Ok(())
        })?;

        engine.for_each_active_with(
            frontier.next(),
            fragment.outer_vertices(),
            step.messages.channels_mut(),
            |channel, v| channel.sync_state_on_outer_vertex(fragment, v, state[v].load(Ordering::Acquire)),
        )?;

        if !frontier.next_is_empty_in_range(inner) {
            step.messages.force_continue();
        }
        step.frontier.swap();
        Ok(())
    }

    fn output(&self, fragment: &F, state: &Self::State) -> SsspOutput {
        let distances = fragment
            .inner_vertices()
            .iter()
            .filter_map(|v| Some((fragment.gid(v)?, state.get(v)?.load(Ordering::Acquire))))
            .collect();
        SsspOutput { distances }
    }
}
