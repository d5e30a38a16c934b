//! Property-based tests for the merge primitive, the frontier and convergence.
//!
//! These tests verify invariants of the engine using randomized inputs.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::thread;

use bsp_engine::apps::Sssp;
use bsp_engine::bsp::{
    atomic_merge_min, AtomicF64, AtomicSlot, EdgeCutFragment, Frontier, Gid, ParallelEngine, Vertex,
    VertexRange, WorkerConfig,
};
use bsp_engine::run_local;
use proptest::prelude::*;

/// Bellman-Ford over the whole graph, used as the reference result
fn reference_distances(n: u64, edges: &[(Gid, Gid, f64)], source: Gid) -> Vec<f64> {
    let mut dist = vec![f64::INFINITY; n as usize];
    dist[source as usize] = 0.0;
    for _ in 0..n {
        for &(u, v, w) in edges {
            if dist[u as usize] + w < dist[v as usize] {
                dist[v as usize] = dist[u as usize] + w;
            }
        }
    }
    dist
}

fn graph() -> impl Strategy<Value = (u64, Vec<(Gid, Gid, f64)>)> {
    (2u64..12).prop_flat_map(|n| {
        let edge = (0..n, 0..n, 0u32..10).prop_map(|(u, v, w)| (u, v, w as f64));
        (Just(n), prop::collection::vec(edge, 0..30))
    })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    /// Merging the same candidate twice is the same as merging it once.
    #[test]
    fn prop_merge_min_idempotent(a in any::<i64>(), b in any::<i64>()) {
        let slot = AtomicI64::new(a);
        atomic_merge_min(&slot, b);
        let once = slot.load(Ordering::Relaxed);
        prop_assert!(!atomic_merge_min(&slot, b));
        prop_assert_eq!(slot.load(Ordering::Relaxed), once);
        prop_assert_eq!(once, a.min(b));
    }

    /// The slot reports a change exactly when the candidate is smaller.
    #[test]
    fn prop_merge_min_reports_change(a in -1.0e9f64..1.0e9, b in -1.0e9f64..1.0e9) {
        let slot = AtomicF64::new(a);
        let lowered = atomic_merge_min(&slot, b);
        prop_assert_eq!(lowered, b < a);
        prop_assert_eq!(slot.load(Ordering::Relaxed), a.min(b));
    }

    /// Threads racing on one slot always leave the true minimum behind.
    #[test]
    fn prop_merge_min_racing_threads(candidates in prop::collection::vec(any::<u64>(), 1..64)) {
        let slot = AtomicU64::new(u64::MAX);
        thread::scope(|scope| {
            for chunk in candidates.chunks(8) {
                let slot = &slot;
                scope.spawn(move || {
                    for &c in chunk {
                        atomic_merge_min(slot, c);
                    }
                });
            }
        });
        prop_assert_eq!(slot.load(Ordering::Relaxed), *candidates.iter().min().unwrap());
    }

    /// Marks become visible in `current` only after a swap, and clearing
    /// `next` afterwards leaves them in place.
    #[test]
    fn prop_frontier_double_buffer(
        len in 1usize..300,
        marks in prop::collection::vec(any::<prop::sample::Index>(), 0..40),
        window in any::<(prop::sample::Index, prop::sample::Index)>(),
    ) {
        let engine = ParallelEngine::new(&WorkerConfig::default().with_thread_num(3)).unwrap();
        let mut frontier = Frontier::new(len);
        let marked: BTreeSet<usize> = marks.iter().map(|i| i.index(len)).collect();
        for &m in &marked {
            frontier.mark(Vertex::new(m)).unwrap();
        }
        prop_assert!(frontier.is_empty_in_range(VertexRange::new(0, len)));

        frontier.swap();
        frontier.clear_next(&engine);

        let (a, b) = (window.0.index(len + 1), window.1.index(len + 1));
        let range = VertexRange::new(a.min(b), a.max(b));
        let expected = marked.iter().filter(|&&m| range.contains(Vertex::new(m))).count();
        prop_assert_eq!(frontier.count_active_in_range(range), expected);
        prop_assert_eq!(frontier.is_empty_in_range(range), expected == 0);
        prop_assert!(frontier.next_is_empty_in_range(VertexRange::new(0, len)));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// On one fragment shortest paths converge within |V| incremental
    /// supersteps and match Bellman-Ford.
    #[test]
    fn prop_sssp_single_fragment_converges((n, edges) in graph()) {
        let frags = EdgeCutFragment::partition(1, 0..n, &edges, |_| 0).unwrap();
        let config = WorkerConfig::default().with_thread_num(2);
        let results = runtime().block_on(run_local(Sssp::new(0), frags, config)).unwrap();
        let (summary, output) = &results[0];

        prop_assert!(summary.converged);
        prop_assert!(summary.supersteps <= n as usize);
        let expected = reference_distances(n, &edges, 0);
        for (gid, distance) in output.iter() {
            prop_assert_eq!(distance, expected[gid as usize], "vertex {}", gid);
        }
    }

    /// Any partitioning gives the same distances as a single fragment and
    /// still converges within |V| incremental supersteps.
    #[test]
    fn prop_sssp_partitioning_is_transparent((n, edges) in graph(), fnum in 1usize..5) {
        let frags = EdgeCutFragment::partition(fnum, 0..n, &edges, |g| (g % fnum as u64) as usize).unwrap();
        let config = WorkerConfig::default().with_thread_num(2);
        let results = runtime().block_on(run_local(Sssp::new(0), frags, config)).unwrap();

        let expected = reference_distances(n, &edges, 0);
        let mut covered = 0;
        for (summary, output) in &results {
            prop_assert!(summary.converged);
            prop_assert!(summary.supersteps <= n as usize, "{} supersteps for {} vertices", summary.supersteps, n);
            prop_assert_eq!(summary.supersteps, results[0].0.supersteps);
            for (gid, distance) in output.iter() {
                prop_assert_eq!(distance, expected[gid as usize], "vertex {}", gid);
                covered += 1;
            }
        }
        prop_assert_eq!(covered, n as usize);
    }
}
