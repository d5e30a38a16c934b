//! Superstep engine benchmarks
//!
//! Shortest paths on a square grid, split into a varying number of fragments,
//! plus the two hot primitives of every superstep.

use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};

use bsp_engine::apps::Sssp;
use bsp_engine::bsp::{atomic_merge_min, AtomicBitset, Gid, ParallelEngine, VertexRange};
use bsp_engine::{hash_partition, run_local, EdgeCutFragment, WorkerConfig};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

const SIDE: u64 = 64;

/// Edges of a `side` x `side` grid, right and down, with small varying weights
fn grid_edges(side: u64) -> Vec<(Gid, Gid, f64)> {
    let mut edges = Vec::new();
    for y in 0..side {
        for x in 0..side {
            let v = y * side + x;
            let w = ((x * 7 + y * 13) % 5 + 1) as f64;
            if x + 1 < side {
                edges.push((v, v + 1, w));
            }
            if y + 1 < side {
                edges.push((v, v + side, w));
            }
        }
    }
    edges
}

fn bench_sssp(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();
    let edges = grid_edges(SIDE);
    let config = WorkerConfig::default().with_thread_num(2);

    let mut group = c.benchmark_group("sssp_grid");
    group.sample_size(20);
    for fnum in [1usize, 2, 4] {
        group.bench_with_input(BenchmarkId::from_parameter(fnum), &fnum, |b, &fnum| {
            b.to_async(&rt).iter(|| {
                let frags = EdgeCutFragment::partition(fnum, [], &edges, |g| hash_partition(g, fnum)).unwrap();
                let config = config.clone();
                async move { black_box(run_local(Sssp::new(0), frags, config).await.unwrap()) }
            });
        });
    }
    group.finish();
}

fn bench_primitives(c: &mut Criterion) {
    let engine = ParallelEngine::new(&WorkerConfig::default().with_thread_num(4)).unwrap();
    let len = 1 << 20;

    let bitset = AtomicBitset::new(len);
    for bit in (0..len).step_by(97) {
        bitset.set(bit);
    }
    c.bench_function("for_each_active_sparse", |b| {
        b.iter(|| {
            let hits = AtomicU64::new(0);
            engine
                .for_each_active(&bitset, VertexRange::new(0, len), |_, _| {
                    hits.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                })
                .unwrap();
            black_box(hits.into_inner())
        });
    });

    c.bench_function("atomic_merge_min_contended", |b| {
        b.iter(|| {
            let slot = AtomicU64::new(u64::MAX);
            engine
                .for_each(VertexRange::new(0, 100_000), |_, v| {
                    atomic_merge_min(&slot, (v.index() as u64).wrapping_mul(2_654_435_761) % 1_000_003);
                    Ok(())
                })
                .unwrap();
            black_box(slot.into_inner())
        });
    });
}

criterion_group!(benches, bench_sssp, bench_primitives);
criterion_main!(benches);
