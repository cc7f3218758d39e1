//! Append throughput benchmarks.
//!
//! # Running
//! ```bash
//! cargo bench --package chaingaps-core
//! ```
//!
//! Compares in-order, reversed and interleaved input. Reversed input grows
//! every chain from its head (map lookups); in-order input grows tails, which
//! scans the open chains.

use chaingaps_core::{Block, GapFinder};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

// ─── Block factory ────────────────────────────────────────────────────────────

fn run(chain: usize, len: usize) -> impl Iterator<Item = Block> {
    (1..=len).map(move |i| Block::new(format!("{chain:04}-{i:08}"), format!("{chain:04}-{:08}", i - 1)))
}

/// `chains` runs of `len` blocks, round-robin so every run stays open.
fn interleaved(chains: usize, len: usize) -> Vec<Block> {
    let runs: Vec<Vec<Block>> = (0..chains).map(|c| run(c, len).collect()).collect();
    (0..len)
        .flat_map(|i| runs.iter().map(move |r| r[i].clone()))
        .collect()
}

fn append_all(blocks: &[Block], batch: usize) -> GapFinder {
    let mut finder = GapFinder::new();
    for chunk in blocks.chunks(batch) {
        finder.append(chunk.to_vec()).expect("bench input is well formed");
    }
    finder
}

// ─── Benchmarks ───────────────────────────────────────────────────────────────

fn bench_single_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_chain");

    for &n in &[1_000usize, 10_000, 100_000] {
        let forward: Vec<Block> = run(0, n).collect();
        let mut backward = forward.clone();
        backward.reverse();

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("forward", n), &forward, |b, blocks| {
            b.iter(|| append_all(blocks, 1_000))
        });
        group.bench_with_input(BenchmarkId::new("backward", n), &backward, |b, blocks| {
            b.iter(|| append_all(blocks, 1_000))
        });
    }
    group.finish();
}

fn bench_many_chains(c: &mut Criterion) {
    let mut group = c.benchmark_group("many_chains");

    for &chains in &[10usize, 100, 1_000] {
        let blocks = interleaved(chains, 100);
        group.throughput(Throughput::Elements(blocks.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(chains), &blocks, |b, blocks| {
            b.iter(|| append_all(blocks, 1_000))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single_chain, bench_many_chains);
criterion_main!(benches);
