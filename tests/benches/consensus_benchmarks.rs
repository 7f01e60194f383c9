//! # Consensus Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | qc-01 Poll | tally of K votes |
//! | qc-02 Topological | add + record_poll over a deep chain and a wide fork |
//! | shared-types | block encode / parse |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use qc_01_poll::{PollResult, Vote};
use qc_02_topological::{Parameters, Topological};
use shared_types::{Block, BlockId, NodeId};
use std::time::Duration;

fn params() -> Parameters {
    Parameters {
        k: 21,
        alpha_preference: 13,
        alpha_confidence: 18,
        beta: 20,
        concurrent_repolls: 4,
        max_outstanding_items: 4096,
        ..Parameters::mainnet()
    }
}

fn chain(genesis: BlockId, len: u64) -> Vec<Block> {
    let mut parent = genesis;
    (1..=len)
        .map(|height| {
            let block = Block::new(parent, height, height as i64, NodeId([1; 20]), Vec::new());
            parent = block.id();
            block
        })
        .collect()
}

// ============================================================================
// QC-01: Poll tally
// ============================================================================

fn bench_poll_tally(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-01-poll");
    for k in [5usize, 21, 100] {
        let votes: Vec<Vote> = (0..k)
            .map(|i| Vote::new(BlockId([(i % 3) as u8; 32]), BlockId([0; 32])))
            .collect();
        group.throughput(Throughput::Elements(k as u64));
        group.bench_with_input(BenchmarkId::new("tally", k), &votes, |b, votes| {
            b.iter(|| black_box(PollResult::tally(votes.iter())))
        });
    }
    group.finish();
}

// ============================================================================
// QC-02: Topological
// ============================================================================

fn bench_record_poll_deep_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-02-topological");
    group.measurement_time(Duration::from_secs(5));

    let genesis = Block::genesis(0);
    for depth in [16u64, 128, 1024] {
        let blocks = chain(genesis.id(), depth);
        let tip = blocks.last().map(Block::id).unwrap_or_default();
        let votes = vec![tip; 21];

        group.bench_with_input(BenchmarkId::new("record_poll_chain", depth), &blocks, |b, blocks| {
            b.iter_batched(
                || {
                    let mut store = Topological::new();
                    store.initialize(params(), genesis.id(), 0, 0).unwrap();
                    for block in blocks {
                        store.add(block.clone()).unwrap();
                    }
                    store
                },
                |mut store| {
                    store.record_poll(black_box(&votes)).unwrap();
                    store
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_add_wide_fork(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-02-topological");
    let genesis = Block::genesis(0);
    for width in [8u8, 64, 255] {
        let siblings: Vec<Block> = (0..width)
            .map(|i| Block::new(genesis.id(), 1, 1, NodeId([i; 20]), vec![vec![i]]))
            .collect();
        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::new("add_siblings", width), &siblings, |b, siblings| {
            b.iter(|| {
                let mut store = Topological::new();
                store.initialize(params(), genesis.id(), 0, 0).unwrap();
                for block in siblings {
                    store.add(block.clone()).unwrap();
                }
                black_box(store.num_processing())
            })
        });
    }
    group.finish();
}

// ============================================================================
// shared-types: block codec
// ============================================================================

fn bench_block_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("block-codec");
    for txs in [0usize, 100, 1000] {
        let block = Block::new(
            BlockId([7; 32]),
            42,
            1,
            NodeId([3; 20]),
            (0..txs).map(|i| vec![i as u8; 128]).collect(),
        );
        let bytes = block.encode();
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::new("encode", txs), &block, |b, block| {
            b.iter(|| black_box(block.encode()))
        });
        group.bench_with_input(BenchmarkId::new("parse", txs), &bytes, |b, bytes| {
            b.iter(|| black_box(Block::parse(bytes).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_poll_tally,
    bench_record_poll_deep_chain,
    bench_add_wide_fork,
    bench_block_codec
);
criterion_main!(benches);
