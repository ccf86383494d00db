//! Benchmarks for random-access artifact reads.
//!
//! Measures the per-record fetch paths a beam search drives: neighbor
//! lists, inline vectors, and bulk fused-ADC scoring.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use proxima::disk::{
    FusedAdcWriter, InlineVectorsWriter, OnDiskGraphIndex, OnDiskWriterBuilder,
};
use proxima::graph::{ListGraph, SliceVectors};
use proxima::io::MappedReader;
use proxima::pq::ProductQuantizer;
use proxima::similarity::Similarity;
use rand::prelude::*;

const N: usize = 5_000;
const M: usize = 16;
const D: usize = 32;
const S: usize = 8;

fn build_artifact() -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut graph = ListGraph::new(M);
    for _ in 0..N {
        graph.add_node(&[]).unwrap();
    }
    for i in 0..N as i32 {
        let mut neighbors = Vec::with_capacity(M);
        while neighbors.len() < M {
            let candidate = rng.random_range(0..N as i32);
            if candidate != i && !neighbors.contains(&candidate) {
                neighbors.push(candidate);
            }
        }
        graph.set_neighbors(i, &neighbors).unwrap();
    }

    let mut flat = vec![0.0f32; N * D];
    for x in &mut flat {
        *x = rng.random_range(-1.0..1.0);
    }
    let mut vectors = SliceVectors::new(D);
    for row in flat.chunks(D) {
        vectors.push(row);
    }
    let pq = ProductQuantizer::fit(D, S, &flat).unwrap();

    let mut writer = OnDiskWriterBuilder::new(&graph)
        .with(Box::new(InlineVectorsWriter::new(&vectors)))
        .with(Box::new(FusedAdcWriter::new(pq, &graph, &vectors).unwrap()))
        .build()
        .unwrap();
    let mut artifact = Vec::new();
    writer.write(&mut artifact).unwrap();
    artifact
}

fn bench_reads(c: &mut Criterion) {
    let index = OnDiskGraphIndex::load(MappedReader::new(build_artifact()), 0).unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    let query: Vec<f32> = (0..D).map(|_| rng.random_range(-1.0..1.0)).collect();

    let mut group = c.benchmark_group("on_disk_view");

    let mut view = index.view().unwrap();
    group.bench_function("neighbors", |b| {
        b.iter(|| {
            let node = rng.random_range(0..N as i32);
            black_box(view.neighbors(node).unwrap().len())
        })
    });

    group.bench_function("vector", |b| {
        b.iter(|| {
            let node = rng.random_range(0..N as i32);
            black_box(view.vector(node).unwrap()[0])
        })
    });

    let mut scorer = index.approx_scorer(&query, Similarity::Euclidean).unwrap();
    group.bench_function("approx_score_block", |b| {
        b.iter(|| {
            let node = rng.random_range(0..N as i32);
            black_box(scorer.score_neighbors(node).unwrap()[0])
        })
    });

    let mut reranker = index.reranker(&query, Similarity::Euclidean).unwrap();
    group.bench_function("rerank", |b| {
        b.iter(|| {
            let node = rng.random_range(0..N as i32);
            black_box(reranker.score(node).unwrap())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_reads);
criterion_main!(benches);
