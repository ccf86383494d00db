//! Shared fixtures for on-disk graph tests.
#![allow(dead_code)]

use proxima::graph::{ListGraph, SliceVectors};
use rand::prelude::*;

/// Unit vectors spaced evenly around the circle, one per node.
pub fn circular_vectors(n: usize) -> SliceVectors {
    let mut vectors = SliceVectors::new(2);
    for i in 0..n {
        let angle = 2.0 * std::f32::consts::PI * i as f32 / n as f32;
        vectors.push(&[angle.cos(), angle.sin()]);
    }
    vectors
}

/// Every node adjacent to every other node, in ascending id order.
pub fn fully_connected(n: usize) -> ListGraph {
    let mut graph = ListGraph::new(n - 1);
    for _ in 0..n {
        graph.add_node(&[]).unwrap();
    }
    for i in 0..n as i32 {
        let neighbors: Vec<i32> = (0..n as i32).filter(|&j| j != i).collect();
        graph.set_neighbors(i, &neighbors).unwrap();
    }
    graph
}

/// Each node gets `m` distinct random neighbors (never itself).
pub fn randomly_connected(n: usize, m: usize, rng: &mut StdRng) -> ListGraph {
    let mut graph = ListGraph::new(m);
    for _ in 0..n {
        graph.add_node(&[]).unwrap();
    }
    for i in 0..n as i32 {
        let mut neighbors = Vec::with_capacity(m);
        while neighbors.len() < m {
            let candidate = rng.random_range(0..n as i32);
            if candidate != i && !neighbors.contains(&candidate) {
                neighbors.push(candidate);
            }
        }
        graph.set_neighbors(i, &neighbors).unwrap();
    }
    graph.set_entry_node(rng.random_range(0..n as i32));
    graph
}

/// Seeded random vectors, flat row-major.
pub fn random_vectors(n: usize, dimension: usize, rng: &mut StdRng) -> SliceVectors {
    let mut vectors = SliceVectors::new(dimension);
    let mut row = vec![0.0f32; dimension];
    for _ in 0..n {
        for x in &mut row {
            *x = rng.random_range(-1.0..1.0);
        }
        vectors.push(&row);
    }
    vectors
}
