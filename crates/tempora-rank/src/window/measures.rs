//! Static centrality measures recomputed from scratch on one graph.
//!
//! | Measure | Score of `v` | Epsilon |
//! |---------|--------------|---------|
//! | PageRank | stationary random-walk probability | none |
//! | Indegree | `|{u : u -> v}|` | yes |
//! | Harmonic | `Σ_{u≠v} 1/d(u, v)` (distances *to* `v`) | yes |
//! | Negative beta | `Σ_{u -> v} 1/outdeg(u)` | yes |
//!
//! The epsilon marks a node that is present with a true zero score, so that it
//! still appears in a positive-only export.

use std::collections::{HashMap, VecDeque};
use tempora_core::{NodeId, StreamGraph};

/// Added to every node's score by the epsilon-shifted measures.
pub const STATIC_EPSILON: f64 = 0.001;

/// Convergence tolerance per node; the L1 threshold is `n * PAGERANK_TOLERANCE`.
pub const PAGERANK_TOLERANCE: f64 = 1e-6;

/// Dense position of every node, in graph iteration order.
fn dense(graph: &StreamGraph) -> (Vec<NodeId>, HashMap<NodeId, usize>) {
    let nodes = graph.nodes().collect::<Vec<_>>();
    let positions = nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();
    (nodes, positions)
}

/// Result of a PageRank run.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRankRun {
    pub scores: Vec<(NodeId, f64)>,
    pub iterations: usize,
    pub converged: bool,
}

/// PageRank by power iteration.
///
/// Uniform teleport, dangling mass redistributed uniformly. Stops once the L1
/// change drops below `n * 1e-6` or after `max_iter` iterations; the last
/// iterate is returned either way.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn pagerank(graph: &StreamGraph, alpha: f64, max_iter: usize) -> PageRankRun {
    let (nodes, positions) = dense(graph);
    let n = nodes.len();
    if n == 0 {
        return PageRankRun {
            scores: Vec::new(),
            iterations: 0,
            converged: true,
        };
    }

    let n_f64 = n as f64;
    let out_degrees = nodes
        .iter()
        .map(|&v| graph.out_degree(v))
        .collect::<Vec<_>>();
    let successors = nodes
        .iter()
        .map(|&v| graph.out_neighbors(v).map(|w| positions[&w]).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    let mut scores = vec![1.0 / n_f64; n];
    let mut next = vec![0.0; n];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iter {
        iterations += 1;
        let dangling: f64 = out_degrees
            .iter()
            .zip(&scores)
            .filter(|(&deg, _)| deg == 0)
            .map(|(_, &s)| s)
            .sum();
        next.fill((1.0 - alpha) / n_f64 + alpha * dangling / n_f64);

        for (u, targets) in successors.iter().enumerate() {
            if targets.is_empty() {
                continue;
            }
            let share = alpha * scores[u] / targets.len() as f64;
            for &v in targets {
                next[v] += share;
            }
        }

        let diff: f64 = scores.iter().zip(&next).map(|(a, b)| (a - b).abs()).sum();
        std::mem::swap(&mut scores, &mut next);
        if diff < n_f64 * PAGERANK_TOLERANCE {
            converged = true;
            break;
        }
    }

    PageRankRun {
        scores: nodes.into_iter().zip(scores).collect(),
        iterations,
        converged,
    }
}

/// In-degree plus [`STATIC_EPSILON`].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn indegree(graph: &StreamGraph) -> Vec<(NodeId, f64)> {
    graph
        .nodes()
        .map(|v| (v, graph.in_degree(v) as f64 + STATIC_EPSILON))
        .collect()
}

/// Harmonic centrality over incoming shortest paths, plus [`STATIC_EPSILON`].
///
/// One BFS per source along out-edges: `O(V * E)`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn harmonic(graph: &StreamGraph) -> Vec<(NodeId, f64)> {
    let (nodes, positions) = dense(graph);
    let n = nodes.len();
    let successors = nodes
        .iter()
        .map(|&v| graph.out_neighbors(v).map(|w| positions[&w]).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    let mut centrality = vec![STATIC_EPSILON; n];
    let mut dist = vec![usize::MAX; n];
    let mut queue = VecDeque::new();
    for source in 0..n {
        dist.fill(usize::MAX);
        dist[source] = 0;
        queue.push_back(source);
        while let Some(v) = queue.pop_front() {
            for &w in &successors[v] {
                if dist[w] == usize::MAX {
                    dist[w] = dist[v] + 1;
                    centrality[w] += 1.0 / dist[w] as f64;
                    queue.push_back(w);
                }
            }
        }
    }
    nodes.into_iter().zip(centrality).collect()
}

/// In-degree weighted by the reciprocal out-degree of each source, plus [`STATIC_EPSILON`].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn negative_beta(graph: &StreamGraph) -> Vec<(NodeId, f64)> {
    let (nodes, positions) = dense(graph);
    let mut scores = vec![STATIC_EPSILON; nodes.len()];
    for edge in graph.edges() {
        scores[positions[&edge.trg]] += 1.0 / graph.out_degree(edge.src) as f64;
    }
    nodes.into_iter().zip(scores).collect()
}
