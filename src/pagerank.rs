//! Authority solver: PageRank, personalized PageRank, and a local push
//! approximation over the Jaccard similarity graph.
//!
//! Implements the standard power-iteration formulation over a dense,
//! flat-`Vec`-backed adjacency representation rather than pulling in a
//! graph crate, consistent with the rest of this crate's numeric code
//! (scoring, semantic similarity).

use std::collections::BTreeMap;
use std::time::Instant;

use crate::config::PageRankConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::JaccardEdge;

/// Diagnostics returned alongside a solved score vector, useful for the
/// admin `rank` CLI subcommand and for tests.
#[derive(Debug, Clone, Copy)]
pub struct RankMetrics {
    pub iterations: usize,
    pub converged: bool,
    pub final_delta: f64,
    pub elapsed_ms: f64,
}

/// Dense adjacency built once per solve: books remapped to `0..n`, with
/// parallel edges collapsed and self-loops dropped.
struct Adjacency {
    book_ids: Vec<i64>,
    /// out_neighbours[i] = (j, weight) pairs, weight is the edge similarity.
    out_neighbours: Vec<Vec<(usize, f64)>>,
    in_neighbours: Vec<Vec<(usize, f64)>>,
    out_weight_sum: Vec<f64>,
    dangling: Vec<usize>,
}

fn build_adjacency(book_ids: &[i64], edges: &[JaccardEdge]) -> Adjacency {
    let index: BTreeMap<i64, usize> = book_ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    let n = book_ids.len();
    let mut out_neighbours = vec![Vec::new(); n];
    let mut in_neighbours = vec![Vec::new(); n];

    for edge in edges {
        if edge.book_id_1 == edge.book_id_2 {
            continue;
        }
        let (Some(&a), Some(&b)) = (index.get(&edge.book_id_1), index.get(&edge.book_id_2)) else {
            continue;
        };
        // Jaccard edges are undirected: treat as reciprocal directed edges
        // so the authority mass flows both ways.
        out_neighbours[a].push((b, edge.similarity));
        in_neighbours[b].push((a, edge.similarity));
        out_neighbours[b].push((a, edge.similarity));
        in_neighbours[a].push((b, edge.similarity));
    }

    let mut out_weight_sum = vec![0.0; n];
    let mut dangling = Vec::new();
    for i in 0..n {
        let sum: f64 = out_neighbours[i].iter().map(|&(_, w)| w).sum();
        out_weight_sum[i] = sum;
        if out_neighbours[i].is_empty() {
            dangling.push(i);
        }
    }

    Adjacency {
        book_ids: book_ids.to_vec(),
        out_neighbours,
        in_neighbours,
        out_weight_sum,
        dangling,
    }
}

fn l1_delta(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

/// Global PageRank (uniform restart distribution) over the whole graph.
pub fn page_rank(
    book_ids: &[i64],
    edges: &[JaccardEdge],
    config: &PageRankConfig,
) -> EngineResult<(BTreeMap<i64, f64>, RankMetrics)> {
    let n = book_ids.len();
    if n == 0 {
        return Err(EngineError::PreconditionFailed(
            "cannot rank an empty corpus".into(),
        ));
    }
    let adjacency = build_adjacency(book_ids, edges);
    let restart = vec![1.0 / n as f64; n];
    solve(&adjacency, &restart, &restart, config)
}

/// Personalized PageRank: restart mass is concentrated on `seed_book_ids`
/// instead of spread uniformly.
pub fn personalized_page_rank(
    book_ids: &[i64],
    edges: &[JaccardEdge],
    seed_book_ids: &[i64],
    config: &PageRankConfig,
) -> EngineResult<(BTreeMap<i64, f64>, RankMetrics)> {
    let n = book_ids.len();
    if n == 0 {
        return Err(EngineError::PreconditionFailed(
            "cannot rank an empty corpus".into(),
        ));
    }
    let index: BTreeMap<i64, usize> = book_ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    let seeds: Vec<usize> = seed_book_ids
        .iter()
        .filter_map(|id| index.get(id).copied())
        .collect();
    if seeds.is_empty() {
        return Err(EngineError::InvalidInput(
            "personalized page rank requires at least one seed book present in the graph".into(),
        ));
    }

    let mut restart = vec![0.0; n];
    let weight = 1.0 / seeds.len() as f64;
    for &s in &seeds {
        restart[s] = weight;
    }
    let adjacency = build_adjacency(book_ids, edges);
    solve(&adjacency, &restart, &restart, config)
}

fn solve(
    adjacency: &Adjacency,
    restart: &[f64],
    initial: &[f64],
    config: &PageRankConfig,
) -> EngineResult<(BTreeMap<i64, f64>, RankMetrics)> {
    let start = Instant::now();
    let n = adjacency.book_ids.len();
    let mut scores = initial.to_vec();
    let mut iterations = 0;
    let mut converged = false;
    let mut final_delta = f64::INFINITY;

    for _ in 0..config.max_iterations {
        let dangling_mass: f64 = adjacency.dangling.iter().map(|&i| scores[i]).sum();
        let mut next = vec![0.0; n];

        #[allow(clippy::needless_range_loop)]
        for j in 0..n {
            let mut incoming = 0.0;
            for &(i, weight) in &adjacency.in_neighbours[j] {
                if adjacency.out_weight_sum[i] > 0.0 {
                    incoming += scores[i] * weight / adjacency.out_weight_sum[i];
                }
            }
            next[j] = (1.0 - config.damping) * restart[j]
                + config.damping * (incoming + dangling_mass * restart[j]);
        }

        iterations += 1;
        final_delta = l1_delta(&scores, &next);
        scores = next;
        if final_delta <= config.tolerance {
            converged = true;
            break;
        }
    }

    let result = adjacency
        .book_ids
        .iter()
        .zip(scores.iter())
        .map(|(&id, &score)| (id, score))
        .collect();

    Ok((
        result,
        RankMetrics {
            iterations,
            converged,
            final_delta,
            elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
        },
    ))
}

/// Push-based local approximation of personalized PageRank (Andersen-Chung-Lang
/// style), useful for "what's locally authoritative near this book" without
/// solving the whole graph. Output is unnormalized residual mass pushed to
/// each node, not a probability distribution.
pub fn push_ppr(
    book_ids: &[i64],
    edges: &[JaccardEdge],
    seed_book_id: i64,
    damping: f64,
    epsilon: f64,
) -> EngineResult<BTreeMap<i64, f64>> {
    let index: BTreeMap<i64, usize> = book_ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    let Some(&seed) = index.get(&seed_book_id) else {
        return Err(EngineError::NotFound(format!("book {seed_book_id}")));
    };
    let adjacency = build_adjacency(book_ids, edges);
    let n = book_ids.len();

    let mut p = vec![0.0; n];
    let mut r = vec![0.0; n];
    r[seed] = 1.0;

    let mut frontier = vec![seed];
    while let Some(u) = frontier.pop() {
        if adjacency.out_weight_sum[u] <= 0.0 {
            // Dangling node: all residual mass becomes rank directly.
            p[u] += r[u];
            r[u] = 0.0;
            continue;
        }
        if r[u] / adjacency.out_weight_sum[u] < epsilon {
            continue;
        }
        let residual = r[u];
        p[u] += (1.0 - damping) * residual;
        r[u] = 0.0;
        for &(v, weight) in &adjacency.out_neighbours[u] {
            let share = damping * residual * weight / adjacency.out_weight_sum[u];
            r[v] += share;
            if r[v] / adjacency.out_weight_sum[v].max(1.0) >= epsilon {
                frontier.push(v);
            }
        }
    }

    Ok(adjacency
        .book_ids
        .iter()
        .zip(p.iter())
        .filter(|(_, &score)| score > 0.0)
        .map(|(&id, &score)| (id, score))
        .collect())
}
