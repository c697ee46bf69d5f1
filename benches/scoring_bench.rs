//! Criterion benchmarks for the hot scoring and ranking paths.
//!
//! Run with: cargo bench

use std::collections::BTreeMap;

use athenaeum::config::{Bm25Config, PageRankConfig};
use athenaeum::models::JaccardEdge;
use athenaeum::pagerank::page_rank;
use athenaeum::scoring::{bm25_idf, bm25_score, CandidateStats};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn make_candidate(doc_length: i64, terms: &[(&str, u32)]) -> CandidateStats {
    let mut term_frequencies = BTreeMap::new();
    for &(term, tf) in terms {
        term_frequencies.insert(term.to_string(), tf);
    }
    CandidateStats {
        doc_length,
        term_frequencies,
        positions: BTreeMap::new(),
    }
}

fn bench_bm25(c: &mut Criterion) {
    let config = Bm25Config::default();
    let idfs: BTreeMap<String, f64> = [("alpha", 1.5), ("beta", 2.1), ("gamma", 0.8)]
        .into_iter()
        .map(|(t, v)| (t.to_string(), v))
        .collect();

    let mut group = c.benchmark_group("bm25_score");

    for term_count in [1usize, 2, 3] {
        let terms: Vec<(&str, u32)> = [("alpha", 5u32), ("beta", 2), ("gamma", 9)]
            .into_iter()
            .take(term_count)
            .collect();
        let candidate = make_candidate(320, &terms);

        group.bench_with_input(BenchmarkId::new("terms", term_count), &term_count, |b, _| {
            b.iter(|| bm25_score(black_box(&candidate), black_box(&idfs), 280.0, &config))
        });
    }

    group.finish();
}

fn bench_bm25_idf(c: &mut Criterion) {
    c.bench_function("bm25_idf", |b| {
        b.iter(|| bm25_idf(black_box(42), black_box(10_000)))
    });
}

fn bench_pagerank(c: &mut Criterion) {
    let config = PageRankConfig::default();
    let mut group = c.benchmark_group("pagerank");

    for n in [100usize, 1_000, 5_000] {
        let book_ids: Vec<i64> = (0..n as i64).collect();
        // Ring plus a few chords, so the graph is connected but sparse.
        let mut edges = Vec::with_capacity(n + n / 10);
        for i in 0..n {
            let a = i as i64;
            let b = ((i + 1) % n) as i64;
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            edges.push(JaccardEdge { book_id_1: lo, book_id_2: hi, similarity: 0.5 });
        }
        for i in (0..n).step_by(10) {
            let a = i as i64;
            let b = ((i + n / 2) % n) as i64;
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            if lo != hi {
                edges.push(JaccardEdge { book_id_1: lo, book_id_2: hi, similarity: 0.3 });
            }
        }

        group.bench_with_input(BenchmarkId::new("power_iteration", n), &n, |b, _| {
            b.iter(|| page_rank(black_box(&book_ids), black_box(&edges), &config))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_bm25, bench_bm25_idf, bench_pagerank);
criterion_main!(benches);
