// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Criterion benchmarks for network analysis on a generated grid.
//!
//! A tank sits at the top-left corner of an n x n grid of houses; pipes run
//! right and down.

use aquanet::network::Network;
use aquanet::types::PressureBand;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn cell(row: usize, col: usize) -> String {
    format!("H{row}_{col}")
}

fn grid(n: usize) -> Network {
    let mut net = Network::new();
    let _ = net.add_tank("T", (n * n * 10) as f64, &[] as &[&str]);
    for row in 0..n {
        for col in 0..n {
            let _ = net.add_house(&cell(row, col), 1.0);
        }
    }
    let _ = net.add_pipe("T", &cell(0, 0), (n * 4) as f64);
    for row in 0..n {
        for col in 0..n {
            if col + 1 < n {
                let _ = net.add_pipe(&cell(row, col), &cell(row, col + 1), 3.0);
            }
            if row + 1 < n {
                let _ = net.add_pipe(&cell(row, col), &cell(row + 1, col), 3.0);
            }
        }
    }
    net
}

// ---------------------------------------------------------------------------
// Benchmark: max flow
// ---------------------------------------------------------------------------

fn bench_max_flow(c: &mut Criterion) {
    let mut group = c.benchmark_group("max_flow");
    for n in [5, 10, 20] {
        let net = grid(n);
        let sink = cell(n - 1, n - 1);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| black_box(net.compute_max_flow("T", &sink)));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: mutation with full propagation
// ---------------------------------------------------------------------------

fn bench_obstruction(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_obstruction");
    for n in [5, 10, 20] {
        let mut net = grid(n);
        let to = cell(0, 1);
        let mut percent = 0;
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                percent = (percent + 7) % 100;
                black_box(net.set_obstruction(&cell(0, 0), &to, percent))
            });
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: diagnostics
// ---------------------------------------------------------------------------

fn bench_diagnostics(c: &mut Criterion) {
    let net = grid(10);
    c.bench_function("diagnose_10", |b| b.iter(|| black_box(net.diagnose())));
    c.bench_function("advise_10", |b| {
        b.iter(|| black_box(net.advise(PressureBand::default())));
    });
    c.bench_function("route_10", |b| {
        b.iter(|| black_box(net.find_alternative_route(&cell(9, 9))));
    });
}

criterion_group!(benches, bench_max_flow, bench_obstruction, bench_diagnostics);
criterion_main!(benches);
