// Copyright 2025 the Flatfeature Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use flatfeature_index::{Aabb2D, PackedRTree};

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

/// Row-major grid cells, already in a spatially coherent order.
fn gen_grid_leaves(n: usize, cell: f64) -> Vec<(Aabb2D<f64>, u64)> {
    let mut out = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            let r = Aabb2D::<f64>::from_xywh(x as f64 * cell, y as f64 * cell, cell, cell);
            out.push((r, out.len() as u64));
        }
    }
    out
}

/// Clustered boxes, sorted by cluster so siblings stay close.
fn gen_clustered_leaves(
    n_clusters: usize,
    per_cluster: usize,
    spread: f64,
) -> Vec<(Aabb2D<f64>, u64)> {
    let mut out = Vec::with_capacity(n_clusters * per_cluster);
    let mut rng = Rng::new(0xC1A5_7E55_9999_ABCD);
    for _ in 0..n_clusters {
        let (cx, cy) = (rng.next_f64() * 2000.0, rng.next_f64() * 2000.0);
        for _ in 0..per_cluster {
            let dx = (rng.next_f64() - 0.5) * spread;
            let dy = (rng.next_f64() - 0.5) * spread;
            let r = Aabb2D::<f64>::from_xywh(cx + dx, cy + dy, 12.0, 12.0);
            out.push((r, out.len() as u64));
        }
    }
    out
}

fn to_bytes(tree: &PackedRTree) -> Vec<u8> {
    let mut out = Vec::with_capacity(tree.num_nodes() * 40);
    for pos in 0..tree.num_nodes() {
        if let Some(r) = tree.node_rect(pos) {
            for v in [r.min_x, r.min_y, r.max_x, r.max_y] {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
    }
    for pos in 0..tree.num_nodes() {
        out.extend_from_slice(&tree.node_index(pos).unwrap_or_default().to_le_bytes());
    }
    out
}

fn linear_scan(leaves: &[(Aabb2D<f64>, u64)], query: &Aabb2D<f64>) -> usize {
    leaves.iter().filter(|(r, _)| r.intersects(query)).count()
}

fn bench_search(c: &mut Criterion) {
    let query = Aabb2D::<f64>::from_xywh(100.0, 100.0, 400.0, 400.0);
    let mut group = c.benchmark_group("search");
    for &n in &[64usize, 128, 256] {
        let leaves = gen_grid_leaves(n, 10.0);
        group.throughput(Throughput::Elements((n * n) as u64));
        for node_size in [4_u16, 16] {
            let tree = PackedRTree::from_ordered_leaves(&leaves, node_size).unwrap();
            group.bench_function(format!("packed_grid_n{n}_f{node_size}"), |b| {
                b.iter(|| black_box(tree.search(black_box(&query)).len()));
            });
        }
        group.bench_function(format!("linear_grid_n{n}"), |b| {
            b.iter(|| black_box(linear_scan(&leaves, black_box(&query))));
        });
    }

    let leaves = gen_clustered_leaves(64, 256, 300.0);
    let tree = PackedRTree::from_ordered_leaves(&leaves, 16).unwrap();
    group.throughput(Throughput::Elements(leaves.len() as u64));
    group.bench_function("packed_clustered", |b| {
        b.iter(|| black_box(tree.search(black_box(&query)).len()));
    });
    group.bench_function("linear_clustered", |b| {
        b.iter(|| black_box(linear_scan(&leaves, black_box(&query))));
    });
    group.finish();
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");
    for &n in &[128usize, 256] {
        let leaves = gen_grid_leaves(n, 10.0);
        let num_items = leaves.len() as u64;
        group.throughput(Throughput::Elements(num_items));
        group.bench_function(format!("from_ordered_leaves_n{n}"), |b| {
            b.iter(|| {
                let tree = PackedRTree::from_ordered_leaves(&leaves, 16).unwrap();
                black_box(tree.num_nodes())
            });
        });
        let bytes = to_bytes(&PackedRTree::from_ordered_leaves(&leaves, 16).unwrap());
        group.bench_function(format!("from_bytes_n{n}"), |b| {
            b.iter_batched(
                || bytes.clone(),
                |bytes| {
                    let tree = PackedRTree::from_bytes(&bytes, num_items, 16).unwrap();
                    black_box(tree.num_nodes())
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_search, bench_load);
criterion_main!(benches);
