// Copyright 2025 the Flatfeature Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::path::Path;
use std::sync::Arc;

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use flatfeature_index::{Aabb2D, PackedRTree};
use flatfeature_reader::header::MAGIC_BYTES;
use flatfeature_reader::{FeatureRequest, GeometryType, Source};

/// Write an `n`×`n` grid of points, with an index when `node_size` is non-zero.
fn write_grid(path: &Path, n: usize, node_size: u16) {
    let count = n * n;
    let points: Vec<(f64, f64)> = (0..count)
        .map(|i| ((i % n) as f64, (i / n) as f64))
        .collect();

    let mut header = vec![GeometryType::Point.tag(), 0];
    header.extend_from_slice(&node_size.to_le_bytes());
    header.extend_from_slice(&(count as u64).to_le_bytes());
    for v in [0.0, 0.0, (n - 1) as f64, (n - 1) as f64] {
        header.extend_from_slice(&f64::to_le_bytes(v));
    }
    header.extend_from_slice(&0_u16.to_le_bytes());

    let mut index = Vec::new();
    if node_size > 0 {
        let leaves: Vec<(Aabb2D<f64>, u64)> = points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| (Aabb2D::new(x, y, x, y), i as u64))
            .collect();
        let tree = PackedRTree::from_ordered_leaves(&leaves, node_size).unwrap();
        for pos in 0..tree.num_nodes() {
            let r = tree.node_rect(pos).unwrap();
            for v in [r.min_x, r.min_y, r.max_x, r.max_y] {
                index.extend_from_slice(&v.to_le_bytes());
            }
        }
        for pos in 0..tree.num_nodes() {
            index.extend_from_slice(&tree.node_index(pos).unwrap().to_le_bytes());
        }
    }

    let mut offsets = Vec::with_capacity(count * 8);
    let mut records = Vec::new();
    for (fid, &(x, y)) in points.iter().enumerate() {
        offsets.extend_from_slice(&(records.len() as u64).to_le_bytes());
        let mut body = (fid as u64).to_le_bytes().to_vec();
        body.push(GeometryType::Point.tag());
        body.extend_from_slice(&2_u32.to_le_bytes());
        body.extend_from_slice(&x.to_le_bytes());
        body.extend_from_slice(&y.to_le_bytes());
        body.extend_from_slice(&0_u32.to_le_bytes());
        body.extend_from_slice(&0_u32.to_le_bytes());
        records.extend_from_slice(&(body.len() as u32).to_le_bytes());
        records.extend_from_slice(&body);
    }

    let mut bytes = MAGIC_BYTES.to_vec();
    bytes.extend_from_slice(&(header.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&header);
    bytes.extend_from_slice(&index);
    bytes.extend_from_slice(&offsets);
    bytes.extend_from_slice(&records);
    std::fs::write(path, bytes).unwrap();
}

fn bench_query(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let n = 200;
    let indexed = dir.path().join("indexed.ffb");
    let plain = dir.path().join("plain.ffb");
    write_grid(&indexed, n, 16);
    write_grid(&plain, n, 0);
    let indexed = Arc::new(Source::open(&indexed).unwrap());
    let plain = Arc::new(Source::open(&plain).unwrap());

    let small = Aabb2D::new(50.0, 50.0, 59.0, 59.0);
    let mut group = c.benchmark_group("query");
    group.throughput(Throughput::Elements(100));
    group.bench_function("indexed_small_rect", |b| {
        b.iter(|| {
            let request = FeatureRequest::new().with_filter_rect(black_box(small));
            black_box(indexed.features(request).count())
        });
    });
    group.bench_function("scan_small_rect", |b| {
        b.iter(|| {
            let request = FeatureRequest::new().with_filter_rect(black_box(small));
            black_box(plain.features(request).count())
        });
    });
    group.throughput(Throughput::Elements((n * n) as u64));
    group.bench_function("scan_all", |b| {
        b.iter(|| black_box(plain.features(FeatureRequest::new()).count()));
    });
    group.finish();
}

fn bench_open(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("indexed.ffb");
    write_grid(&path, 200, 16);
    c.bench_function("open_indexed_n200", |b| {
        b.iter(|| black_box(Source::open(&path).unwrap().feature_count()));
    });
}

criterion_group!(benches, bench_query, bench_open);
criterion_main!(benches);
