// Copyright 2025 the Flatfeature Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixture writer for integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::path::{Path, PathBuf};

use flatfeature_reader::header::MAGIC_BYTES;
use flatfeature_reader::{Aabb2D, Dimensions, GeometryType, PackedRTree};

#[derive(Clone, Debug)]
pub struct TestFeature {
    pub fid: u64,
    pub geometry_type: GeometryType,
    pub coords: Vec<f64>,
    pub lengths: Vec<u32>,
    pub attributes: Vec<u8>,
}

pub fn point(fid: u64, x: f64, y: f64) -> TestFeature {
    TestFeature {
        fid,
        geometry_type: GeometryType::Point,
        coords: vec![x, y],
        lengths: vec![],
        attributes: format!("point-{fid}").into_bytes(),
    }
}

pub fn line(fid: u64, coords: &[(f64, f64)]) -> TestFeature {
    TestFeature {
        fid,
        geometry_type: GeometryType::LineString,
        coords: coords.iter().flat_map(|&(x, y)| [x, y]).collect(),
        lengths: vec![],
        attributes: vec![],
    }
}

pub fn polygon(fid: u64, rings: &[Vec<(f64, f64)>]) -> TestFeature {
    let mut coords = Vec::new();
    let mut lengths = Vec::new();
    for ring in rings {
        coords.extend(ring.iter().flat_map(|&(x, y)| [x, y]));
        lengths.push(ring.len() as u32 * 2);
    }
    if lengths.len() == 1 {
        lengths.clear();
    }
    TestFeature {
        fid,
        geometry_type: GeometryType::Polygon,
        coords,
        lengths,
        attributes: vec![],
    }
}

pub fn square(x: f64, y: f64, size: f64) -> Vec<(f64, f64)> {
    vec![
        (x, y),
        (x + size, y),
        (x + size, y + size),
        (x, y + size),
        (x, y),
    ]
}

#[derive(Clone, Debug)]
pub struct Fixture {
    pub geometry_type: GeometryType,
    pub dimensions: Dimensions,
    pub node_size: u16,
    pub name: String,
    pub features: Vec<TestFeature>,
    /// Grows every index leaf by this much on each side.
    pub leaf_padding: f64,
    /// Replaces the computed offset table entries.
    pub offsets_override: Option<Vec<u64>>,
}

impl Fixture {
    pub fn new(geometry_type: GeometryType, node_size: u16, features: Vec<TestFeature>) -> Self {
        Self {
            geometry_type,
            dimensions: Dimensions::empty(),
            node_size,
            name: "fixture".into(),
            features,
            leaf_padding: 0.0,
            offsets_override: None,
        }
    }
}

/// Sections of a built file.
#[derive(Clone, Debug)]
pub struct Built {
    pub bytes: Vec<u8>,
    pub header_len: usize,
    pub index_len: usize,
    pub offsets: Vec<u64>,
}

impl Built {
    pub fn data_section_start(&self) -> usize {
        8 + 4 + self.header_len + self.index_len + 8 * self.offsets.len()
    }
}

pub fn build(fixture: &Fixture) -> Built {
    let stride = fixture.dimensions.count();
    let bounds: Vec<Aabb2D<f64>> = fixture
        .features
        .iter()
        .map(|f| {
            let mut b = Aabb2D::<f64>::EMPTY;
            for c in f.coords.chunks_exact(stride) {
                b.expand_to(c[0], c[1]);
            }
            b
        })
        .collect();
    let envelope = bounds
        .iter()
        .fold(Aabb2D::<f64>::EMPTY, |acc, b| acc.union(b));

    let mut header = vec![fixture.geometry_type.tag(), fixture.dimensions.bits()];
    header.extend_from_slice(&fixture.node_size.to_le_bytes());
    header.extend_from_slice(&(fixture.features.len() as u64).to_le_bytes());
    let e = envelope;
    for v in [e.min_x, e.min_y, e.max_x, e.max_y] {
        header.extend_from_slice(&v.to_le_bytes());
    }
    header.extend_from_slice(&(fixture.name.len() as u16).to_le_bytes());
    header.extend_from_slice(fixture.name.as_bytes());

    let mut index = Vec::new();
    if fixture.node_size > 0 {
        let p = fixture.leaf_padding;
        let mut leaves: Vec<(Aabb2D<f64>, u64)> = bounds
            .iter()
            .enumerate()
            .map(|(i, b)| {
                let padded = Aabb2D::new(b.min_x - p, b.min_y - p, b.max_x + p, b.max_y + p);
                (padded, i as u64)
            })
            .collect();
        hilbert_sort(&mut leaves, &envelope);
        let tree = PackedRTree::from_ordered_leaves(&leaves, fixture.node_size).unwrap();
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

    let mut records = Vec::new();
    let mut offsets = Vec::new();
    for f in &fixture.features {
        offsets.push(records.len() as u64);
        let body = encode_record(f);
        records.extend_from_slice(&(body.len() as u32).to_le_bytes());
        records.extend_from_slice(&body);
    }
    if let Some(o) = &fixture.offsets_override {
        offsets = o.clone();
    }

    let mut bytes = MAGIC_BYTES.to_vec();
    bytes.extend_from_slice(&(header.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&header);
    bytes.extend_from_slice(&index);
    for o in &offsets {
        bytes.extend_from_slice(&o.to_le_bytes());
    }
    bytes.extend_from_slice(&records);

    Built {
        bytes,
        header_len: header.len(),
        index_len: index.len(),
        offsets,
    }
}

pub fn encode_record(f: &TestFeature) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&f.fid.to_le_bytes());
    out.push(f.geometry_type.tag());
    out.extend_from_slice(&(f.coords.len() as u32).to_le_bytes());
    for c in &f.coords {
        out.extend_from_slice(&c.to_le_bytes());
    }
    out.extend_from_slice(&(f.lengths.len() as u32).to_le_bytes());
    for l in &f.lengths {
        out.extend_from_slice(&l.to_le_bytes());
    }
    out.extend_from_slice(&(f.attributes.len() as u32).to_le_bytes());
    out.extend_from_slice(&f.attributes);
    out
}

pub fn write_bytes(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

pub fn write(dir: &Path, name: &str, fixture: &Fixture) -> PathBuf {
    write_bytes(dir, name, &build(fixture).bytes)
}

/// Order leaves along a Hilbert curve over `extent`, as writers do before packing.
pub fn hilbert_sort(leaves: &mut [(Aabb2D<f64>, u64)], extent: &Aabb2D<f64>) {
    const N: u32 = 1 << 16;
    let scale = |v: f64, min: f64, size: f64| -> u32 {
        if size > 0.0 {
            (((v - min) / size) * f64::from(N - 1)) as u32
        } else {
            0
        }
    };
    leaves.sort_by_key(|(b, _)| {
        let x = scale((b.min_x + b.max_x) / 2.0, extent.min_x, extent.width());
        let y = scale((b.min_y + b.max_y) / 2.0, extent.min_y, extent.height());
        hilbert_index(N, x, y)
    });
}

fn hilbert_index(n: u32, mut x: u32, mut y: u32) -> u64 {
    let mut d = 0_u64;
    let mut s = n / 2;
    while s > 0 {
        let rx = u32::from((x & s) > 0);
        let ry = u32::from((y & s) > 0);
        d += u64::from(s) * u64::from(s) * u64::from((3 * rx) ^ ry);
        if ry == 0 {
            if rx == 1 {
                x = n - 1 - x;
                y = n - 1 - y;
            }
            std::mem::swap(&mut x, &mut y);
        }
        s /= 2;
    }
    d
}

/// A deterministic scatter of small squares.
pub fn scattered_squares(count: u64) -> Vec<TestFeature> {
    let mut state = 0x2545_f491_4f6c_dd1d_u64;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state >> 11) as f64 / (1_u64 << 53) as f64
    };
    (0..count)
        .map(|fid| {
            let x = next() * 1000.0;
            let y = next() * 1000.0;
            let size = 1.0 + next() * 20.0;
            polygon(fid, &[square(x, y, size)])
        })
        .collect()
}
