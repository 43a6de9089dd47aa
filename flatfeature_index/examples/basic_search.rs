// Copyright 2025 the Flatfeature Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Basic usage of Flatfeature Index: assemble a packed tree, search, and map leaves to items.

use flatfeature_index::{Aabb2D, DEFAULT_NODE_SIZE, PackedRTree};

fn main() {
    // A 10×10 grid of unit boxes, in row-major order.
    let leaves: Vec<_> = (0..100_u64)
        .map(|i| {
            let (x, y) = ((i % 10) as f64, (i / 10) as f64);
            (Aabb2D::new(x, y, x + 0.8, y + 0.8), i)
        })
        .collect();
    let tree = PackedRTree::from_ordered_leaves(&leaves, DEFAULT_NODE_SIZE).unwrap();
    println!("tree: {tree:?}, extent: {:?}", tree.extent());

    let hits = tree.search(&Aabb2D::new(2.5, 2.5, 4.0, 3.5));
    let items: Vec<_> = hits
        .iter()
        .filter_map(|&leaf| tree.get_index(leaf))
        .collect();
    println!("items intersecting the query: {items:?}");
}
