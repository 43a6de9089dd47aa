// Copyright 2025 the Flatfeature Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flatfeature Index: a static, packed Hilbert R-tree.
//!
//! Flatfeature Index is the spatial half of the Flatfeature file format.
//!
//! - Load an index verbatim from its on-disk bytes with [`PackedRTree::from_bytes`].
//! - Or assemble one in memory from leaves that are already ordered with
//!   [`PackedRTree::from_ordered_leaves`].
//! - Query by intersecting rectangle with [`PackedRTree::search`], then map leaf ordinals
//!   back to item ordinals with [`PackedRTree::get_index`].
//!
//! The tree is read-only. Its shape is fully determined by the item count and the fan-out,
//! so children are found by arithmetic on [`layout::level_ranges`] rather than by pointers,
//! and the byte size of a serialized index is known before reading it
//! ([`layout::size_in_bytes`]).
//!
//! # Example
//!
//! ```rust
//! use flatfeature_index::{Aabb2D, PackedRTree};
//!
//! // Three leaves, already in their final (curve) order; the second value is the item ordinal.
//! let leaves = [
//!     (Aabb2D::new(0.0, 0.0, 1.0, 1.0), 0),
//!     (Aabb2D::new(2.0, 2.0, 3.0, 3.0), 2),
//!     (Aabb2D::new(8.0, 8.0, 9.0, 9.0), 1),
//! ];
//! let tree = PackedRTree::from_ordered_leaves(&leaves, 16).unwrap();
//!
//! let hits = tree.search(&Aabb2D::new(0.5, 0.5, 2.5, 2.5));
//! assert_eq!(hits, vec![0, 1]);
//! assert_eq!(tree.get_index(hits[1]), Some(2));
//! ```
//!
//! ### Search semantics
//!
//! Search is conservative at the rectangle level: every leaf whose box intersects the query
//! is returned, including boxes that merely touch it. Callers holding exact geometry should
//! re-check candidates, since a box hit does not imply a geometry hit.
//!
//! ### Float semantics
//!
//! This crate assumes no NaNs in rectangles. NaN coordinates never compare as
//! disjoint, so they surface as candidates rather than being dropped.

#![no_std]

extern crate alloc;

pub mod layout;
pub mod packed;
pub mod types;

pub use layout::{DEFAULT_NODE_SIZE, LayoutError};
pub use packed::{PackedRTree, PackedRTreeError};
pub use types::Aabb2D;
