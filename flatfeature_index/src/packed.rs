// Copyright 2025 the Flatfeature Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Packed R-tree: a static, array-backed tree with implicit child offsets.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::ops::Range;

use byteorder::{ByteOrder, LittleEndian};

use crate::layout::{self, LayoutError, NODE_RECT_SIZE};
use crate::types::Aabb2D;

/// Errors raised while loading or assembling a [`PackedRTree`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PackedRTreeError {
    /// The item count and node size do not describe a valid tree.
    Layout(LayoutError),
    /// The byte buffer does not match the size implied by the layout.
    SizeMismatch {
        /// Bytes required by the layout.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },
    /// A leaf refers to an item ordinal outside `0..num_items`.
    LeafIndexOutOfRange {
        /// Leaf ordinal holding the bad entry.
        leaf: usize,
        /// The stored item ordinal.
        index: u64,
    },
}

impl fmt::Display for PackedRTreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layout(e) => e.fmt(f),
            Self::SizeMismatch { expected, actual } => {
                write!(f, "packed index needs {expected} bytes, got {actual}")
            }
            Self::LeafIndexOutOfRange { leaf, index } => {
                write!(
                    f,
                    "leaf {leaf} points at item {index}, which does not exist"
                )
            }
        }
    }
}

impl core::error::Error for PackedRTreeError {}

impl From<LayoutError> for PackedRTreeError {
    fn from(e: LayoutError) -> Self {
        Self::Layout(e)
    }
}

/// A read-only packed R-tree over `f64` rectangles.
///
/// Nodes are stored level by level, leaves first and the root last. Leaf `i` holds the
/// exact bounding box of one item and that item's original ordinal; every parent holds
/// the union of its (at most `node_size`) children. Children are located by arithmetic on
/// the level ranges, so the tree carries no pointers.
///
/// The tree never sorts. Leaves are expected to arrive in space-filling-curve order, which
/// is what makes sibling boxes tight; any order still yields correct (if slower) searches.
#[derive(Clone)]
pub struct PackedRTree {
    num_items: usize,
    node_size: u16,
    levels: Vec<Range<usize>>,
    rects: Vec<Aabb2D<f64>>,
    indices: Vec<u64>,
}

impl PackedRTree {
    /// Load a tree from its serialized form.
    ///
    /// `bytes` must hold exactly [`layout::size_in_bytes`] bytes: every node rectangle as four
    /// little-endian `f64`, followed by every node index as a little-endian `u64`.
    pub fn from_bytes(
        bytes: &[u8],
        num_items: u64,
        node_size: u16,
    ) -> Result<Self, PackedRTreeError> {
        let levels = layout::level_ranges(num_items, node_size)?;
        let expected = layout::size_in_bytes(num_items, node_size)?;
        if bytes.len() != expected {
            return Err(PackedRTreeError::SizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        let num_nodes = levels.last().map(|r| r.end).unwrap_or(0);
        let (rect_bytes, index_bytes) = bytes.split_at(num_nodes * NODE_RECT_SIZE);

        let mut coords = vec![0.0_f64; num_nodes * NODE_RECT_SIZE / 8];
        LittleEndian::read_f64_into(rect_bytes, &mut coords);
        let rects = coords
            .chunks_exact(4)
            .map(|c| Aabb2D::new(c[0], c[1], c[2], c[3]))
            .collect();
        let mut indices = vec![0_u64; num_nodes];
        LittleEndian::read_u64_into(index_bytes, &mut indices);

        let num_items = levels.first().map(|r| r.len()).unwrap_or(0);
        for (leaf, &index) in indices.iter().take(num_items).enumerate() {
            if index >= num_items as u64 {
                return Err(PackedRTreeError::LeafIndexOutOfRange { leaf, index });
            }
        }

        Ok(Self {
            num_items,
            node_size,
            levels,
            rects,
            indices,
        })
    }

    /// Assemble a tree from leaves that are already in their final order.
    ///
    /// Each leaf is `(bounding box, item ordinal)`. Parent boxes are computed as unions of
    /// their children; a parent's stored index is the position of its first child.
    pub fn from_ordered_leaves(
        leaves: &[(Aabb2D<f64>, u64)],
        node_size: u16,
    ) -> Result<Self, PackedRTreeError> {
        let levels = layout::level_ranges(leaves.len() as u64, node_size)?;
        let num_nodes = levels.last().map(|r| r.end).unwrap_or(0);
        let mut rects = Vec::with_capacity(num_nodes);
        let mut indices = Vec::with_capacity(num_nodes);
        for (leaf, &(rect, index)) in leaves.iter().enumerate() {
            if index >= leaves.len() as u64 {
                return Err(PackedRTreeError::LeafIndexOutOfRange { leaf, index });
            }
            rects.push(rect);
            indices.push(index);
        }
        let fan_out = usize::from(node_size);
        for below in &levels[..levels.len().saturating_sub(1)] {
            let mut first = below.start;
            while first < below.end {
                let end = (first + fan_out).min(below.end);
                let rect = rects[first..end]
                    .iter()
                    .fold(Aabb2D::<f64>::EMPTY, |acc, r| acc.union(r));
                rects.push(rect);
                indices.push(first as u64);
                first = end;
            }
        }
        Ok(Self {
            num_items: leaves.len(),
            node_size,
            levels,
            rects,
            indices,
        })
    }

    /// Number of leaves (items) in the tree.
    pub fn num_items(&self) -> usize {
        self.num_items
    }

    /// Whether the tree holds no items.
    pub fn is_empty(&self) -> bool {
        self.num_items == 0
    }

    /// Maximum number of children per node.
    pub fn node_size(&self) -> u16 {
        self.node_size
    }

    /// Total node count, leaves included.
    pub fn num_nodes(&self) -> usize {
        self.rects.len()
    }

    /// Node position ranges per level, leaves first.
    pub fn levels(&self) -> &[Range<usize>] {
        &self.levels
    }

    /// The root rectangle, or `None` for an empty tree.
    pub fn extent(&self) -> Option<Aabb2D<f64>> {
        self.rects.last().copied()
    }

    /// Rectangle stored at node position `pos`.
    pub fn node_rect(&self, pos: usize) -> Option<Aabb2D<f64>> {
        self.rects.get(pos).copied()
    }

    /// Index stored at node position `pos`: an item ordinal for leaves, the first child
    /// position for parents.
    pub fn node_index(&self, pos: usize) -> Option<u64> {
        self.indices.get(pos).copied()
    }

    /// Original item ordinal of the leaf at `leaf`.
    pub fn get_index(&self, leaf: usize) -> Option<u64> {
        if leaf < self.num_items {
            self.indices.get(leaf).copied()
        } else {
            None
        }
    }

    /// Bounding box of the leaf at `leaf`.
    pub fn get_rect(&self, leaf: usize) -> Option<Aabb2D<f64>> {
        if leaf < self.num_items {
            self.rects.get(leaf).copied()
        } else {
            None
        }
    }

    /// Leaf ordinals whose rectangles intersect `rect`, in ascending order.
    ///
    /// Levels are walked from the root down; a node's children are only visited when the
    /// node's own rectangle intersects the query. Touching counts as intersecting. Since
    /// every parent is the union of its children, no intersecting leaf is missed.
    pub fn search(&self, rect: &Aabb2D<f64>) -> Vec<usize> {
        let mut out = Vec::new();
        let Some(top) = self.levels.len().checked_sub(1) else {
            return out;
        };
        let mut frontier: Vec<usize> = self.levels[top].clone().collect();
        for level in (0..=top).rev() {
            let mut next = Vec::new();
            for pos in frontier {
                if !self.rects[pos].intersects(rect) {
                    continue;
                }
                if level == 0 {
                    out.push(pos);
                } else {
                    next.extend(self.children(level, pos));
                }
            }
            frontier = next;
        }
        out
    }

    /// Positions of the children of the node at `pos` on `level` (which must be above the leaves).
    fn children(&self, level: usize, pos: usize) -> Range<usize> {
        let fan_out = usize::from(self.node_size);
        let below = &self.levels[level - 1];
        let first = below.start + (pos - self.levels[level].start) * fan_out;
        first..(first + fan_out).min(below.end)
    }
}

impl fmt::Debug for PackedRTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackedRTree")
            .field("num_items", &self.num_items)
            .field("node_size", &self.node_size)
            .field("num_nodes", &self.rects.len())
            .field("depth", &self.levels.len())
            .finish_non_exhaustive()
    }
}
