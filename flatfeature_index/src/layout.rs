// Copyright 2025 the Flatfeature Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Level arithmetic for the packed tree.
//!
//! A packed tree over `n` items with fan-out `f` stores its nodes level by level,
//! leaves first. Each level above the leaves holds `⌈n/f⌉` nodes of the level below,
//! and levels are added until a single root remains. With `n ≤ f` the tree is the
//! `n` leaves plus one root.

use alloc::vec::Vec;
use core::fmt;
use core::ops::Range;

/// Bytes used by one node rectangle (`min_x`, `min_y`, `max_x`, `max_y` as `f64`).
pub const NODE_RECT_SIZE: usize = 4 * 8;

/// Bytes used by one node index (`u64`).
pub const NODE_INDEX_SIZE: usize = 8;

/// Fan-out used by writers that do not pick one.
pub const DEFAULT_NODE_SIZE: u16 = 16;

/// Reasons a tree layout cannot be computed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LayoutError {
    /// Fan-out below two never converges to a single root.
    InvalidNodeSize(u16),
    /// The node count or byte size does not fit in `usize`.
    TooLarge {
        /// Item count that was requested.
        num_items: u64,
    },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidNodeSize(n) => {
                write!(f, "invalid index node size {n}, must be at least 2")
            }
            Self::TooLarge { num_items } => {
                write!(
                    f,
                    "packed index over {num_items} items exceeds addressable size"
                )
            }
        }
    }
}

impl core::error::Error for LayoutError {}

/// Node position ranges for every level, leaves first and root last.
///
/// Returns an empty list for zero items.
pub fn level_ranges(num_items: u64, node_size: u16) -> Result<Vec<Range<usize>>, LayoutError> {
    if node_size < 2 {
        return Err(LayoutError::InvalidNodeSize(node_size));
    }
    let too_large = LayoutError::TooLarge { num_items };
    let mut n = usize::try_from(num_items).map_err(|_| too_large)?;
    let mut levels = Vec::new();
    if n == 0 {
        return Ok(levels);
    }
    let fan_out = usize::from(node_size);
    let mut start = 0_usize;
    let mut end = n;
    levels.push(start..end);
    loop {
        n = n.div_ceil(fan_out);
        start = end;
        end = start.checked_add(n).ok_or(too_large)?;
        levels.push(start..end);
        if n == 1 {
            break;
        }
    }
    Ok(levels)
}

/// Total node count of a packed tree.
pub fn num_nodes(num_items: u64, node_size: u16) -> Result<usize, LayoutError> {
    Ok(level_ranges(num_items, node_size)?
        .last()
        .map(|root| root.end)
        .unwrap_or(0))
}

/// Serialized size in bytes of a packed tree: all node rectangles followed by all node indices.
pub fn size_in_bytes(num_items: u64, node_size: u16) -> Result<usize, LayoutError> {
    num_nodes(num_items, node_size)?
        .checked_mul(NODE_RECT_SIZE + NODE_INDEX_SIZE)
        .ok_or(LayoutError::TooLarge { num_items })
}
