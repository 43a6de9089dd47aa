// Copyright 2025 the Flatfeature Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flatfeature Reader: random-access, bounding-box-queryable reading of Flatfeature files.
//!
//! A Flatfeature file is laid out as:
//!
//! ```text
//! [8 bytes]   magic
//! [4 bytes]   header length L (u32)
//! [L bytes]   header
//! [I bytes]   packed R-tree, only when the header's node size is non-zero
//! [8·N bytes] record offsets (u64), relative to the data section
//! [...]       records: u32 length + encoded feature
//! ```
//!
//! All integers and floats are little-endian.
//!
//! ## API overview
//!
//! - [`Source`]: parses header, index, and offset table once; immutable and shareable.
//! - [`FeatureIterator`]: pulls features one at a time for a [`FeatureRequest`], with its own
//!   file handle. Supports [`rewind`](FeatureIterator::rewind) and idempotent
//!   [`close`](FeatureIterator::close).
//! - [`Provider`]: wraps a source and reports validity instead of failing construction.
//! - [`geometry::decode`]: rebuilds points, lines, and polygons from flat coordinates.
//! - [`FeatureAccess`]: the accessor seam between record bytes and feature decoding.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use flatfeature_reader::{Aabb2D, FeatureRequest, Source};
//!
//! let source = Arc::new(Source::open("parcels.ffb")?);
//! println!("{} features within {:?}", source.feature_count(), source.extent());
//!
//! let request = FeatureRequest::new().with_filter_rect(Aabb2D::new(0.0, 0.0, 10.0, 10.0));
//! for feature in source.features(request) {
//!     let feature = feature?;
//!     println!("{}: {:?}", feature.fid, feature.geometry.bounds());
//! }
//! # Ok::<(), flatfeature_reader::Error>(())
//! ```
//!
//! ## Errors
//!
//! Format errors surface from [`Source::open`] and leave no source behind. I/O errors during
//! iteration end that iterator only. Records that fail to decode are logged and skipped by
//! default; see [`DecodeErrorPolicy`].

pub mod error;
pub mod feature;
pub mod geometry;
pub mod header;
pub mod iterator;
pub mod provider;
pub mod record;
pub mod source;

pub use error::{Error, Result};
pub use feature::Feature;
pub use flatfeature_index::{Aabb2D, PackedRTree};
pub use geometry::{Coord, Geometry, Polygon, RingPolicy};
pub use header::{Dimensions, GeometryType, Header};
pub use iterator::{
    CrsTransform, DecodeErrorPolicy, FeatureIterator, FeatureRequest, Filter, IteratorState,
};
pub use provider::Provider;
pub use record::{FeatureAccess, FeatureView};
pub use source::{RecordReader, Source, SourceOptions};
