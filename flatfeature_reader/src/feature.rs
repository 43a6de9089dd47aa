// Copyright 2025 the Flatfeature Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Decoded features.

use crate::error::Result;
use crate::geometry::{Geometry, RingPolicy, decode_with};
use crate::header::{GeometryType, Header};
use crate::record::FeatureAccess;

/// One feature: identifier, geometry, and its still-encoded attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    /// Feature identifier from the record.
    pub fid: u64,
    /// Decoded geometry.
    pub geometry: Geometry,
    /// Attribute payload, left encoded.
    pub attributes: Vec<u8>,
}

/// Decode a record view into a feature.
///
/// The header's geometry type wins unless it is [`GeometryType::Unknown`], in which case the
/// record's own type is used.
pub fn decode_feature(
    view: &impl FeatureAccess,
    header: &Header,
    rings: RingPolicy,
) -> Result<Feature> {
    let geometry_type = match header.geometry_type {
        GeometryType::Unknown => view.geometry_type(),
        layer_type => layer_type,
    };
    let coords: Vec<f64> = view.coords().collect();
    let lengths: Option<Vec<u32>> = view.lengths().map(Iterator::collect);
    let geometry = decode_with(
        geometry_type,
        &coords,
        lengths.as_deref(),
        header.dimensions,
        rings,
    )?;
    Ok(Feature {
        fid: view.fid(),
        geometry,
        attributes: view.attributes().to_vec(),
    })
}
