// Copyright 2025 the Flatfeature Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry model and the decoder that rebuilds it from flat coordinate arrays.
//!
//! Coordinates arrive flat and interleaved (`x0, y0[, z0][, m0], x1, y1, ...`). Rings and
//! parts are delimited by an optional lengths array. Each length counts XY values, two per
//! position, whatever extra ordinates the file carries; with `D` values per position a
//! length `l` covers `l / 2 * D` flat values. An absent lengths array means one ring or part.

use flatfeature_index::Aabb2D;

use crate::error::{Error, Result};
use crate::header::{Dimensions, GeometryType};

/// Fewest positions a closed ring can have.
pub const MIN_RING_POSITIONS: usize = 4;

/// One position.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Coord {
    /// X (easting or longitude).
    pub x: f64,
    /// Y (northing or latitude).
    pub y: f64,
    /// Elevation, when the file carries Z.
    pub z: Option<f64>,
    /// Measure, when the file carries M.
    pub m: Option<f64>,
}

impl Coord {
    /// A 2D position.
    pub const fn xy(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            m: None,
        }
    }

    fn from_values(values: &[f64], dims: Dimensions) -> Self {
        let mut rest = values[2..].iter().copied();
        let z = if dims.contains(Dimensions::Z) {
            rest.next()
        } else {
            None
        };
        let m = if dims.contains(Dimensions::M) {
            rest.next()
        } else {
            None
        };
        Self {
            x: values[0],
            y: values[1],
            z,
            m,
        }
    }
}

/// A polygon: one exterior ring and any number of holes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polygon {
    /// Outer boundary.
    pub exterior: Vec<Coord>,
    /// Holes, in file order.
    pub interiors: Vec<Vec<Coord>>,
}

/// A decoded geometry.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    /// A single position.
    Point(Coord),
    /// An ordered sequence of positions.
    LineString(Vec<Coord>),
    /// A polygon with optional holes.
    Polygon(Polygon),
    /// Several positions.
    MultiPoint(Vec<Coord>),
    /// Several line strings.
    MultiLineString(Vec<Vec<Coord>>),
}

impl Geometry {
    /// The type tag matching this geometry.
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Self::Point(_) => GeometryType::Point,
            Self::LineString(_) => GeometryType::LineString,
            Self::Polygon(_) => GeometryType::Polygon,
            Self::MultiPoint(_) => GeometryType::MultiPoint,
            Self::MultiLineString(_) => GeometryType::MultiLineString,
        }
    }

    /// Visit every position.
    pub fn for_each_coord(&self, mut f: impl FnMut(&Coord)) {
        match self {
            Self::Point(c) => f(c),
            Self::LineString(cs) | Self::MultiPoint(cs) => cs.iter().for_each(f),
            Self::Polygon(p) => p
                .exterior
                .iter()
                .chain(p.interiors.iter().flatten())
                .for_each(f),
            Self::MultiLineString(parts) => parts.iter().flatten().for_each(f),
        }
    }

    /// Mutate every position in place.
    pub fn for_each_coord_mut(&mut self, mut f: impl FnMut(&mut Coord)) {
        match self {
            Self::Point(c) => f(c),
            Self::LineString(cs) | Self::MultiPoint(cs) => cs.iter_mut().for_each(f),
            Self::Polygon(p) => p
                .exterior
                .iter_mut()
                .chain(p.interiors.iter_mut().flatten())
                .for_each(f),
            Self::MultiLineString(parts) => parts.iter_mut().flatten().for_each(f),
        }
    }

    /// Ordinates carried beyond X and Y, read from the first position.
    pub fn dimensions(&self) -> Dimensions {
        let mut dims = None;
        self.for_each_coord(|c| {
            if dims.is_none() {
                let mut d = Dimensions::empty();
                d.set(Dimensions::Z, c.z.is_some());
                d.set(Dimensions::M, c.m.is_some());
                dims = Some(d);
            }
        });
        dims.unwrap_or_default()
    }

    /// Exact XY bounding box, or `None` when the geometry has no positions.
    pub fn bounds(&self) -> Option<Aabb2D<f64>> {
        let mut bounds = Aabb2D::<f64>::EMPTY;
        let mut any = false;
        self.for_each_coord(|c| {
            bounds.expand_to(c.x, c.y);
            any = true;
        });
        any.then_some(bounds)
    }
}

/// What to do with polygon rings that have fewer than [`MIN_RING_POSITIONS`] positions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RingPolicy {
    /// Fail the record with [`Error::Geometry`].
    #[default]
    Reject,
    /// Keep the ring as decoded.
    Accept,
}

/// Decode a flat coordinate array into a geometry, rejecting degenerate rings.
pub fn decode(
    geometry_type: GeometryType,
    coords: &[f64],
    lengths: Option<&[u32]>,
    dims: Dimensions,
) -> Result<Geometry> {
    decode_with(geometry_type, coords, lengths, dims, RingPolicy::Reject)
}

/// Decode a flat coordinate array into a geometry under an explicit ring policy.
///
/// Point takes the first position and ignores trailing values. LineString and MultiPoint
/// take every position. Polygon and MultiLineString split by `lengths`.
pub fn decode_with(
    geometry_type: GeometryType,
    coords: &[f64],
    lengths: Option<&[u32]>,
    dims: Dimensions,
    rings: RingPolicy,
) -> Result<Geometry> {
    let stride = dims.count();
    match geometry_type {
        GeometryType::Point => {
            if coords.len() < stride {
                return Err(Error::Geometry(format!(
                    "point needs {stride} values, got {}",
                    coords.len()
                )));
            }
            Ok(Geometry::Point(Coord::from_values(&coords[..stride], dims)))
        }
        GeometryType::LineString => Ok(Geometry::LineString(positions(coords, dims)?)),
        GeometryType::MultiPoint => Ok(Geometry::MultiPoint(positions(coords, dims)?)),
        GeometryType::Polygon => {
            let mut rings_iter = split(coords, lengths, dims)?.into_iter();
            let exterior = rings_iter.next().unwrap_or_default();
            let interiors: Vec<_> = rings_iter.collect();
            if rings == RingPolicy::Reject {
                for (i, ring) in core::iter::once(&exterior).chain(&interiors).enumerate() {
                    if ring.len() < MIN_RING_POSITIONS {
                        return Err(Error::Geometry(format!(
                            "ring {i} has {} positions, needs at least {MIN_RING_POSITIONS}",
                            ring.len()
                        )));
                    }
                }
            }
            Ok(Geometry::Polygon(Polygon {
                exterior,
                interiors,
            }))
        }
        GeometryType::MultiLineString => {
            Ok(Geometry::MultiLineString(split(coords, lengths, dims)?))
        }
        other => Err(Error::UnsupportedGeometry(other)),
    }
}

fn positions(values: &[f64], dims: Dimensions) -> Result<Vec<Coord>> {
    let stride = dims.count();
    if values.len() % stride != 0 {
        return Err(Error::Geometry(format!(
            "{} values do not divide into positions of {stride}",
            values.len()
        )));
    }
    Ok(values
        .chunks_exact(stride)
        .map(|c| Coord::from_values(c, dims))
        .collect())
}

fn split(values: &[f64], lengths: Option<&[u32]>, dims: Dimensions) -> Result<Vec<Vec<Coord>>> {
    let Some(lengths) = lengths.filter(|l| !l.is_empty()) else {
        return Ok(vec![positions(values, dims)?]);
    };
    let stride = dims.count();
    let mut out = Vec::with_capacity(lengths.len());
    let mut rest = values;
    for (i, &len) in lengths.iter().enumerate() {
        if len % 2 != 0 {
            return Err(Error::Geometry(format!("length {i} is odd ({len})")));
        }
        let take = (len as usize / 2) * stride;
        if take > rest.len() {
            return Err(Error::Geometry(format!(
                "lengths sum past the {} coordinate values",
                values.len()
            )));
        }
        let (head, tail) = rest.split_at(take);
        out.push(positions(head, dims)?);
        rest = tail;
    }
    if !rest.is_empty() {
        return Err(Error::Geometry(format!(
            "lengths leave {} of {} coordinate values unused",
            rest.len(),
            values.len()
        )));
    }
    Ok(out)
}
