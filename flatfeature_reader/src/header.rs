// Copyright 2025 the Flatfeature Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! File prefix constants and the header codec.

use std::fmt;
use std::io::{Cursor, Read};

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt};
use flatfeature_index::Aabb2D;

use crate::error::{Error, Result};

/// Format version carried in the magic bytes.
pub const VERSION: u8 = 1;

/// Magic bytes every Flatfeature file starts with.
pub const MAGIC_BYTES: [u8; 8] = [b'f', b'f', b'b', VERSION, b'f', b'f', b'b', 0];

/// Size of the magic prefix.
pub const MAGIC_BYTES_SIZE: usize = 8;

/// Size of the header length field that follows the magic bytes.
pub const HEADER_SIZE_SIZE: usize = 4;

/// Largest header accepted unless configured otherwise (512 MiB).
pub const HEADER_MAX_BUFFER_SIZE: usize = 1024 * 1024 * 512;

// geometry_type, dimensions, index_node_size, features_count, envelope, name_len
const HEADER_FIXED_SIZE: usize = 1 + 1 + 2 + 8 + 4 * 8 + 2;

/// Geometry type tag shared by headers and records.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GeometryType {
    /// Mixed or unspecified; each record carries its own type.
    Unknown,
    /// A single position.
    Point,
    /// An ordered sequence of positions.
    LineString,
    /// An exterior ring plus zero or more interior rings.
    Polygon,
    /// Several positions.
    MultiPoint,
    /// Several line strings.
    MultiLineString,
    /// Several polygons.
    MultiPolygon,
    /// A tag this reader does not know.
    Other(u8),
}

impl GeometryType {
    /// Map a wire tag to a geometry type.
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            0 => Self::Unknown,
            1 => Self::Point,
            2 => Self::LineString,
            3 => Self::Polygon,
            4 => Self::MultiPoint,
            5 => Self::MultiLineString,
            6 => Self::MultiPolygon,
            other => Self::Other(other),
        }
    }

    /// The wire tag of this geometry type.
    pub fn tag(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Point => 1,
            Self::LineString => 2,
            Self::Polygon => 3,
            Self::MultiPoint => 4,
            Self::MultiLineString => 5,
            Self::MultiPolygon => 6,
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("Unknown"),
            Self::Point => f.write_str("Point"),
            Self::LineString => f.write_str("LineString"),
            Self::Polygon => f.write_str("Polygon"),
            Self::MultiPoint => f.write_str("MultiPoint"),
            Self::MultiLineString => f.write_str("MultiLineString"),
            Self::MultiPolygon => f.write_str("MultiPolygon"),
            Self::Other(tag) => write!(f, "Other({tag})"),
        }
    }
}

bitflags! {
    /// Ordinates stored per position beyond X and Y.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Dimensions: u8 {
        /// Positions carry a Z value.
        const Z = 0b0000_0001;
        /// Positions carry an M value.
        const M = 0b0000_0010;
    }
}

impl Dimensions {
    /// Values stored per position: 2, 3, or 4.
    pub fn count(self) -> usize {
        2 + usize::from(self.contains(Self::Z)) + usize::from(self.contains(Self::M))
    }
}

/// Parsed file header. Immutable for the lifetime of a source.
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    /// Layer-wide geometry type; [`GeometryType::Unknown`] means per-record types.
    pub geometry_type: GeometryType,
    /// Ordinates present beyond X/Y.
    pub dimensions: Dimensions,
    /// Fan-out of the packed index; 0 means the file has no index.
    pub index_node_size: u16,
    /// Number of feature records.
    pub features_count: u64,
    /// Bounding envelope of every feature.
    pub envelope: Aabb2D<f64>,
    /// Layer name, possibly empty.
    pub name: String,
}

impl Header {
    /// Whether a packed index follows the header.
    pub fn has_index(&self) -> bool {
        self.index_node_size > 0
    }

    /// Decode a header body (the `L` bytes after the length field).
    ///
    /// Bytes after the layer name are ignored.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_FIXED_SIZE {
            return Err(Error::Format(format!(
                "header is {} bytes, needs at least {HEADER_FIXED_SIZE}",
                bytes.len()
            )));
        }
        let truncated = |e: std::io::Error| Error::Format(format!("truncated header: {e}"));
        let mut cursor = Cursor::new(bytes);

        let geometry_type = GeometryType::from_tag(cursor.read_u8().map_err(truncated)?);
        let raw_dims = cursor.read_u8().map_err(truncated)?;
        let dimensions = Dimensions::from_bits(raw_dims)
            .ok_or_else(|| Error::Format(format!("unknown dimension flags {raw_dims:#04x}")))?;
        let index_node_size = cursor.read_u16::<LittleEndian>().map_err(truncated)?;
        if index_node_size == 1 {
            return Err(Error::Format(
                "index node size must be 0 or at least 2".into(),
            ));
        }
        let features_count = cursor.read_u64::<LittleEndian>().map_err(truncated)?;
        let mut env = [0_f64; 4];
        cursor
            .read_f64_into::<LittleEndian>(&mut env)
            .map_err(truncated)?;
        let name_len = usize::from(cursor.read_u16::<LittleEndian>().map_err(truncated)?);
        let mut name = vec![0_u8; name_len];
        cursor.read_exact(&mut name).map_err(truncated)?;
        let name = String::from_utf8(name)
            .map_err(|_| Error::Format("layer name is not UTF-8".into()))?;

        Ok(Self {
            geometry_type,
            dimensions,
            index_node_size,
            features_count,
            envelope: Aabb2D::new(env[0], env[1], env[2], env[3]),
            name,
        })
    }
}

#[cfg(test)]
pub(crate) fn encode_for_tests(header: &Header) -> Vec<u8> {
    let mut out = vec![header.geometry_type.tag(), header.dimensions.bits()];
    out.extend_from_slice(&header.index_node_size.to_le_bytes());
    out.extend_from_slice(&header.features_count.to_le_bytes());
    let e = header.envelope;
    for v in [e.min_x, e.min_y, e.max_x, e.max_y] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.extend_from_slice(&(header.name.len() as u16).to_le_bytes());
    out.extend_from_slice(header.name.as_bytes());
    out
}
