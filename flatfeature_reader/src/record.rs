// Copyright 2025 the Flatfeature Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Feature record framing and the typed view over one record buffer.
//!
//! A record on disk is a little-endian `u32` length followed by that many bytes:
//!
//! | field            | encoding                           |
//! |------------------|------------------------------------|
//! | fid              | `u64`                              |
//! | geometry type    | `u8` tag                           |
//! | coordinates      | `u32` count, then `count × f64`    |
//! | ring/part lengths| `u32` count, then `count × u32`    |
//! | attributes       | `u32` length, then opaque bytes    |
//!
//! A lengths count of zero means the array is absent.

use std::io::Read;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::header::GeometryType;

/// Size of the length prefix in front of every record.
pub const RECORD_SIZE_SIZE: usize = 4;

/// Typed accessors over one encoded feature.
///
/// The reader only depends on these accessors, so any record encoding that can answer them
/// can stand in for the built-in [`FeatureView`].
pub trait FeatureAccess {
    /// Feature identifier.
    fn fid(&self) -> u64;

    /// Geometry type recorded with the feature.
    fn geometry_type(&self) -> GeometryType;

    /// Flat, interleaved coordinate values.
    fn coords(&self) -> impl ExactSizeIterator<Item = f64> + '_;

    /// Ring lengths (polygons) or part lengths (multi geometries), if present.
    fn lengths(&self) -> Option<impl ExactSizeIterator<Item = u32> + '_>;

    /// Opaque attribute payload.
    fn attributes(&self) -> &[u8];
}

/// Bounds-checked view borrowing a record buffer.
#[derive(Copy, Clone, Debug)]
pub struct FeatureView<'a> {
    fid: u64,
    geometry_type: GeometryType,
    coords: &'a [u8],
    lengths: &'a [u8],
    attributes: &'a [u8],
}

impl<'a> FeatureView<'a> {
    /// Validate the layout of `buf` and borrow its sections.
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        let mut rest = buf;
        let fid = take(&mut rest, 8, "fid").map(LittleEndian::read_u64)?;
        let geometry_type = GeometryType::from_tag(take(&mut rest, 1, "geometry type")?[0]);
        let coords = take_array(&mut rest, 8, "coordinates")?;
        let lengths = take_array(&mut rest, 4, "lengths")?;
        let attributes = take_array(&mut rest, 1, "attributes")?;
        Ok(Self {
            fid,
            geometry_type,
            coords,
            lengths,
            attributes,
        })
    }
}

impl FeatureAccess for FeatureView<'_> {
    fn fid(&self) -> u64 {
        self.fid
    }

    fn geometry_type(&self) -> GeometryType {
        self.geometry_type
    }

    fn coords(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.coords.chunks_exact(8).map(LittleEndian::read_f64)
    }

    fn lengths(&self) -> Option<impl ExactSizeIterator<Item = u32> + '_> {
        if self.lengths.is_empty() {
            None
        } else {
            Some(self.lengths.chunks_exact(4).map(LittleEndian::read_u32))
        }
    }

    fn attributes(&self) -> &[u8] {
        self.attributes
    }
}

/// Read one length-prefixed record into `buf`, replacing its contents.
///
/// `buf` is reused across calls so steady-state reads do not allocate.
pub fn read_framed<R: Read>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<()> {
    let mut prefix = [0_u8; RECORD_SIZE_SIZE];
    reader.read_exact(&mut prefix)?;
    let len = u64::from(LittleEndian::read_u32(&prefix));
    buf.clear();
    // Grows with the bytes actually present, so a corrupt length cannot force a huge allocation.
    let read = reader.by_ref().take(len).read_to_end(buf)?;
    if read as u64 != len {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("record declares {len} bytes, only {read} available"),
        ));
    }
    Ok(())
}

fn take<'a>(rest: &mut &'a [u8], n: usize, what: &str) -> Result<&'a [u8]> {
    if rest.len() < n {
        return Err(Error::InvalidRecord(format!(
            "{what}: needs {n} bytes, {} left",
            rest.len()
        )));
    }
    let (head, tail) = rest.split_at(n);
    *rest = tail;
    Ok(head)
}

fn take_array<'a>(rest: &mut &'a [u8], elem_size: usize, what: &str) -> Result<&'a [u8]> {
    let count = take(rest, 4, what).map(LittleEndian::read_u32)? as usize;
    let n = count
        .checked_mul(elem_size)
        .ok_or_else(|| Error::InvalidRecord(format!("{what}: count {count} overflows")))?;
    take(rest, n, what)
}

#[cfg(test)]
pub(crate) fn encode_for_tests(
    fid: u64,
    geometry_type: GeometryType,
    coords: &[f64],
    lengths: &[u32],
    attributes: &[u8],
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&fid.to_le_bytes());
    out.push(geometry_type.tag());
    out.extend_from_slice(&(coords.len() as u32).to_le_bytes());
    for c in coords {
        out.extend_from_slice(&c.to_le_bytes());
    }
    out.extend_from_slice(&(lengths.len() as u32).to_le_bytes());
    for l in lengths {
        out.extend_from_slice(&l.to_le_bytes());
    }
    out.extend_from_slice(&(attributes.len() as u32).to_le_bytes());
    out.extend_from_slice(attributes);
    out
}
