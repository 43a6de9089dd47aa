// Copyright 2025 the Flatfeature Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for reading Flatfeature files.

use thiserror::Error;

use crate::header::GeometryType;

/// Reader errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad magic, or a truncated or malformed header, index, or offset table.
    ///
    /// Fatal to the whole source.
    #[error("format error: {0}")]
    Format(String),

    /// Seek or read failure.
    ///
    /// Fatal to the iterator that hit it; other iterators over the same source are unaffected.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A record buffer that fails bounds checks.
    #[error("invalid feature record: {0}")]
    InvalidRecord(String),

    /// Ring or part lengths that are inconsistent with the coordinate array.
    #[error("geometry error: {0}")]
    Geometry(String),

    /// A geometry type the decoder does not handle.
    #[error("unsupported geometry type: {0}")]
    UnsupportedGeometry(GeometryType),

    /// The filter rectangle could not be brought into source coordinates.
    #[error("transform error: {0}")]
    Transform(String),
}

impl Error {
    /// Whether this error leaves the source permanently unusable.
    pub fn is_source_fatal(&self) -> bool {
        matches!(self, Self::Format(_))
    }

    /// Whether this error concerns a single record only, so iteration may continue past it.
    pub fn is_record_local(&self) -> bool {
        matches!(
            self,
            Self::InvalidRecord(_) | Self::Geometry(_) | Self::UnsupportedGeometry(_)
        )
    }
}

impl From<flatfeature_index::PackedRTreeError> for Error {
    fn from(e: flatfeature_index::PackedRTreeError) -> Self {
        Self::Format(format!("spatial index: {e}"))
    }
}

impl From<flatfeature_index::LayoutError> for Error {
    fn from(e: flatfeature_index::LayoutError) -> Self {
        Self::Format(format!("spatial index: {e}"))
    }
}

/// Result type for reader operations.
pub type Result<T> = std::result::Result<T, Error>;
