// Copyright 2025 the Flatfeature Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Feature requests and the pull-based query iterator.

use std::fmt;
use std::sync::Arc;

use flatfeature_index::Aabb2D;

use crate::error::{Error, Result};
use crate::feature::{Feature, decode_feature};
use crate::geometry::{Coord, RingPolicy};
use crate::record::FeatureView;
use crate::source::{RecordReader, Source};

/// Which features a request selects.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum Filter {
    /// Every feature, in on-disk order.
    #[default]
    All,
    /// Features whose exact bounding box intersects the rectangle.
    Rect(Aabb2D<f64>),
    /// A single feature by identifier. Not supported: yields nothing.
    Fid(u64),
}

/// What an iterator does when one record fails to decode.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DecodeErrorPolicy {
    /// Log the failure and move on to the next candidate.
    #[default]
    Skip,
    /// Return the error and end iteration.
    Abort,
}

/// Coordinate reference system conversion supplied by the host application.
pub trait CrsTransform: fmt::Debug + Send + Sync {
    /// Bring a filter rectangle from request coordinates into source coordinates.
    fn rect_to_source(&self, rect: &Aabb2D<f64>) -> Result<Aabb2D<f64>>;

    /// Convert one source position into request coordinates, in place.
    fn coord_to_destination(&self, coord: &mut Coord);
}

/// Parameters of one iteration.
#[derive(Clone, Debug, Default)]
pub struct FeatureRequest {
    /// Selection.
    pub filter: Filter,
    /// Optional coordinate conversion.
    pub transform: Option<Arc<dyn CrsTransform>>,
    /// Handling of records that fail to decode.
    pub decode_errors: DecodeErrorPolicy,
    /// Handling of polygon rings with too few positions.
    pub degenerate_rings: RingPolicy,
}

impl FeatureRequest {
    /// A request for every feature.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select features intersecting `rect`.
    pub fn with_filter_rect(mut self, rect: Aabb2D<f64>) -> Self {
        self.filter = Filter::Rect(rect);
        self
    }

    /// Select the feature with identifier `fid`.
    pub fn with_filter_fid(mut self, fid: u64) -> Self {
        self.filter = Filter::Fid(fid);
        self
    }

    /// Convert between request and source coordinates.
    pub fn with_transform(mut self, transform: Arc<dyn CrsTransform>) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Set the record decode failure policy.
    pub fn with_decode_errors(mut self, policy: DecodeErrorPolicy) -> Self {
        self.decode_errors = policy;
        self
    }

    /// Set the degenerate ring policy.
    pub fn with_degenerate_rings(mut self, policy: RingPolicy) -> Self {
        self.degenerate_rings = policy;
        self
    }
}

/// Lifecycle of a [`FeatureIterator`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IteratorState {
    /// Created; nothing fetched since construction or the last rewind.
    Ready,
    /// At least one fetch happened.
    Iterating,
    /// All candidates consumed; the file handle is released. [`FeatureIterator::rewind`] restarts.
    Exhausted,
    /// Closed for good.
    Closed,
}

/// Pull-based iterator over the features of a [`Source`].
///
/// Each iterator owns its own file handle, opened lazily on the first fetch, so iterators over
/// one source never disturb each other's read position.
///
/// With a filter rectangle and a packed index, candidates come from one index search.
/// Otherwise every record is visited in on-disk order. Either way, a decoded feature is only
/// yielded when its exact bounding box intersects the filter rectangle.
pub struct FeatureIterator {
    source: Arc<Source>,
    request: FeatureRequest,
    filter_rect: Option<Aabb2D<f64>>,
    state: IteratorState,
    reader: Option<RecordReader>,
    candidates: Option<Vec<usize>>,
    cursor: usize,
    buf: Vec<u8>,
}

impl FeatureIterator {
    /// Prepare an iterator. No file access happens until the first fetch.
    ///
    /// If the filter rectangle cannot be brought into source coordinates, the iterator starts
    /// closed and yields nothing.
    pub fn new(source: Arc<Source>, request: FeatureRequest) -> Self {
        let mut state = IteratorState::Ready;
        let filter_rect = match (&request.filter, &request.transform) {
            (Filter::Rect(rect), Some(t)) => match t.rect_to_source(rect) {
                Ok(r) => Some(r),
                Err(e) => {
                    tracing::debug!(error = %e, "filter rectangle cannot be reprojected");
                    state = IteratorState::Closed;
                    None
                }
            },
            (Filter::Rect(rect), None) => Some(*rect),
            _ => None,
        };
        Self {
            source,
            request,
            filter_rect,
            state,
            reader: None,
            candidates: None,
            cursor: 0,
            buf: Vec::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> IteratorState {
        self.state
    }

    /// Whether a file handle is currently held.
    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// The filter rectangle in source coordinates, if any.
    pub fn filter_rect(&self) -> Option<Aabb2D<f64>> {
        self.filter_rect
    }

    /// Fetch the next matching feature.
    ///
    /// Returns `Ok(None)` at end of data. Records that fail to decode are skipped under
    /// [`DecodeErrorPolicy::Skip`]. I/O errors close the iterator and are returned.
    pub fn fetch(&mut self) -> Result<Option<Feature>> {
        match self.state {
            IteratorState::Closed | IteratorState::Exhausted => return Ok(None),
            IteratorState::Ready | IteratorState::Iterating => {}
        }

        if let Filter::Fid(fid) = self.request.filter {
            tracing::debug!(fid, "lookup by feature id is not supported");
            self.state = IteratorState::Exhausted;
            return Ok(None);
        }

        self.state = IteratorState::Iterating;
        if self.reader.is_none() {
            match self.source.reader() {
                Ok(reader) => {
                    tracing::debug!(path = %self.source.path().display(), "opened record handle");
                    self.reader = Some(reader);
                }
                Err(e) => {
                    self.close();
                    return Err(e);
                }
            }
        }

        while let Some(ordinal) = self.next_ordinal() {
            let Some(offset) = self.source.offset(ordinal) else {
                tracing::warn!(
                    ordinal,
                    "index refers to a feature missing from the offset table"
                );
                continue;
            };
            if let Err(e) = self.read_record(offset) {
                self.close();
                return Err(e);
            }
            let mut feature = match self.decode_current() {
                Ok(feature) => feature,
                Err(e) => match self.request.decode_errors {
                    DecodeErrorPolicy::Skip => {
                        tracing::warn!(ordinal, offset, error = %e, "skipping unreadable feature");
                        continue;
                    }
                    DecodeErrorPolicy::Abort => {
                        self.finish();
                        return Err(e);
                    }
                },
            };
            if let Some(rect) = self.filter_rect {
                let hit = feature
                    .geometry
                    .bounds()
                    .is_some_and(|b| b.intersects(&rect));
                if !hit {
                    tracing::trace!(
                        ordinal,
                        fid = feature.fid,
                        "candidate outside filter rectangle"
                    );
                    continue;
                }
            }
            if let Some(t) = &self.request.transform {
                feature
                    .geometry
                    .for_each_coord_mut(|c| t.coord_to_destination(c));
            }
            return Ok(Some(feature));
        }

        self.finish();
        Ok(None)
    }

    /// Restart from the first candidate. Returns `false` once closed.
    ///
    /// The open file handle and the cached index candidates are kept.
    pub fn rewind(&mut self) -> bool {
        if self.state == IteratorState::Closed {
            return false;
        }
        self.cursor = 0;
        self.state = IteratorState::Ready;
        true
    }

    /// Release the file handle and close for good.
    ///
    /// Returns `true` if this call closed the iterator, `false` if it was already closed.
    pub fn close(&mut self) -> bool {
        if self.state == IteratorState::Closed {
            return false;
        }
        if self.reader.take().is_some() {
            tracing::debug!("closed record handle");
        }
        self.state = IteratorState::Closed;
        true
    }

    fn finish(&mut self) {
        self.reader = None;
        self.state = IteratorState::Exhausted;
    }

    /// On-disk ordinal of the next candidate, advancing the cursor.
    fn next_ordinal(&mut self) -> Option<u64> {
        let indexed = self
            .filter_rect
            .and_then(|rect| self.source.index().map(|index| (rect, index)));
        match indexed {
            Some((rect, index)) => {
                let candidates = self.candidates.get_or_insert_with(|| {
                    let found = index.search(&rect);
                    tracing::debug!(candidates = found.len(), "index search");
                    found
                });
                let leaf = *candidates.get(self.cursor)?;
                self.cursor += 1;
                index.get_index(leaf)
            }
            None => {
                let ordinal = self.cursor as u64;
                if ordinal >= self.source.feature_count() {
                    return None;
                }
                self.cursor += 1;
                Some(ordinal)
            }
        }
    }

    fn read_record(&mut self, offset: u64) -> Result<()> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| Error::Io(std::io::Error::other("record handle is not open")))?;
        reader.read_record_at(offset, &mut self.buf)
    }

    fn decode_current(&self) -> Result<Feature> {
        let view = FeatureView::parse(&self.buf)?;
        decode_feature(&view, self.source.header(), self.request.degenerate_rings)
    }
}

impl Iterator for FeatureIterator {
    type Item = Result<Feature>;

    fn next(&mut self) -> Option<Self::Item> {
        self.fetch().transpose()
    }
}

impl Drop for FeatureIterator {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for FeatureIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureIterator")
            .field("filter", &self.request.filter)
            .field("filter_rect", &self.filter_rect)
            .field("state", &self.state)
            .field("open", &self.reader.is_some())
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}
