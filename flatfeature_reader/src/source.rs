// Copyright 2025 the Flatfeature Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Opening a file: magic, header, packed index, and offset table.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use flatfeature_index::{Aabb2D, PackedRTree, layout};

use crate::error::{Error, Result};
use crate::header::{
    HEADER_MAX_BUFFER_SIZE, HEADER_SIZE_SIZE, Header, MAGIC_BYTES, MAGIC_BYTES_SIZE,
};
use crate::iterator::{FeatureIterator, FeatureRequest};
use crate::record;

/// Size of one offset table entry.
pub const OFFSET_SIZE: usize = 8;

/// Limits applied while opening a source.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SourceOptions {
    /// Largest header body accepted, in bytes.
    pub max_header_len: usize,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            max_header_len: HEADER_MAX_BUFFER_SIZE,
        }
    }
}

/// An opened file: the parsed header, the optional packed index, and the offset table.
///
/// Everything here is immutable after [`Source::open`], so one source can back any number
/// of iterators; each iterator reads records through its own [`RecordReader`].
#[derive(Debug)]
pub struct Source {
    path: PathBuf,
    header: Header,
    index: Option<PackedRTree>,
    offsets: Vec<u64>,
    data_section_start: u64,
}

impl Source {
    /// Open and validate the file at `path` with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, SourceOptions::default())
    }

    /// Open and validate the file at `path`.
    ///
    /// The handle used for parsing is released before returning, on success and on error.
    pub fn open_with(path: impl AsRef<Path>, options: SourceOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut magic = [0_u8; MAGIC_BYTES_SIZE];
        read_section(&mut reader, &mut magic, "magic bytes")?;
        if magic != MAGIC_BYTES {
            return Err(Error::Format(format!("bad magic bytes {magic:02x?}")));
        }

        let header_len = reader
            .read_u32::<LittleEndian>()
            .map_err(|e| eof_as_format(e, "header length"))? as usize;
        if header_len > options.max_header_len {
            return Err(Error::Format(format!(
                "header length {header_len} exceeds limit {}",
                options.max_header_len
            )));
        }
        let mut consumed = (MAGIC_BYTES_SIZE + HEADER_SIZE_SIZE) as u64;
        let mut remaining = file_len.saturating_sub(consumed);
        ensure_available(header_len as u64, remaining, "header")?;
        let mut header_bytes = vec![0_u8; header_len];
        read_section(&mut reader, &mut header_bytes, "header")?;
        let header = Header::parse(&header_bytes)?;
        consumed += header_len as u64;
        remaining -= header_len as u64;

        let index = if header.has_index() {
            let size = layout::size_in_bytes(header.features_count, header.index_node_size)?;
            ensure_available(size as u64, remaining, "spatial index")?;
            let mut bytes = vec![0_u8; size];
            read_section(&mut reader, &mut bytes, "spatial index")?;
            consumed += size as u64;
            remaining -= size as u64;
            Some(PackedRTree::from_bytes(
                &bytes,
                header.features_count,
                header.index_node_size,
            )?)
        } else {
            None
        };

        let table_len = usize::try_from(header.features_count)
            .ok()
            .and_then(|n| n.checked_mul(OFFSET_SIZE))
            .ok_or_else(|| {
                Error::Format(format!(
                    "offset table for {} features is too large",
                    header.features_count
                ))
            })?;
        ensure_available(table_len as u64, remaining, "offset table")?;
        let mut table = vec![0_u8; table_len];
        read_section(&mut reader, &mut table, "offset table")?;
        let mut offsets = vec![0_u64; table_len / OFFSET_SIZE];
        LittleEndian::read_u64_into(&table, &mut offsets);
        consumed += table_len as u64;

        tracing::debug!(
            path = %path.display(),
            features = header.features_count,
            geometry_type = %header.geometry_type,
            indexed = index.is_some(),
            data_section_start = consumed,
            "opened source"
        );

        Ok(Self {
            path,
            header,
            index,
            offsets,
            data_section_start: consumed,
        })
    }

    /// Path this source was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The parsed header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Number of features declared by the header.
    pub fn feature_count(&self) -> u64 {
        self.header.features_count
    }

    /// Layer extent, straight from the header envelope.
    pub fn extent(&self) -> Aabb2D<f64> {
        self.header.envelope
    }

    /// The packed index, when the file has one.
    pub fn index(&self) -> Option<&PackedRTree> {
        self.index.as_ref()
    }

    /// Record offsets in on-disk order, relative to the data section.
    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    /// Offset of the feature with on-disk ordinal `ordinal`.
    pub fn offset(&self, ordinal: u64) -> Option<u64> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| self.offsets.get(i).copied())
    }

    /// Absolute file position where feature records begin.
    pub fn data_section_start(&self) -> u64 {
        self.data_section_start
    }

    /// Open a fresh handle for record access.
    pub fn reader(&self) -> Result<RecordReader> {
        let file = File::open(&self.path)?;
        Ok(RecordReader::new(file, self.data_section_start))
    }

    /// Read the raw record at `offset` through a one-shot handle.
    pub fn read_record_at(&self, offset: u64) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.reader()?.read_record_at(offset, &mut buf)?;
        Ok(buf)
    }

    /// Iterate over features matching `request`.
    pub fn features(self: &Arc<Self>, request: FeatureRequest) -> FeatureIterator {
        FeatureIterator::new(Arc::clone(self), request)
    }
}

/// An owned, buffered handle positioned relative to a source's data section.
///
/// The handle remembers where the last record ended. Reading the next record in file order
/// does not seek, and short forward or backward hops stay inside the read buffer.
#[derive(Debug)]
pub struct RecordReader<R = File> {
    inner: BufReader<R>,
    data_section_start: u64,
    // Absolute position of `inner`; unknown after a failed read.
    pos: Option<u64>,
}

impl<R: Read + Seek> RecordReader<R> {
    /// Wrap `inner`, whose data section begins at absolute position `data_section_start`.
    pub fn new(inner: R, data_section_start: u64) -> Self {
        Self {
            inner: BufReader::new(inner),
            data_section_start,
            pos: None,
        }
    }

    /// Read the record at `offset` within the data section into `buf`.
    pub fn read_record_at(&mut self, offset: u64, buf: &mut Vec<u8>) -> Result<()> {
        let Some(target) = self.data_section_start.checked_add(offset) else {
            let msg = format!("offset {offset} overflows");
            return Err(std::io::Error::new(ErrorKind::InvalidInput, msg).into());
        };
        self.reposition(target)?;
        self.pos = None;
        record::read_framed(&mut self.inner, buf)?;
        let consumed = (record::RECORD_SIZE_SIZE + buf.len()) as u64;
        self.pos = Some(target.saturating_add(consumed));
        Ok(())
    }

    fn reposition(&mut self, target: u64) -> std::io::Result<()> {
        let delta = self
            .pos
            .and_then(|pos| i64::try_from(i128::from(target) - i128::from(pos)).ok());
        match delta {
            Some(0) => Ok(()),
            Some(delta) => self.inner.seek_relative(delta),
            None => self.inner.seek(SeekFrom::Start(target)).map(drop),
        }
    }
}

fn read_section<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| eof_as_format(e, what))
}

fn eof_as_format(e: std::io::Error, what: &str) -> Error {
    if e.kind() == ErrorKind::UnexpectedEof {
        Error::Format(format!("file ends inside the {what}"))
    } else {
        Error::Io(e)
    }
}

fn ensure_available(needed: u64, remaining: u64, what: &str) -> Result<()> {
    if needed > remaining {
        return Err(Error::Format(format!(
            "{what} needs {needed} bytes but only {remaining} remain"
        )));
    }
    Ok(())
}
