// Copyright 2025 the Flatfeature Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Data-source facade with explicit validity.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use flatfeature_index::Aabb2D;

use crate::error::Error;
use crate::header::GeometryType;
use crate::iterator::{FeatureIterator, FeatureRequest};
use crate::source::{Source, SourceOptions};

/// Short key identifying this provider to a host application.
pub const PROVIDER_KEY: &str = "ffb";

/// Human-readable provider description.
pub const PROVIDER_DESCRIPTION: &str = "Flatfeature format provider";

/// A file-backed data source that never fails to construct.
///
/// Opening errors are kept and reported through [`Provider::is_valid`] and
/// [`Provider::error`]; an invalid provider stays invalid. Re-create it to retry.
#[derive(Debug)]
pub struct Provider {
    path: PathBuf,
    source: Result<Arc<Source>, Error>,
}

impl Provider {
    /// Open the file at `path` with default options.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_options(path, SourceOptions::default())
    }

    /// Open the file at `path`.
    pub fn with_options(path: impl AsRef<Path>, options: SourceOptions) -> Self {
        let path = path.as_ref().to_path_buf();
        let source = Source::open_with(&path, options).map(Arc::new);
        if let Err(e) = &source {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "could not open data source"
            );
        }
        Self { path, source }
    }

    /// Provider key.
    pub fn name(&self) -> &'static str {
        PROVIDER_KEY
    }

    /// Provider description.
    pub fn description(&self) -> &'static str {
        PROVIDER_DESCRIPTION
    }

    /// Storage type shown to users.
    pub fn storage_type(&self) -> &'static str {
        "Flatfeature file"
    }

    /// Path the provider was created for.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file opened successfully.
    pub fn is_valid(&self) -> bool {
        self.source.is_ok()
    }

    /// Why the file failed to open, if it did.
    pub fn error(&self) -> Option<&Error> {
        self.source.as_ref().err()
    }

    /// The underlying source, if valid.
    pub fn source(&self) -> Option<&Arc<Source>> {
        self.source.as_ref().ok()
    }

    /// Feature count from the header; 0 when invalid.
    pub fn feature_count(&self) -> u64 {
        self.source().map(|s| s.feature_count()).unwrap_or(0)
    }

    /// Layer geometry type; [`GeometryType::Unknown`] when invalid.
    pub fn geometry_type(&self) -> GeometryType {
        self.source()
            .map(|s| s.header().geometry_type)
            .unwrap_or(GeometryType::Unknown)
    }

    /// Layer name from the header.
    pub fn layer_name(&self) -> Option<&str> {
        self.source().map(|s| s.header().name.as_str())
    }

    /// Layer extent from the header, without scanning.
    pub fn extent(&self) -> Option<Aabb2D<f64>> {
        self.source().map(|s| s.extent())
    }

    /// Iterate over features, or `None` when the provider is invalid.
    pub fn features(&self, request: FeatureRequest) -> Option<FeatureIterator> {
        self.source().map(|s| s.features(request))
    }
}
