//! Error types for flatview operations.

use crate::{Path, Seg};
use thiserror::Error;

/// Result type alias for flatview operations.
pub type ViewResult<T> = Result<T, ViewError>;

/// Errors that can occur while declaring or tearing down structure.
///
/// Reads never fail: an out-of-range index yields `None`.
#[derive(Debug, Error)]
pub enum ViewError {
    /// An existing path segment could not be navigated because its parent
    /// is missing or is not a container.
    #[error("cannot resolve segment '{segment}' under '{cursor}'")]
    PathResolution {
        /// The portion of the path resolved before the failure.
        cursor: Path,
        /// The segment that could not be navigated.
        segment: Seg,
    },

    /// A field path with no segments was declared.
    #[error("invalid field path: {raw:?}")]
    InvalidFieldPath {
        /// The path as it was declared.
        raw: String,
    },

    /// A serialized range spec had an unsupported shape.
    #[error("invalid range spec for '{field}': {message}")]
    InvalidRangeSpec {
        /// The field the spec was declared for.
        field: String,
        /// Description of what went wrong.
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ViewError {
    /// Create a path resolution error.
    #[inline]
    pub fn path_resolution(cursor: Path, segment: Seg) -> Self {
        ViewError::PathResolution { cursor, segment }
    }

    /// Create an invalid field path error.
    #[inline]
    pub fn invalid_field_path(raw: impl Into<String>) -> Self {
        ViewError::InvalidFieldPath { raw: raw.into() }
    }

    /// Create an invalid range spec error.
    #[inline]
    pub fn invalid_range_spec(field: impl Into<String>, message: impl Into<String>) -> Self {
        ViewError::InvalidRangeSpec {
            field: field.into(),
            message: message.into(),
        }
    }
}
