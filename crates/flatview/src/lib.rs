//! Structured views over a flat, frequently-updated value sequence.
//!
//! `flatview` separates a sequence of values that changes often from a
//! structure that changes rarely. The structure maps field paths to offsets or
//! slices of the sequence; consumers read named, nested fields instead of raw
//! offsets, and producers only resend the values.
//!
//! # Core Concepts
//!
//! - **FlatView**: The engine. Owns the values, the live structure and the transform cache
//! - **Structure**: An ordered mapping from field path to range spec
//! - **RangeSpec**: Index, slice, either with a transform, or a derivation from the previous slot
//! - **ContainerRef**: Shared handle to a nested map or list in the view
//!
//! # Lifecycle
//!
//! ```text
//! set_values      -> replace values, drop cached transform outputs
//! add_structure   -> install fields, reuse containers already built
//! reset_structure -> remove fields, keep their containers as "unused"
//! remove_unused_structure -> delete containers nobody reclaimed
//! set_structure   =  reset + add + remove_unused
//! ```
//!
//! # Quick Start
//!
//! ```
//! use flatview::{FlatView, RangeSpec, Structure};
//! use serde_json::json;
//!
//! let mut view = FlatView::new();
//! view.set_values([11, 12, 13, 14, 15, 16]);
//! view.set_structure(
//!     &Structure::new()
//!         .field("a", RangeSpec::index(0).with(|v| json!(v.as_i64().unwrap_or(0) * 100)))
//!         .field("list", RangeSpec::slice(3, 6)),
//! )
//! .unwrap();
//!
//! assert_eq!(view.export(), json!({"a": 1100, "list": [14, 15, 16]}));
//! ```

mod config;
mod container;
mod error;
mod path;
mod range;
mod store;
mod structure;
mod view;

pub use config::{ViewConfig, DEFAULT_MAX_LIST_INDEX};
pub use container::ContainerRef;
pub use error::{ViewError, ViewResult};
pub use path::{parse_field_path, Path, Seg};
pub use range::{RangeSpec, Transform};
pub use structure::Structure;
pub use view::FlatView;

// Re-export serde_json::Value for convenience
pub use serde_json::Value;
