//! Engine configuration.

use crate::ViewResult;
use serde::{Deserialize, Serialize};

/// Default for [`ViewConfig::max_list_index`].
pub const DEFAULT_MAX_LIST_INDEX: usize = (1 << 20) - 1;

/// Controls how declared field paths are parsed.
///
/// ```
/// use flatview::ViewConfig;
///
/// let config = ViewConfig::from_json(r#"{"separator": "/"}"#).unwrap();
/// assert_eq!(config.separator, '/');
/// assert!(config.numeric_segments_as_indices);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Character separating field path segments.
    pub separator: char,
    /// Treat purely numeric segments as list indices. When false every
    /// segment is a map key and no list containers are built.
    pub numeric_segments_as_indices: bool,
    /// Largest numeric segment still treated as a list index. Larger digit
    /// runs are map keys, so a list never grows past `max_list_index + 1` slots.
    pub max_list_index: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            separator: '.',
            numeric_segments_as_indices: true,
            max_list_index: DEFAULT_MAX_LIST_INDEX,
        }
    }
}

impl ViewConfig {
    /// Load a configuration from a JSON document. Missing keys take defaults.
    pub fn from_json(json: &str) -> ViewResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
