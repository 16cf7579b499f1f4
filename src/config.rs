//! Session configuration.
//!
//! Everything here has a sensible default; walkers that just want the stock
//! behavior never need to touch this module. The configuration is designed
//! to be easily serializable and loadable from JSON while keeping complexity
//! minimal.

use serde::{Deserialize, Serialize};

/// Path segments designating per-feature spatial payloads inside a dataset
/// layout. A blob is only ever filtered when its repository-relative path
/// contains one of these markers; everything else is included unconditionally.
pub const DEFAULT_FEATURE_MARKERS: &[&str] =
    &["/.sno-dataset/feature/", "/.table-dataset/feature/"];

/// Index files probed inside the repository's metadata directory, in order.
/// The first one found decides the session's lookup strategy.
pub const DEFAULT_INDEX_FILENAMES: &[&str] = &["feature_envelopes.db", "feature_cells.db"];

/// Tuning and layout knobs for one filter session.
///
/// # Example
///
/// ```rust
/// use geosieve::FilterConfig;
///
/// let config = FilterConfig::default().with_max_query_cells(64);
///
/// // Or load from JSON; omitted fields keep their defaults.
/// let config: FilterConfig =
///     FilterConfig::from_json(r#"{"max_cell_precision": 5}"#).unwrap();
/// assert_eq!(config.max_cell_precision, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Upper bound on covering cells per query. More cells make the covering
    /// tighter (fewer false matches) at the cost of a larger query-cell set.
    #[serde(default = "FilterConfig::default_max_query_cells")]
    pub max_query_cells: usize,

    /// Finest cell precision used for covering cells (geohash length, 1-12).
    /// Bounds cell granularity near the poles and the antimeridian.
    #[serde(default = "FilterConfig::default_max_cell_precision")]
    pub max_cell_precision: usize,

    /// Candidate index filenames, probed in order inside the repository's
    /// metadata directory.
    #[serde(default = "FilterConfig::default_index_filenames")]
    pub index_filenames: Vec<String>,

    /// Path markers identifying feature blobs (substring match).
    #[serde(default = "FilterConfig::default_feature_markers")]
    pub feature_path_markers: Vec<String>,

    /// Emit a progress log line every this many visited objects (0 disables).
    #[serde(default = "FilterConfig::default_progress_interval")]
    pub progress_interval: u64,
}

impl FilterConfig {
    const fn default_max_query_cells() -> usize {
        32
    }

    const fn default_max_cell_precision() -> usize {
        6
    }

    fn default_index_filenames() -> Vec<String> {
        DEFAULT_INDEX_FILENAMES.iter().map(|s| s.to_string()).collect()
    }

    fn default_feature_markers() -> Vec<String> {
        DEFAULT_FEATURE_MARKERS.iter().map(|s| s.to_string()).collect()
    }

    const fn default_progress_interval() -> u64 {
        20_000
    }

    /// Adjust the covering-cell budget.
    pub fn with_max_query_cells(mut self, max_query_cells: usize) -> Self {
        assert!(max_query_cells > 0, "query-cell budget must be at least one");
        self.max_query_cells = max_query_cells;
        self
    }

    /// Adjust the finest covering precision.
    pub fn with_max_cell_precision(mut self, precision: usize) -> Self {
        assert!(
            (1..=12).contains(&precision),
            "cell precision must be between 1 and 12"
        );
        self.max_cell_precision = precision;
        self
    }

    /// Replace the feature-path markers.
    pub fn with_feature_path_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feature_path_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the candidate index filenames.
    pub fn with_index_filenames<I, S>(mut self, filenames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.index_filenames = filenames.into_iter().map(Into::into).collect();
        self
    }

    /// Load configuration from a JSON string.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Serialize configuration to a JSON string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_query_cells: Self::default_max_query_cells(),
            max_cell_precision: Self::default_max_cell_precision(),
            index_filenames: Self::default_index_filenames(),
            feature_path_markers: Self::default_feature_markers(),
            progress_interval: Self::default_progress_interval(),
        }
    }
}
