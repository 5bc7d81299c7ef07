use crate::core_modules::segmenter::AverageMode;
use crate::core_modules::small_group_merger::SmallGroupCriterion;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for labelling and the merge passes that follow it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Minimum cosine similarity for a pixel to join a neighboring group.
    pub threshold: f64,
    pub average_mode: AverageMode,
    /// Similarity-graph threshold for the neighbor-group merge. `None` skips the
    /// merge.
    pub merge_threshold: Option<f64>,
    /// Groups below this size are folded into their neighbors. 0 skips the pass.
    pub min_group_size: usize,
    pub small_group_criterion: SmallGroupCriterion,
    /// Append lightness entropy to the comparison vectors of the neighbor merge.
    pub use_entropy: bool,
    /// Only merge similar groups that touch.
    pub require_adjacency: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            threshold: 0.95,
            average_mode: AverageMode::default(),
            merge_threshold: Some(0.995),
            min_group_size: 16,
            small_group_criterion: SmallGroupCriterion::default(),
            use_entropy: true,
            require_adjacency: false,
        }
    }
}

/// Tunables for snapping a mask to superpixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    /// Fraction of a label's extended pixel set that must be masked.
    pub inclusive_threshold: f64,
    /// Similarity-graph threshold used to extend a label's pixel set.
    pub similarity_threshold: f64,
    /// When set, holes in the refined image are filled at this similarity.
    pub hole_fill_threshold: Option<f64>,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            inclusive_threshold: 0.5,
            similarity_threshold: 0.99,
            hole_fill_threshold: None,
        }
    }
}

/// Settings file layout: both sections optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub segmentation: SegmentationConfig,
    pub refine: RefineConfig,
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
