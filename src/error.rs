use crate::core_modules::label_grid::Label;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Label {0} not found")]
    LabelNotFound(Label),

    #[error("Cannot perform cosine similarity on a zero vector")]
    ZeroVector,

    #[error("Vector of capacity {capacity} cannot hold {requested} elements")]
    VectorCapacity { requested: usize, capacity: usize },

    #[error("Index {index} is out of range for a vector of length {len}")]
    VectorIndex { index: usize, len: usize },

    #[error("Cannot label an empty image")]
    EmptyImage,

    #[error("Dimension mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("Missing label assignment for pixel ({x}, {y})")]
    MissingAssignment { x: u32, y: u32 },

    #[error("Pixel ({x}, {y}) is assigned more than one label")]
    DuplicateAssignment { x: u32, y: u32 },

    #[error("Assigned pixel ({x}, {y}) is outside the {width}x{height} image")]
    AssignmentOutOfRange { x: u32, y: u32, width: u32, height: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Label task failed: {0}")]
    Task(String),
}

impl VisionError {
    pub fn dimension_mismatch(expected: (u32, u32), found: (u32, u32)) -> Self {
        VisionError::DimensionMismatch { expected, found }
    }

    pub fn task(message: impl Into<String>) -> Self {
        VisionError::Task(message.into())
    }

    /// True for errors caused by querying something the grid does not hold.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            VisionError::LabelNotFound(_) | VisionError::MissingAssignment { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, VisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_not_found_mentions_label() {
        let err = VisionError::LabelNotFound(42);
        assert_eq!(err.to_string(), "Label 42 not found");
        assert!(err.is_lookup_failure());
    }

    #[test]
    fn zero_vector_is_not_a_lookup_failure() {
        assert!(!VisionError::ZeroVector.is_lookup_failure());
    }

    #[test]
    fn bad_assignments_name_the_pixel() {
        let err = VisionError::DuplicateAssignment { x: 1, y: 0 };
        assert_eq!(err.to_string(), "Pixel (1, 0) is assigned more than one label");
        let err = VisionError::AssignmentOutOfRange { x: 9, y: 9, width: 2, height: 1 };
        assert_eq!(err.to_string(), "Assigned pixel (9, 9) is outside the 2x1 image");
    }

    #[test]
    fn dimension_mismatch_formats_both_sizes() {
        let err = VisionError::dimension_mismatch((4, 4), (2, 3));
        assert_eq!(
            err.to_string(),
            "Dimension mismatch: expected (4, 4), found (2, 3)"
        );
    }
}
