// THEORY:
// The engine's building blocks, bottom-up: vectors and pixels, grid geometry and
// the label grid, the labelling pass, then the passes that rework a labelled grid
// (mergers, similarity search, mask refinement, hole filling).

pub mod geometry;
pub mod hole_filler;
pub mod label_forest;
pub mod label_graph;
pub mod label_grid;
pub mod mask_refiner;
pub mod neighbor_merger;
pub mod pixel;
pub mod segmenter;
pub mod similarity_search;
pub mod small_group_merger;
pub mod utils;
pub mod vector;
