// THEORY:
// This file is the entry point for the `vision_pixels` library crate. It turns an
// image into superpixels: groups of neighboring pixels with the same perceived
// color, found by region growing over a hue-wrap-safe color vector.
//
// The high-level interface is `SegmentationPipeline` with its configuration and
// report, plus `refine_mask` for snapping a rough mask to superpixel boundaries.
// The passes themselves live in `core_modules` and stay public for callers that
// want to run them one at a time.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::{Config, RefineConfig, SegmentationConfig};
pub use core_modules::geometry::Point;
pub use core_modules::label_grid::{Label, LabelDump, LabelGrid, PixelLabel};
pub use core_modules::pixel::pixel::Pixel;
pub use error::{Result, VisionError};
pub use pipeline::{refine_mask, SegmentationPipeline, SegmentationReport};
