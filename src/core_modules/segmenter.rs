// THEORY:
// The `segmenter` is the region-growing labelling pass: one raster scan that
// assigns every pixel a group label. It is the only stage that turns raw pixels
// into a `LabelGrid`; every other stage refines its output.
//
// Algorithm, per pixel, in row-major order (y outer, x inner):
// 1.  Convert the pixel to its HxHySL vector.
// 2.  Collect the labels of the already-visited 8-neighbors. In this scan order
//     those are the three pixels above and the one to the left.
// 3.  Compare the pixel vector against each neighbor label's running average
//     (not the neighbor pixel itself) with cosine similarity; keep the best. Ties
//     keep the first neighbor in `neighbor_locations` order.
// 4.  Join the best label if its similarity reaches `threshold`, otherwise open
//     a new label (a counter starting at 0).
// 5.  Fold the pixel into the chosen label's running average.
//
// A pixel can only join a label that already owns one of its neighbors, so every
// group is 8-connected when the pass ends. The result depends on scan order;
// that order is part of the contract and must not change.
//
// The scan is inherently sequential: each decision reads state written by the
// previous pixels. Group state lives only for the duration of the pass.

use crate::core_modules::geometry::{neighbor_locations, Point};
use crate::core_modules::label_grid::{Label, LabelGrid, PixelLabel};
use crate::core_modules::utils::image_helper::PixelSource;
use crate::core_modules::vector::VectorN;
use crate::error::{Result, VisionError};
use log::debug;
use serde::{Deserialize, Serialize};

/// How a group's running average absorbs a new member.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AverageMode {
    /// Textbook incremental mean: `avg += (v - avg) / n`.
    #[default]
    IncrementalMean,
    /// Exponential blend `avg * sigma + v * (1 - sigma)`. A sigma of 1.0 freezes
    /// the average at the group's first pixel.
    Decay { sigma: f64 },
}

/// Running average color of one label during the scan.
#[derive(Debug, Clone, Copy)]
struct GroupState {
    average: VectorN,
    samples: u32,
}

impl GroupState {
    fn new(first: VectorN) -> Self {
        Self {
            average: first,
            samples: 1,
        }
    }

    fn absorb(&mut self, vector: VectorN, mode: AverageMode) {
        self.samples += 1;
        self.average = match mode {
            AverageMode::IncrementalMean => {
                self.average + (vector - self.average) / self.samples as f64
            }
            AverageMode::Decay { sigma } => self.average * sigma + vector * (1.0 - sigma),
        };
    }
}

/// Row-major offset of `point`, widened before multiplying.
fn cell_index(point: Point, width: u32) -> usize {
    point.y as usize * width as usize + point.x as usize
}

/// Labels `image` with the textbook running mean.
pub fn label_pixels<S: PixelSource + ?Sized>(image: &S, threshold: f64) -> Result<LabelGrid> {
    label_pixels_with(image, threshold, AverageMode::default())
}

/// Labels `image`, folding members into group averages with `mode`.
pub fn label_pixels_with<S: PixelSource + ?Sized>(
    image: &S,
    threshold: f64,
    mode: AverageMode,
) -> Result<LabelGrid> {
    let width = image.width();
    let height = image.height();
    if width == 0 || height == 0 {
        return Err(VisionError::EmptyImage);
    }

    let mut cells: Vec<PixelLabel> = Vec::with_capacity(width as usize * height as usize);
    // Indexed by label; labels are dense from 0.
    let mut groups: Vec<GroupState> = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let pixel = image.get_pixel(x, y);
            let vector = pixel.to_hxhysl();

            let mut best: Option<(f64, Label)> = None;
            for neighbor in neighbor_locations(x, y, 1, width, height) {
                // Only neighbors earlier in the raster have a label yet.
                if (neighbor.y, neighbor.x) >= (y, x) {
                    continue;
                }
                let label = cells[cell_index(neighbor, width)].label;
                let similarity = vector.cosine_similarity(&groups[label as usize].average)?;
                if best.is_none_or(|(best_similarity, _)| similarity > best_similarity) {
                    best = Some((similarity, label));
                }
            }

            let label = match best {
                Some((similarity, label)) if similarity >= threshold => {
                    groups[label as usize].absorb(vector, mode);
                    label
                }
                _ => {
                    groups.push(GroupState::new(vector));
                    (groups.len() - 1) as Label
                }
            };

            cells.push(PixelLabel {
                pixel,
                label,
                point: Point { x, y },
            });
        }
    }

    debug!(
        "labelled {}x{} image into {} groups (threshold {threshold})",
        width,
        height,
        groups.len()
    );
    Ok(LabelGrid::from_cells(width, height, cells))
}
