// THEORY:
// The `pipeline` module is the top-level API of the segmentation engine. It strings
// the passes together in a fixed order and reports what each one did:
//
// 1.  Label the image with region growing.
// 2.  Optionally flatten similarity-graph components (`merge_threshold`).
// 3.  Fold small groups into their neighbors (`min_group_size`).
//
// Mask refinement runs separately on a finished grid, since it needs a mask and is
// the one stage that fans out across the worker pool.

use crate::config::{RefineConfig, SegmentationConfig};
use crate::core_modules::hole_filler::fill_holes;
use crate::core_modules::label_grid::LabelGrid;
use crate::core_modules::mask_refiner::create_refined_image;
use crate::core_modules::neighbor_merger::merge_neighbor_groups;
use crate::core_modules::segmenter::label_pixels_with;
use crate::core_modules::small_group_merger::{merge_small_groups_with, summarize_lines, LineSummary};
use crate::core_modules::utils::image_helper::PixelSource;
use crate::error::Result;
use image::RgbaImage;
use log::info;

/// What one segmentation run produced.
#[derive(Debug, Clone)]
pub struct SegmentationReport {
    pub grid: LabelGrid,
    /// Distinct labels right after labelling.
    pub initial_label_count: usize,
    /// Labels absorbed by the neighbor-group merge.
    pub merged_labels: usize,
    pub small_groups_before: usize,
    pub small_groups_after: usize,
    /// Thin-line groups left in the final grid.
    pub lines: LineSummary,
}

impl SegmentationReport {
    /// Distinct labels in the final grid.
    pub fn label_count(&self) -> usize {
        self.grid.label_count()
    }
}

pub struct SegmentationPipeline {
    config: SegmentationConfig,
}

impl SegmentationPipeline {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    pub fn run<S: PixelSource + ?Sized>(&self, image: &S) -> Result<SegmentationReport> {
        let config = &self.config;

        // --- 1. Labelling ---
        let mut grid = label_pixels_with(image, config.threshold, config.average_mode)?;
        let initial_label_count = grid.label_count();

        // --- 2. Neighbor-group merge ---
        let merged_labels = match config.merge_threshold {
            Some(threshold) => merge_neighbor_groups(
                &mut grid,
                threshold,
                config.use_entropy,
                config.require_adjacency,
            )?,
            None => 0,
        };

        // --- 3. Small-group merge ---
        let (small_groups_before, small_groups_after) = if config.min_group_size > 0 {
            let merged =
                merge_small_groups_with(&mut grid, config.min_group_size, config.small_group_criterion)?;
            (merged.small_groups, merged.remaining_small_groups)
        } else {
            (0, 0)
        };

        let lines = summarize_lines(&grid);
        let report = SegmentationReport {
            grid,
            initial_label_count,
            merged_labels,
            small_groups_before,
            small_groups_after,
            lines,
        };
        info!(
            "segmentation: {} labels -> {} labels ({} small groups left, {} lines)",
            report.initial_label_count,
            report.label_count(),
            report.small_groups_after,
            report.lines.count
        );
        Ok(report)
    }
}

/// Snaps `mask` to the superpixels of `grid`, then fills holes if configured.
pub async fn refine_mask<S, M>(
    grid: &LabelGrid,
    source: &S,
    mask: &M,
    config: &RefineConfig,
) -> Result<RgbaImage>
where
    S: PixelSource + ?Sized,
    M: PixelSource + ?Sized,
{
    let mut refined = create_refined_image(
        grid,
        source,
        mask,
        config.inclusive_threshold,
        config.similarity_threshold,
    )
    .await?;
    if let Some(threshold) = config.hole_fill_threshold {
        fill_holes(source, &mut refined, threshold)?;
    }
    Ok(refined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn speckled() -> RgbaImage {
        RgbaImage::from_fn(6, 6, |x, y| match (x, y) {
            (1, 1) => Rgba([0, 255, 0, 255]),
            (_, _) if x < 3 => Rgba([255, 0, 0, 255]),
            _ => Rgba([0, 0, 255, 255]),
        })
    }

    #[test]
    fn passes_can_be_switched_off() {
        let config = SegmentationConfig {
            merge_threshold: None,
            min_group_size: 0,
            ..SegmentationConfig::default()
        };
        let report = SegmentationPipeline::new(config).run(&speckled()).unwrap();
        assert_eq!(report.initial_label_count, 3);
        assert_eq!(report.label_count(), 3);
        assert_eq!(report.merged_labels, 0);
        assert_eq!(report.small_groups_before, 0);
    }

    #[test]
    fn small_groups_are_folded_away() {
        let config = SegmentationConfig {
            min_group_size: 2,
            ..SegmentationConfig::default()
        };
        let report = SegmentationPipeline::new(config).run(&speckled()).unwrap();
        assert_eq!(report.small_groups_before, 1);
        assert_eq!(report.small_groups_after, 0);
        assert_eq!(report.label_count(), 2);
    }
}
