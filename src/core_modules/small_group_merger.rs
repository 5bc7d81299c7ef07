// THEORY:
// The small-group merger cleans up the fragments the labelling pass leaves
// behind: single noisy pixels, anti-aliased seams, one-pixel-wide "lines" along
// region borders.
//
// A group is "small" under one of two criteria:
// - `BelowSize`: fewer than `min_size` pixels.
// - `NoInterior`: every pixel has a differently labelled pixel within
//   `max(1, min_size / 2)`; the group has no core. With radius 1 this is exactly
//   the thin-line test.
//
// Every pixel of a small group moves to the label of its most similar
// differently-labelled 8-neighbor, compared pixel color to pixel color (not the
// group average). Small groups are processed in ascending label order against the
// live grid, so a group can be absorbed into a neighbor that was itself just
// reassigned. One call is one pass; groups that are still small afterwards are
// counted, not chased. `merge_small_groups_until` repeats passes up to a bound.

use crate::core_modules::geometry::{neighbor_locations, Point};
use crate::core_modules::label_grid::{Label, LabelGrid};
use crate::error::Result;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which groups count as "small".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmallGroupCriterion {
    #[default]
    BelowSize,
    NoInterior,
}

/// Outcome of one or more merge passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SmallGroupReport {
    /// Small groups found before the first pass.
    pub small_groups: usize,
    /// Pixels whose label changed.
    pub reassigned_pixels: usize,
    /// Groups still small after the last pass.
    pub remaining_small_groups: usize,
    pub passes: usize,
}

/// Size range of the thin-line groups in a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineSummary {
    pub count: usize,
    pub min_size: Option<usize>,
    pub max_size: Option<usize>,
}

fn interior_radius(min_size: usize) -> u32 {
    (min_size / 2).max(1) as u32
}

fn has_other_label_within(grid: &LabelGrid, point: Point, label: Label, radius: u32) -> bool {
    neighbor_locations(point.x, point.y, radius, grid.width(), grid.height())
        .into_iter()
        .any(|neighbor| grid[neighbor].label != label)
}

/// Labels that are small under `criterion`, with their member points.
pub fn find_small_groups(
    grid: &LabelGrid,
    min_size: usize,
    criterion: SmallGroupCriterion,
) -> BTreeMap<Label, Vec<Point>> {
    let radius = interior_radius(min_size);
    grid.label_points()
        .into_iter()
        .filter(|(label, points)| match criterion {
            SmallGroupCriterion::BelowSize => points.len() < min_size,
            SmallGroupCriterion::NoInterior => points
                .iter()
                .all(|&point| has_other_label_within(grid, point, *label, radius)),
        })
        .collect()
}

/// Labels every pixel of which touches a different label, with their sizes.
pub fn find_line_groups(grid: &LabelGrid) -> BTreeMap<Label, usize> {
    find_small_groups(grid, 2, SmallGroupCriterion::NoInterior)
        .into_iter()
        .map(|(label, points)| (label, points.len()))
        .collect()
}

pub fn summarize_lines(grid: &LabelGrid) -> LineSummary {
    let lines = find_line_groups(grid);
    let summary = LineSummary {
        count: lines.len(),
        min_size: lines.values().min().copied(),
        max_size: lines.values().max().copied(),
    };
    debug!(
        "found {} lines (range {:?} - {:?})",
        summary.count, summary.min_size, summary.max_size
    );
    summary
}

/// Best differently-labelled neighbor for the pixel at `point`.
fn closest_neighbor_label(grid: &LabelGrid, point: Point) -> Result<Option<Label>> {
    let cell = grid[point];
    let vector = cell.pixel.to_hxhysl();
    let mut best: Option<(f64, Label)> = None;
    for neighbor in neighbor_locations(point.x, point.y, 1, grid.width(), grid.height()) {
        let other = grid[neighbor];
        if other.label == cell.label {
            continue;
        }
        let similarity = vector.cosine_similarity(&other.pixel.to_hxhysl())?;
        if best.is_none_or(|(best_similarity, _)| similarity > best_similarity) {
            best = Some((similarity, other.label));
        }
    }
    Ok(best.map(|(_, label)| label))
}

fn merge_pass(
    grid: &mut LabelGrid,
    small: &BTreeMap<Label, Vec<Point>>,
) -> Result<usize> {
    let mut reassigned = 0;
    for points in small.values() {
        for &point in points {
            if let Some(label) = closest_neighbor_label(grid, point)? {
                grid.set_label(point, label);
                reassigned += 1;
            }
        }
    }
    Ok(reassigned)
}

/// One pass of the small-group merger with the `BelowSize` criterion.
pub fn merge_small_groups(grid: &mut LabelGrid, min_size: usize) -> Result<SmallGroupReport> {
    merge_small_groups_with(grid, min_size, SmallGroupCriterion::BelowSize)
}

/// One pass of the small-group merger.
pub fn merge_small_groups_with(
    grid: &mut LabelGrid,
    min_size: usize,
    criterion: SmallGroupCriterion,
) -> Result<SmallGroupReport> {
    merge_small_groups_until(grid, min_size, criterion, 1)
}

/// Repeats merge passes until no small group is left, a pass changes nothing, or
/// `max_passes` passes have run.
pub fn merge_small_groups_until(
    grid: &mut LabelGrid,
    min_size: usize,
    criterion: SmallGroupCriterion,
    max_passes: usize,
) -> Result<SmallGroupReport> {
    let mut small = find_small_groups(grid, min_size, criterion);
    let mut report = SmallGroupReport {
        small_groups: small.len(),
        ..SmallGroupReport::default()
    };

    while !small.is_empty() && report.passes < max_passes {
        let reassigned = merge_pass(grid, &small)?;
        report.passes += 1;
        report.reassigned_pixels += reassigned;
        small = find_small_groups(grid, min_size, criterion);
        if reassigned == 0 {
            break;
        }
    }
    report.remaining_small_groups = small.len();

    info!(
        "merged {} small groups ({} pixels) in {} passes, {} remain below {min_size}",
        report.small_groups, report.reassigned_pixels, report.passes, report.remaining_small_groups
    );
    Ok(report)
}

/// Folds every thin-line group into its neighbors.
pub fn remove_lines(grid: &mut LabelGrid) -> Result<SmallGroupReport> {
    merge_small_groups_with(grid, 2, SmallGroupCriterion::NoInterior)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::segmenter::label_pixels;
    use image::{Rgba, RgbaImage};
    use std::collections::BTreeSet;

    fn speck() -> LabelGrid {
        let image = RgbaImage::from_fn(5, 5, |x, y| {
            if (x, y) == (2, 2) {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        label_pixels(&image, 0.9).unwrap()
    }

    fn seam() -> LabelGrid {
        let image = RgbaImage::from_fn(5, 4, |x, _| match x {
            0 | 1 => Rgba([255, 0, 0, 255]),
            2 => Rgba([0, 255, 0, 255]),
            _ => Rgba([0, 0, 255, 255]),
        });
        label_pixels(&image, 0.9).unwrap()
    }

    #[test]
    fn a_lone_pixel_joins_its_surroundings() {
        let mut grid = speck();
        assert_eq!(grid.label_count(), 2);
        let report = merge_small_groups(&mut grid, 2).unwrap();
        assert_eq!(report.small_groups, 1);
        assert_eq!(report.reassigned_pixels, 1);
        assert_eq!(report.remaining_small_groups, 0);
        assert_eq!(grid.label_count(), 1);
        assert_eq!(grid.label_at(Point::new(2, 2)), Some(0));
    }

    #[test]
    fn distinct_pixels_move_to_a_neighbor_label() {
        let image = RgbaImage::from_fn(3, 3, |x, y| {
            Rgba([(x * 120) as u8, (y * 120) as u8, (x * 40 + y * 70) as u8 + 10, 255])
        });
        // A threshold above 1 gives every pixel its own label. On this image no
        // pixel is fully absorbed before its own turn, so every pixel moves.
        let mut grid = label_pixels(&image, 1.1).unwrap();
        let original = grid.clone();
        let original_labels: BTreeSet<Label> = original.label_sizes().into_keys().collect();
        assert_eq!(original_labels.len(), 9);

        merge_small_groups(&mut grid, 9).unwrap();

        for cell in grid.iter() {
            assert_ne!(cell.label, original[cell.point].label);
            assert!(original_labels.contains(&cell.label));
        }
        assert!(grid.label_count() < 9);
    }

    #[test]
    fn chained_merges_can_leave_a_pixel_on_its_own_label() {
        // Greens across the top, blues down the left, and a red cluster in the
        // bottom-right corner. Pixel (2, 2) is the red every other red is closest
        // to, so its three neighbors join label 8 before 8 itself is processed.
        let image = RgbaImage::from_fn(3, 3, |x, y| match (x, y) {
            (0, 0) => Rgba([0, 255, 0, 255]),
            (1, 0) => Rgba([0, 200, 0, 255]),
            (2, 0) => Rgba([0, 230, 20, 255]),
            (0, 1) => Rgba([0, 0, 255, 255]),
            (0, 2) => Rgba([0, 0, 200, 255]),
            (1, 1) => Rgba([255, 20, 0, 255]),
            (2, 1) => Rgba([255, 0, 20, 255]),
            (1, 2) => Rgba([200, 0, 0, 255]),
            _ => Rgba([255, 0, 0, 255]),
        });
        let mut grid = label_pixels(&image, 1.1).unwrap();
        assert_eq!(grid.label_at(Point::new(2, 2)), Some(8));

        let report = merge_small_groups(&mut grid, 9).unwrap();

        let absorbed = grid.label_points()[&8].clone();
        assert_eq!(
            absorbed,
            vec![Point::new(1, 1), Point::new(2, 1), Point::new(1, 2), Point::new(2, 2)]
        );
        // Label 8 had no differently labelled neighbor left when its turn came.
        assert!(find_small_groups(&grid, 9, SmallGroupCriterion::BelowSize).contains_key(&8));
        assert_eq!(report.small_groups, 9);
        assert_eq!(report.remaining_small_groups, grid.label_count());
        assert!(report.remaining_small_groups >= 1);
        assert_eq!(report.reassigned_pixels, 8);
    }

    #[test]
    fn a_group_without_differing_neighbors_stays() {
        let image = RgbaImage::from_pixel(3, 3, Rgba([9, 9, 9, 255]));
        let mut grid = label_pixels(&image, 0.9).unwrap();
        let report = merge_small_groups(&mut grid, 100).unwrap();
        assert_eq!(report.small_groups, 1);
        assert_eq!(report.reassigned_pixels, 0);
        assert_eq!(report.remaining_small_groups, 1);
    }

    #[test]
    fn lines_are_detected_and_removed() {
        let mut grid = seam();
        assert_eq!(grid.label_count(), 3);
        let lines = find_line_groups(&grid);
        assert_eq!(lines, BTreeMap::from([(1, 4)]));
        let summary = summarize_lines(&grid);
        assert_eq!(summary.count, 1);
        assert_eq!(summary.min_size, Some(4));

        remove_lines(&mut grid).unwrap();
        assert!(!grid.contains_label(1));
        for y in 0..4 {
            let label = grid.label_at(Point::new(2, y)).unwrap();
            assert!(label == 0 || label == 2);
        }
    }

    #[test]
    fn no_interior_flags_thin_groups_regardless_of_size() {
        let grid = seam();
        let thin = find_small_groups(&grid, 2, SmallGroupCriterion::NoInterior);
        assert!(thin.contains_key(&1));
        assert!(!thin.contains_key(&0));
        let wide = find_small_groups(&grid, 4, SmallGroupCriterion::NoInterior);
        assert_eq!(wide.len(), 3);
    }

    #[test]
    fn repeated_passes_stop_at_the_bound() {
        let image = RgbaImage::from_fn(4, 4, |x, y| {
            Rgba([(x * 60) as u8, (y * 60) as u8, ((x + y) * 30) as u8, 255])
        });
        let mut grid = label_pixels(&image, 1.1).unwrap();
        let report =
            merge_small_groups_until(&mut grid, 16, SmallGroupCriterion::BelowSize, 3).unwrap();
        assert!(report.passes <= 3);
        assert!(report.remaining_small_groups <= report.small_groups);
        assert!(grid.label_count() < 16);
    }
}
