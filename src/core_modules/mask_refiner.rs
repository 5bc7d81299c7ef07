// THEORY:
// Mask refinement snaps a rough selection to superpixel boundaries. The mask is
// any image whose non-black pixels mark "selected". For every label the mask
// touches, we ask: of this label's pixels plus the pixels of every label the
// similarity graph links it to, what fraction is inside the mask? If the fraction
// reaches `inclusive_threshold`, the whole union is painted into the output with
// its source colors. Everything else stays opaque black.
//
// Steps:
// 1.  Collect the masked points and the de-duplicated set of labels under them.
//     This set is fixed before any task starts, so no label is judged twice.
// 2.  Build the similarity graph on the worker pool.
// 3.  Decide each masked label on the worker pool. A task only reads the frozen
//     grid, graph and mask, and returns the points it wants painted.
// 4.  Paint the returned points serially onto a blank canvas.

use crate::core_modules::geometry::Point;
use crate::core_modules::label_graph::LabelGraph;
use crate::core_modules::label_grid::{Label, LabelGrid};
use crate::core_modules::utils::image_helper::{blank_image, PixelSink, PixelSource};
use crate::error::{Result, VisionError};
use crate::parallel_pipeline::run_label_tasks;
use image::RgbaImage;
use log::info;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

/// Points whose mask pixel is anything other than opaque black.
pub fn masked_pixels<M: PixelSource + ?Sized>(mask: &M) -> HashSet<Point> {
    let mut points = HashSet::new();
    for y in 0..mask.height() {
        for x in 0..mask.width() {
            if !mask.get_pixel(x, y).is_opaque_black() {
                points.insert(Point::new(x, y));
            }
        }
    }
    points
}

/// Frozen inputs shared by every inclusion task.
struct RefineContext {
    graph: LabelGraph,
    points: BTreeMap<Label, Vec<Point>>,
    mask: HashSet<Point>,
    inclusive_threshold: f64,
}

impl RefineContext {
    /// The points to paint for `label`, or nothing if it falls short.
    fn decide(&self, label: Label) -> Result<Vec<Point>> {
        let mut union: BTreeSet<Point> = BTreeSet::new();
        for member in std::iter::once(label).chain(self.graph.neighbors(label)?.iter().copied()) {
            let points = self
                .points
                .get(&member)
                .ok_or(VisionError::LabelNotFound(member))?;
            union.extend(points.iter().copied());
        }
        if union.is_empty() {
            return Ok(Vec::new());
        }

        let inside = union.iter().filter(|point| self.mask.contains(point)).count();
        let fraction = inside as f64 / union.len() as f64;
        if fraction >= self.inclusive_threshold {
            Ok(union.into_iter().collect())
        } else {
            Ok(Vec::new())
        }
    }
}

fn check_dimensions<S: PixelSource + ?Sized>(grid: &LabelGrid, image: &S) -> Result<()> {
    let found = (image.width(), image.height());
    if found != grid.dimensions() {
        return Err(VisionError::dimension_mismatch(grid.dimensions(), found));
    }
    Ok(())
}

/// Paints the source colors of every label the mask selects strongly enough.
pub async fn create_refined_image<S, M>(
    grid: &LabelGrid,
    source: &S,
    mask: &M,
    inclusive_threshold: f64,
    similarity_threshold: f64,
) -> Result<RgbaImage>
where
    S: PixelSource + ?Sized,
    M: PixelSource + ?Sized,
{
    check_dimensions(grid, source)?;
    check_dimensions(grid, mask)?;

    let mask = masked_pixels(mask);
    let masked_labels: BTreeSet<Label> = mask.iter().filter_map(|&point| grid.label_at(point)).collect();

    let graph = LabelGraph::build_parallel(grid, similarity_threshold, true).await?;
    let context = Arc::new(RefineContext {
        graph,
        points: grid.label_points(),
        mask,
        inclusive_threshold,
    });

    let decisions = run_label_tasks(masked_labels.iter().copied(), context, |label, context| {
        context.decide(label)
    })
    .await?;

    let mut out = blank_image(grid.width(), grid.height());
    let mut included = 0;
    for (_, points) in &decisions {
        if !points.is_empty() {
            included += 1;
        }
        for point in points {
            let color = source.get_pixel(point.x, point.y);
            out.set_pixel(point.x, point.y, color.to_argb());
        }
    }

    info!(
        "refined mask: {} labels under the mask, {included} included",
        masked_labels.len()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::Pixel;
    use crate::core_modules::segmenter::label_pixels;
    use image::Rgba;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn halves() -> RgbaImage {
        RgbaImage::from_fn(4, 4, |x, _| {
            if x < 2 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        })
    }

    fn mask_columns(columns: &[u32]) -> RgbaImage {
        let mut mask = blank_image(4, 4);
        for &x in columns {
            for y in 0..4 {
                mask.put_pixel(x, y, WHITE);
            }
        }
        mask
    }

    #[test]
    fn only_non_black_pixels_are_masked() {
        let mut mask = blank_image(3, 2);
        mask.put_pixel(1, 1, WHITE);
        mask.put_pixel(2, 0, Rgba([0, 0, 0, 0]));
        let points = masked_pixels(&mask);
        assert_eq!(points.len(), 2);
        assert!(points.contains(&Point::new(1, 1)));
        assert!(points.contains(&Point::new(2, 0)));
    }

    #[tokio::test]
    async fn half_covered_label_is_included_at_one_half() {
        let image = halves();
        let grid = label_pixels(&image, 0.9).unwrap();
        let mask = mask_columns(&[0]);

        let refined = create_refined_image(&grid, &image, &mask, 0.5, 0.99).await.unwrap();
        for y in 0..4 {
            for x in 0..4 {
                let expected = if x < 2 { Pixel::rgb(255, 0, 0) } else { Pixel::rgb(0, 0, 0) };
                assert_eq!(PixelSource::get_pixel(&refined, x, y), expected);
            }
        }
    }

    #[tokio::test]
    async fn half_covered_label_is_excluded_above_one_half() {
        let image = halves();
        let grid = label_pixels(&image, 0.9).unwrap();
        let mask = mask_columns(&[0]);

        let refined = create_refined_image(&grid, &image, &mask, 0.51, 0.99).await.unwrap();
        assert_eq!(refined, blank_image(4, 4));
    }

    #[tokio::test]
    async fn similar_labels_are_painted_with_the_selection() {
        // Red, blue, red: masking the first red pulls in the second.
        let image = RgbaImage::from_fn(3, 2, |x, _| {
            if x == 1 {
                Rgba([0, 0, 255, 255])
            } else {
                Rgba([255, 0, 0, 255])
            }
        });
        let grid = label_pixels(&image, 0.9).unwrap();
        let mut mask = blank_image(3, 2);
        mask.put_pixel(0, 0, WHITE);
        mask.put_pixel(0, 1, WHITE);

        let refined = create_refined_image(&grid, &image, &mask, 0.5, 0.99).await.unwrap();
        assert_eq!(PixelSource::get_pixel(&refined, 2, 1), Pixel::rgb(255, 0, 0));
        assert_eq!(PixelSource::get_pixel(&refined, 1, 0), Pixel::rgb(0, 0, 0));
    }

    #[tokio::test]
    async fn mismatched_mask_is_rejected() {
        let image = halves();
        let grid = label_pixels(&image, 0.9).unwrap();
        let mask = blank_image(2, 2);
        let result = create_refined_image(&grid, &image, &mask, 0.5, 0.99).await;
        assert!(matches!(result, Err(VisionError::DimensionMismatch { .. })));
    }

    #[tokio::test]
    async fn empty_mask_gives_a_blank_image() {
        let image = halves();
        let grid = label_pixels(&image, 0.9).unwrap();
        let refined = create_refined_image(&grid, &image, &blank_image(4, 4), 0.0, 0.99)
            .await
            .unwrap();
        assert_eq!(refined, blank_image(4, 4));
    }
}
