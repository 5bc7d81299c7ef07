// THEORY:
// A refined image often has pinholes: pixels the mask refinement left empty
// although their source color matches the painted pixels around them. Hole
// filling grows the painted content outward into such pixels.
//
// Every painted pixel next to an empty one seeds a stack. Popping a pixel copies
// the source color into each empty 8-neighbor whose source color is at least
// `similarity_threshold` cosine-similar to the popped pixel's color; a newly
// filled pixel with empty neighbors of its own is pushed in turn. The fill stops
// when the stack drains. "Empty" means opaque black, the canvas color of
// `blank_image`.

use crate::core_modules::geometry::{neighbor_locations, Point};
use crate::core_modules::pixel::pixel::Pixel;
use crate::core_modules::utils::image_helper::{PixelSink, PixelSource};
use crate::error::{Result, VisionError};
use image::RgbaImage;
use log::debug;

fn empty_neighbors(content: &RgbaImage, x: u32, y: u32) -> Vec<Point> {
    neighbor_locations(x, y, 1, content.width(), content.height())
        .into_iter()
        .filter(|point| PixelSource::get_pixel(content, point.x, point.y).is_opaque_black())
        .collect()
}

/// Grows `content` into empty pixels whose `source` color matches. Returns the
/// number of pixels filled.
pub fn fill_holes<S: PixelSource + ?Sized>(
    source: &S,
    content: &mut RgbaImage,
    similarity_threshold: f64,
) -> Result<usize> {
    let found = (source.width(), source.height());
    if found != content.dimensions() {
        return Err(VisionError::dimension_mismatch(content.dimensions(), found));
    }

    let mut stack: Vec<(Pixel, Point)> = Vec::new();
    for y in 0..content.height() {
        for x in 0..content.width() {
            let pixel = PixelSource::get_pixel(&*content, x, y);
            if !pixel.is_opaque_black() && !empty_neighbors(content, x, y).is_empty() {
                stack.push((pixel, Point::new(x, y)));
            }
        }
    }

    let mut filled = 0;
    while let Some((pixel, point)) = stack.pop() {
        let vector = pixel.to_hxhysl();
        for neighbor in empty_neighbors(content, point.x, point.y) {
            let candidate = source.get_pixel(neighbor.x, neighbor.y);
            // Painting opaque black would leave the pixel empty.
            if candidate.is_opaque_black()
                || vector.cosine_similarity(&candidate.to_hxhysl())? < similarity_threshold
            {
                continue;
            }
            content.set_pixel(neighbor.x, neighbor.y, candidate.to_argb());
            filled += 1;
            if !empty_neighbors(content, neighbor.x, neighbor.y).is_empty() {
                stack.push((candidate, neighbor));
            }
        }
    }

    debug!("filled {filled} hole pixels at threshold {similarity_threshold}");
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::utils::image_helper::blank_image;
    use image::Rgba;

    #[test]
    fn fills_matching_pixels_only() {
        // Red left three columns, blue right column.
        let source = RgbaImage::from_fn(4, 3, |x, _| {
            if x < 3 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        let mut content = blank_image(4, 3);
        content.put_pixel(0, 0, Rgba([255, 0, 0, 255]));

        let filled = fill_holes(&source, &mut content, 0.99).unwrap();
        assert_eq!(filled, 8);
        for y in 0..3 {
            assert_eq!(content.get_pixel(2, y), &Rgba([255, 0, 0, 255]));
            assert_eq!(content.get_pixel(3, y), &Rgba([0, 0, 0, 255]));
        }
    }

    #[test]
    fn empty_content_stays_empty() {
        let source = RgbaImage::from_pixel(3, 3, Rgba([40, 200, 90, 255]));
        let mut content = blank_image(3, 3);
        assert_eq!(fill_holes(&source, &mut content, 0.5).unwrap(), 0);
        assert_eq!(content, blank_image(3, 3));
    }

    #[test]
    fn sizes_must_match() {
        let source = RgbaImage::from_pixel(3, 3, Rgba([40, 200, 90, 255]));
        let mut content = blank_image(2, 3);
        assert!(matches!(
            fill_holes(&source, &mut content, 0.5),
            Err(VisionError::DimensionMismatch { .. })
        ));
    }
}
