// The engine only sees images through `PixelSource` and `PixelSink`. The
// `image` crate types implement both; decoding and encoding stay in this file.

use crate::core_modules::label_grid::LabelGrid;
use crate::core_modules::pixel::pixel::{Argb, Pixel};
use crate::error::Result;
use image::{ImageEncoder, Rgba, RgbaImage};
use std::path::Path;

/// Read access to a decoded width × height grid of ARGB pixels.
pub trait PixelSource {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn get_pixel(&self, x: u32, y: u32) -> Pixel;
}

/// Write access to an image the engine paints into.
pub trait PixelSink: PixelSource {
    fn set_pixel(&mut self, x: u32, y: u32, argb: Argb);
}

impl PixelSource for RgbaImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn get_pixel(&self, x: u32, y: u32) -> Pixel {
        let Rgba([red, green, blue, alpha]) = *image::ImageBuffer::get_pixel(self, x, y);
        Pixel::new(alpha as i32, red as i32, green as i32, blue as i32)
    }
}

impl PixelSink for RgbaImage {
    fn set_pixel(&mut self, x: u32, y: u32, argb: Argb) {
        let pixel = Pixel::from_argb(argb);
        self.put_pixel(
            x,
            y,
            Rgba([
                pixel.red as u8,
                pixel.green as u8,
                pixel.blue as u8,
                pixel.alpha as u8,
            ]),
        );
    }
}

/// A new image filled with opaque black, the "empty" color of masks and
/// refined output.
pub fn blank_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]))
}

pub fn load_image(path: impl AsRef<Path>) -> Result<RgbaImage> {
    Ok(image::open(path)?.to_rgba8())
}

pub fn save_png(path: impl AsRef<Path>, image: &RgbaImage) -> Result<()> {
    let output = std::fs::File::create(path)?;
    let encoder = image::codecs::png::PngEncoder::new(output);
    encoder.write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(())
}

/// Paints every pixel with its label's average color.
pub fn render_average_image(grid: &LabelGrid) -> RgbaImage {
    let colors = grid.average_colors();
    let mut out = blank_image(grid.width(), grid.height());
    for cell in grid.iter() {
        if let Some(color) = colors.get(&cell.label) {
            out.set_pixel(cell.point.x, cell.point.y, color.to_argb());
        }
    }
    out
}
