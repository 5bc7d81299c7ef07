// THEORY (Color Model):
// The `Pixel` module is the most fundamental unit of the segmentation engine. It
// is a "dumb" data container for a single ARGB pixel plus the conversions that
// put it into the perceptual space every comparison in the engine happens in.
//
// What lives here:
// - Raw channels (alpha, red, green, blue). Channels are conceptually 0..255 but
//   are not clamped on construction.
// - Packing to and from a 32-bit ARGB word (alpha in the top byte).
// - HSL conversion and its inverse.
// - HxHySL conversion and its inverse. Hue is a circular coordinate (0 and 1 are
//   the same color), so it is split into a (sin, cos) pair before it is compared
//   with anything. Cosine similarity between two HxHySL vectors then behaves
//   across the red wrap-around.
//
// Conventions:
// - HSL works on alpha-premultiplied channels, so a fully transparent pixel is
//   black.
// - Hue ties resolve red, then green, then blue.
// - Saturation 0 leaves hue undefined; it is fixed at 0.
// - Reconstructed pixels are always opaque.

pub mod pixel {
    use crate::core_modules::vector::VectorN;
    use std::f64::consts::PI;

    pub type Channel = i32;
    pub type Argb = u32;
    pub type Hue = f64;
    pub type Saturation = f64;
    pub type Lightness = f64;

    pub const OPAQUE: Channel = 255;

    /// A "dumb" data container representing a single ARGB pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Pixel {
        pub alpha: Channel,
        pub red: Channel,
        pub green: Channel,
        pub blue: Channel,
    }

    impl Pixel {
        pub fn new(alpha: Channel, red: Channel, green: Channel, blue: Channel) -> Self {
            Pixel {
                alpha,
                red,
                green,
                blue,
            }
        }

        /// An opaque pixel.
        pub fn rgb(red: Channel, green: Channel, blue: Channel) -> Self {
            Self::new(OPAQUE, red, green, blue)
        }

        pub fn from_argb(color: Argb) -> Self {
            Pixel {
                alpha: (0xFF & (color >> 24)) as Channel,
                red: (0xFF & (color >> 16)) as Channel,
                green: (0xFF & (color >> 8)) as Channel,
                blue: (0xFF & color) as Channel,
            }
        }

        /// Packs the low byte of each channel into an ARGB word.
        pub fn to_argb(&self) -> Argb {
            ((self.alpha as Argb & 0xFF) << 24)
                | ((self.red as Argb & 0xFF) << 16)
                | ((self.green as Argb & 0xFF) << 8)
                | (self.blue as Argb & 0xFF)
        }

        /// (h, s, l), each in [0, 1].
        pub fn to_hsl(&self) -> (Hue, Saturation, Lightness) {
            let alpha = self.alpha as f64 / 255.0;
            let red = (self.red as f64 * alpha) / 255.0;
            let green = (self.green as f64 * alpha) / 255.0;
            let blue = (self.blue as f64 * alpha) / 255.0;

            let max = red.max(green.max(blue));
            let min = red.min(green.min(blue));
            let lightness = (max + min) / 2.0;

            if max == min {
                return (0.0, 0.0, lightness);
            }

            let d = max - min;
            let saturation = if lightness > 0.5 {
                d / (2.0 - max - min)
            } else {
                d / (max + min)
            };

            let hue = if red == max {
                let offset = if green < blue { 6.0 } else { 0.0 };
                (green - blue) / d + offset
            } else if green == max {
                (blue - red) / d + 2.0
            } else {
                (red - green) / d + 4.0
            };

            (hue / 6.0, saturation, lightness)
        }

        /// The (hx, hy, s, l) perceptual vector.
        pub fn to_hxhysl(&self) -> VectorN {
            let (hue, saturation, lightness) = self.to_hsl();
            let radians = hue * 2.0 * PI;
            VectorN::new4(radians.sin(), radians.cos(), saturation, lightness)
        }

        pub fn from_hsl(hue: Hue, saturation: Saturation, lightness: Lightness) -> Self {
            let (r, g, b) = if saturation == 0.0 {
                (lightness, lightness, lightness)
            } else {
                let q = if lightness < 0.5 {
                    lightness * (1.0 + saturation)
                } else {
                    lightness + saturation - lightness * saturation
                };
                let p = 2.0 * lightness - q;
                (
                    hue_to_rgb(p, q, hue + 1.0 / 3.0),
                    hue_to_rgb(p, q, hue),
                    hue_to_rgb(p, q, hue - 1.0 / 3.0),
                )
            };

            Pixel::rgb(to_channel(r), to_channel(g), to_channel(b))
        }

        /// Inverse of `to_hxhysl`. Only the first four elements are read; a
        /// shorter vector reads missing elements as zero.
        pub fn from_hxhysl(vector: &VectorN) -> Self {
            let hx = vector.get(0).unwrap_or(0.0);
            let hy = vector.get(1).unwrap_or(0.0);
            let saturation = vector.get(2).unwrap_or(0.0);
            let lightness = vector.get(3).unwrap_or(0.0);

            let mut hue = hx.atan2(hy) / (2.0 * PI);
            if hue < 0.0 {
                hue += 1.0;
            }
            if hue >= 1.0 {
                hue -= 1.0;
            }
            Self::from_hsl(hue, saturation, lightness)
        }

        /// True for the opaque black that marks "empty" in masks and refined images.
        pub fn is_opaque_black(&self) -> bool {
            self.to_argb() == 0xFF00_0000
        }
    }

    fn hue_to_rgb(p: f64, q: f64, t: f64) -> f64 {
        let mut t = t;
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }

        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 1.0 / 2.0 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    }

    fn to_channel(value: f64) -> Channel {
        (value * 255.0).round().clamp(0.0, 255.0) as Channel
    }

    impl From<Argb> for Pixel {
        fn from(color: Argb) -> Self {
            Pixel::from_argb(color)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::pixel::*;

    fn assert_close(expected: &Pixel, actual: &Pixel) {
        for (e, a) in [
            (expected.alpha, actual.alpha),
            (expected.red, actual.red),
            (expected.green, actual.green),
            (expected.blue, actual.blue),
        ] {
            assert!((e - a).abs() <= 1, "expected {expected:?}, got {actual:?}");
        }
    }

    #[test]
    fn argb_round_trip() {
        let pixel = Pixel::new(255, 12, 34, 56);
        assert_eq!(pixel.to_argb(), 0xFF0C_2238);
        assert_eq!(Pixel::from_argb(pixel.to_argb()), pixel);
        assert_eq!(Pixel::from(0x8001_0203u32), Pixel::new(0x80, 1, 2, 3));
    }

    #[test]
    fn primaries_survive_hsl() {
        for pixel in [
            Pixel::rgb(255, 0, 0),
            Pixel::rgb(0, 255, 0),
            Pixel::rgb(0, 0, 255),
            Pixel::rgb(126, 126, 126),
        ] {
            let (h, s, l) = pixel.to_hsl();
            assert_eq!(Pixel::from_hsl(h, s, l), pixel);
        }
    }

    #[test]
    fn primaries_survive_hxhysl() {
        for pixel in [
            Pixel::rgb(255, 0, 0),
            Pixel::rgb(0, 255, 0),
            Pixel::rgb(0, 0, 255),
            Pixel::rgb(126, 126, 126),
        ] {
            assert_eq!(Pixel::from_hxhysl(&pixel.to_hxhysl()), pixel);
        }
    }

    #[test]
    fn opaque_colors_round_trip_within_one() {
        for red in (0..=255).step_by(17) {
            for green in (0..=255).step_by(51) {
                for blue in (0..=255).step_by(85) {
                    let pixel = Pixel::rgb(red, green, blue);
                    assert_close(&pixel, &Pixel::from_hxhysl(&pixel.to_hxhysl()));
                    let (h, s, l) = pixel.to_hsl();
                    assert_close(&pixel, &Pixel::from_hsl(h, s, l));
                }
            }
        }
    }

    #[test]
    fn hue_ties_prefer_red() {
        // Red and green share the max: the red branch gives hue 1/6 (yellow).
        let (h, _, _) = Pixel::rgb(255, 255, 0).to_hsl();
        assert!((h - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn gray_has_zero_hue_and_saturation() {
        let v = Pixel::rgb(40, 40, 40).to_hxhysl();
        assert_eq!(v[0], 0.0);
        assert_eq!(v[1], 1.0);
        assert_eq!(v[2], 0.0);
    }

    #[test]
    fn hue_is_split_into_a_unit_pair() {
        let v = Pixel::rgb(10, 200, 90).to_hxhysl();
        assert!((v[0] * v[0] + v[1] * v[1] - 1.0).abs() < 1e-12);
        assert!(v.magnitude() > 0.0);
    }

    #[test]
    fn opaque_black_detection() {
        assert!(Pixel::rgb(0, 0, 0).is_opaque_black());
        assert!(!Pixel::new(0, 0, 0, 0).is_opaque_black());
    }
}
