use glam::Vec4;

use crate::block::{BlockEncoding, BlockMode, EncodingState};
use crate::{ErrorMetric, Format};

/// The alpha classification of the pixels of a tile.
///
/// Pixels outside the image are not considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlphaMix {
    /// Every alpha value is exactly 1.
    Opaque,
    /// Every alpha value is 0 or NaN.
    Transparent,
    /// Anything else.
    Translucent,
}

/// One 4x4 block of the image together with the state of its encoding.
#[derive(Debug, Clone)]
pub struct Tile {
    x: u32,
    y: u32,
    /// Source pixels in vertical scan order (`index = x * 4 + y`). Pixels
    /// outside the image are NaN.
    pixels: [Vec4; 16],
    border: u16,
    alpha_mix: AlphaMix,
    punch_through: bool,
    encoding: BlockEncoding,
}

impl Tile {
    /// Returns `None` if the format is unknown.
    pub(crate) fn new(
        (x, y): (u32, u32),
        pixels: [Vec4; 16],
        border: u16,
        format: Format,
        metric: ErrorMetric,
    ) -> Option<Self> {
        let encoding = BlockEncoding::init_from_source(&pixels, border, format, metric)?;

        let mut opaque = true;
        let mut transparent = true;
        let mut punch_through = false;
        for (i, p) in pixels.iter().enumerate() {
            if border & (1 << i) != 0 {
                continue;
            }
            let a = p.w;
            opaque &= a == 1.0;
            transparent &= a == 0.0 || a.is_nan();
            punch_through |= a.is_nan() || a < crate::block::PUNCH_THROUGH_THRESHOLD;
        }
        let alpha_mix = if opaque {
            AlphaMix::Opaque
        } else if transparent {
            AlphaMix::Transparent
        } else {
            AlphaMix::Translucent
        };

        Some(Self {
            x,
            y,
            pixels,
            border,
            alpha_mix,
            punch_through: punch_through && format.bit_format() == Some(crate::BitFormat::Rgb8A1),
            encoding,
        })
    }

    /// The position of the tile in the tile grid.
    pub fn position(&self) -> (u32, u32) {
        (self.x, self.y)
    }
    pub fn alpha_mix(&self) -> AlphaMix {
        self.alpha_mix
    }
    /// Whether some pixels of the tile lie outside the image.
    pub fn has_border_pixels(&self) -> bool {
        self.border != 0
    }
    /// Whether some pixels will be encoded as transparent by the 1-bit alpha
    /// formats. Always `false` for all other formats.
    pub fn has_punch_through_pixels(&self) -> bool {
        self.punch_through
    }
    /// The source pixels in vertical scan order. Pixels outside the image are
    /// NaN.
    pub fn source_pixels(&self) -> [[f32; 4]; 16] {
        self.pixels.map(|p| p.to_array())
    }

    pub fn error(&self) -> f32 {
        self.encoding.error()
    }
    /// Whether further search cannot improve the tile at the current effort.
    pub fn is_done(&self) -> bool {
        self.encoding.is_done()
    }
    pub fn mode(&self) -> BlockMode {
        self.encoding.mode()
    }
    /// The RGB values of the current solution in vertical scan order.
    pub fn decoded_colors(&self) -> [[f32; 3]; 16] {
        self.encoding.decoded().map(|p| p.truncate().to_array())
    }
    /// The alpha values of the current solution in vertical scan order.
    pub fn decoded_alphas(&self) -> [f32; 16] {
        self.encoding.decoded().map(|p| p.w)
    }
    /// The packed block of the current solution.
    pub fn encoding_bits(&self) -> Vec<u8> {
        let mut bits = vec![0; self.encoding.bytes_per_block()];
        self.encoding.write_bits(&mut bits);
        bits
    }

    pub(crate) fn iterate(&mut self, effort: f32) {
        self.encoding.iterate(effort);
    }
    pub(crate) fn write_bits(&self, out: &mut [u8]) {
        self.encoding.write_bits(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(alphas: [f32; 16], border: u16, format: Format) -> Tile {
        let pixels = alphas.map(|a| Vec4::new(0.5, 0.5, 0.5, a));
        Tile::new((0, 0), pixels, border, format, ErrorMetric::Rgba).unwrap()
    }

    #[test]
    fn alpha_classification() {
        assert_eq!(tile([1.0; 16], 0, Format::RGBA8).alpha_mix(), AlphaMix::Opaque);
        assert_eq!(tile([0.0; 16], 0, Format::RGBA8).alpha_mix(), AlphaMix::Transparent);
        assert_eq!(tile([f32::NAN; 16], 0, Format::RGBA8).alpha_mix(), AlphaMix::Transparent);

        let mut mixed = [1.0; 16];
        mixed[5] = 0.0;
        assert_eq!(tile(mixed, 0, Format::RGBA8).alpha_mix(), AlphaMix::Translucent);
        // the odd pixel is outside the image
        assert_eq!(tile(mixed, 1 << 5, Format::RGBA8).alpha_mix(), AlphaMix::Opaque);
    }

    #[test]
    fn punch_through_only_for_one_bit_alpha() {
        let mut alphas = [1.0; 16];
        alphas[3] = 0.25;
        assert!(tile(alphas, 0, Format::RGB8A1).has_punch_through_pixels());
        assert!(!tile(alphas, 0, Format::RGBA8).has_punch_through_pixels());
        assert!(!tile([0.75; 16], 0, Format::SRGB8A1).has_punch_through_pixels());
    }

    #[test]
    fn bits_match_block_size() {
        for &format in Format::ALL {
            let tile = tile([1.0; 16], 0xCCCC, format);
            let expected = format.bit_format().unwrap().bytes_per_block();
            assert_eq!(tile.encoding_bits().len(), expected);
            assert!(tile.has_border_pixels());
        }
    }
}
