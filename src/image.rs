use glam::Vec4;

use crate::{EncodingStatus, ErrorMetric, Tile};

/// Aggregate statistics over all pixels of an image.
///
/// Only pixels inside the image are counted. Padding pixels of partial tiles
/// never contribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PixelStats {
    pub pixels: usize,
    pub opaque: usize,
    pub transparent: usize,
    pub translucent: usize,
    pub some_blue: bool,
    pub some_green: bool,
    pub out_of_range: bool,
}

impl PixelStats {
    pub fn add(&mut self, pixel: Vec4) {
        self.pixels += 1;

        let a = pixel.w;
        if a == 1.0 {
            self.opaque += 1;
        } else if a == 0.0 || a.is_nan() {
            self.transparent += 1;
        } else {
            self.translucent += 1;
        }

        self.some_blue |= pixel.z > 0.0;
        self.some_green |= pixel.y > 0.0;
        // NaN compares false and is not out of range
        self.out_of_range |= pixel.cmplt(Vec4::ZERO).any() || pixel.cmpgt(Vec4::ONE).any();
    }

    /// All content warnings these statistics raise, regardless of format.
    pub fn warnings(&self) -> EncodingStatus {
        let mut status = EncodingStatus::empty();
        status.set(
            EncodingStatus::WARNING_ALL_OPAQUE_PIXELS,
            self.opaque == self.pixels,
        );
        status.set(
            EncodingStatus::WARNING_SOME_NON_OPAQUE_PIXELS,
            self.opaque < self.pixels,
        );
        status.set(
            EncodingStatus::WARNING_ALL_TRANSPARENT_PIXELS,
            self.transparent == self.pixels,
        );
        status.set(
            EncodingStatus::WARNING_SOME_TRANSLUCENT_PIXELS,
            self.translucent > 0,
        );
        status.set(
            EncodingStatus::WARNING_SOME_BLUE_VALUES_ARE_NOT_ZERO,
            self.some_blue,
        );
        status.set(
            EncodingStatus::WARNING_SOME_GREEN_VALUES_ARE_NOT_ZERO,
            self.some_green,
        );
        status.set(EncodingStatus::WARNING_SOME_RGBA_NOT_0_TO_1, self.out_of_range);
        status
    }
}

/// A source image split into tiles, ready to be encoded.
///
/// Creating an image validates the parameters, creates the tiles with a cheap
/// initial encoding and computes the content warnings. The actual search
/// happens in [`Image::encode`].
#[derive(Debug, Clone)]
pub struct Image<'a> {
    source: &'a [[f32; 4]],
    width: u32,
    height: u32,
    format: crate::Format,
    metric: ErrorMetric,
    stats: PixelStats,
    pub(crate) tiles: Vec<Tile>,
}

impl<'a> Image<'a> {
    /// Validates the parameters and splits the source into tiles.
    ///
    /// `pixels` are unpremultiplied RGBA values in row-major order. Extra
    /// pixels past `width * height` are ignored.
    ///
    /// On failure, the returned status contains every error bit that applies.
    pub fn new(
        pixels: &'a [[f32; 4]],
        width: u32,
        height: u32,
        format: crate::Format,
        metric: ErrorMetric,
    ) -> Result<Self, EncodingStatus> {
        let mut errors = EncodingStatus::empty();
        if !metric.is_known() {
            errors |= EncodingStatus::ERROR_UNKNOWN_ERROR_METRIC;
        }
        if format.bit_format().is_none() {
            errors |= EncodingStatus::ERROR_UNKNOWN_FORMAT;
        }
        if width == 0 || height == 0 {
            errors |= EncodingStatus::ERROR_ZERO_WIDTH_OR_HEIGHT;
        }
        let pixel_count = (width as usize).checked_mul(height as usize);
        if pixel_count.map_or(true, |count| pixels.len() < count) {
            errors |= EncodingStatus::ERROR_SOURCE_SIZE_MISMATCH;
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let grid_width = width.div_ceil(4);
        let grid_height = height.div_ceil(4);

        let mut stats = PixelStats::default();
        let mut tiles = Vec::with_capacity(grid_width as usize * grid_height as usize);
        for ty in 0..grid_height {
            for tx in 0..grid_width {
                let mut block = [Vec4::NAN; 16];
                let mut border = 0_u16;
                for (i, pixel) in block.iter_mut().enumerate() {
                    let x = tx * 4 + (i / 4) as u32;
                    let y = ty * 4 + (i % 4) as u32;
                    if x < width && y < height {
                        *pixel = Vec4::from_array(pixels[y as usize * width as usize + x as usize]);
                        stats.add(*pixel);
                    } else {
                        border |= 1 << i;
                    }
                }

                let tile = Tile::new((tx, ty), block, border, format, metric)
                    .ok_or(EncodingStatus::ERROR_UNKNOWN_FORMAT)?;
                tiles.push(tile);
            }
        }

        Ok(Self {
            source: &pixels[..width as usize * height as usize],
            width,
            height,
            format,
            metric,
            stats,
            tiles,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn height(&self) -> u32 {
        self.height
    }
    /// The size of the tile grid. Partial tiles at the right and bottom edge
    /// are included.
    pub fn grid_size(&self) -> (u32, u32) {
        (self.width.div_ceil(4), self.height.div_ceil(4))
    }
    pub fn format(&self) -> crate::Format {
        self.format
    }
    pub fn error_metric(&self) -> ErrorMetric {
        self.metric
    }
    /// The source pixels in row-major order.
    pub fn source(&self) -> &'a [[f32; 4]] {
        self.source
    }

    /// The tiles of the image in row-major order.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// The total error of the current solution, the sum of all tile errors.
    pub fn error(&self) -> f32 {
        self.tiles.iter().map(Tile::error).sum()
    }

    /// The content warnings of this image that are relevant for its format.
    pub fn warnings(&self) -> EncodingStatus {
        self.stats.warnings() & self.format.tracked_warnings()
    }
}
