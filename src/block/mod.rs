//! Per-tile encoding states.
//!
//! Each packed bit layout has its own state type. All of them share the
//! [`EncodingState`] interface and are stored in the closed [`BlockEncoding`]
//! enum, so tiles of one image are a single contiguous array.

use glam::Vec4;

use crate::{BitFormat, ErrorMetric, Format};

pub(crate) mod eac;
pub(crate) mod etc;
mod r11;
mod rgb8;
mod rgb8a1;
mod rgba8;
mod search;

pub use etc::BlockMode;
pub(crate) use r11::*;
pub(crate) use rgb8::*;
pub(crate) use rgb8a1::*;
pub(crate) use rgba8::*;

/// The effort below which a search stops after `completed` of `total` steps.
///
/// Spreads the steps of a search evenly over `0..=100`, so effort 0 performs a
/// single step and effort 100 performs all of them.
pub(crate) fn effort_cutoff(completed: usize, total: usize) -> f32 {
    100.0 * completed as f32 / total as f32
}

/// The capabilities every per-tile encoding state provides.
pub(crate) trait EncodingState {
    /// Performs one bounded unit of additional search.
    ///
    /// The current solution is only replaced by strictly better ones, so the
    /// error never increases. Does nothing once the state is done.
    fn iterate(&mut self, effort: f32);

    /// Whether further iterations cannot improve the block.
    fn is_done(&self) -> bool;
    /// The error of the current solution under the image's error metric.
    fn error(&self) -> f32;
    /// The decoded pixels of the current solution in vertical scan order.
    fn decoded(&self) -> [Vec4; 16];
    fn mode(&self) -> BlockMode;

    /// Writes the packed block. `out` must have the size of one block of the
    /// state's bit format.
    fn write_bits(&self, out: &mut [u8]);
}

#[derive(Debug, Clone)]
pub(crate) enum BlockEncoding {
    Rgb8(Rgb8State),
    Rgba8(Rgba8State),
    R11(R11State),
    Rg11(Rg11State),
    Rgb8A1(Rgb8A1State),
}

impl BlockEncoding {
    /// Creates the state matching the format and seeds it with a cheap,
    /// decodable solution.
    ///
    /// `pixels` are the raw source pixels in vertical scan order. Pixels in
    /// `border` are outside the image and ignored.
    pub fn init_from_source(
        pixels: &[Vec4; 16],
        border: u16,
        format: Format,
        metric: ErrorMetric,
    ) -> Option<Self> {
        let mask = !border;
        Some(match format.bit_format()? {
            BitFormat::Rgb8 => {
                BlockEncoding::Rgb8(Rgb8State::new(pixels, mask, metric, format.is_etc1()))
            }
            BitFormat::Rgba8 => BlockEncoding::Rgba8(Rgba8State::new(pixels, mask, metric)),
            BitFormat::R11 => BlockEncoding::R11(R11State::new(pixels, mask, format.is_signed())),
            BitFormat::Rg11 => {
                BlockEncoding::Rg11(Rg11State::new(pixels, mask, format.is_signed()))
            }
            BitFormat::Rgb8A1 => BlockEncoding::Rgb8A1(Rgb8A1State::new(pixels, mask, metric)),
        })
    }

    pub fn bytes_per_block(&self) -> usize {
        match self {
            BlockEncoding::Rgb8(_) => BitFormat::Rgb8,
            BlockEncoding::Rgba8(_) => BitFormat::Rgba8,
            BlockEncoding::R11(_) => BitFormat::R11,
            BlockEncoding::Rg11(_) => BitFormat::Rg11,
            BlockEncoding::Rgb8A1(_) => BitFormat::Rgb8A1,
        }
        .bytes_per_block()
    }

    fn state(&self) -> &dyn EncodingState {
        match self {
            BlockEncoding::Rgb8(state) => state,
            BlockEncoding::Rgba8(state) => state,
            BlockEncoding::R11(state) => state,
            BlockEncoding::Rg11(state) => state,
            BlockEncoding::Rgb8A1(state) => state,
        }
    }
    fn state_mut(&mut self) -> &mut dyn EncodingState {
        match self {
            BlockEncoding::Rgb8(state) => state,
            BlockEncoding::Rgba8(state) => state,
            BlockEncoding::R11(state) => state,
            BlockEncoding::Rg11(state) => state,
            BlockEncoding::Rgb8A1(state) => state,
        }
    }
}

impl EncodingState for BlockEncoding {
    fn iterate(&mut self, effort: f32) {
        self.state_mut().iterate(effort)
    }
    fn is_done(&self) -> bool {
        self.state().is_done()
    }
    fn error(&self) -> f32 {
        self.state().error()
    }
    fn decoded(&self) -> [Vec4; 16] {
        self.state().decoded()
    }
    fn mode(&self) -> BlockMode {
        self.state().mode()
    }
    fn write_bits(&self, out: &mut [u8]) {
        self.state().write_bits(out)
    }
}

/// Replaces NaN with 0 and clamps to `0..=1`.
pub(crate) fn sanitize(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
