use glam::Vec4;

use super::eac::{EacKind, EacSearch};
use super::etc::BlockMode;
use super::search::{ColorModes, ColorSearch};
use super::EncodingState;
use crate::color::to_vec3;
use crate::ErrorMetric;

/// ETC2 RGB blocks with a separate EAC alpha block.
///
/// The color block is searched against the source alpha (which weights the
/// color error for some metrics), so both planes can be searched
/// independently.
#[derive(Debug, Clone)]
pub(crate) struct Rgba8State {
    color: ColorSearch,
    alpha: EacSearch,
}

impl Rgba8State {
    pub fn new(pixels: &[Vec4; 16], mask: u16, metric: ErrorMetric) -> Self {
        let prepared = pixels.map(|p| metric.prepare(p));
        Self {
            color: ColorSearch::new(metric, ColorModes::ETC2, prepared, mask, 0),
            alpha: EacSearch::new(EacKind::Alpha, prepared.map(|p| p.w), mask),
        }
    }
}

impl EncodingState for Rgba8State {
    fn iterate(&mut self, effort: f32) {
        self.color.iterate(effort);
        self.alpha.iterate(effort);
    }
    fn is_done(&self) -> bool {
        self.color.is_done() && self.alpha.is_done()
    }
    fn error(&self) -> f32 {
        self.color.error() + self.alpha.error()
    }
    fn decoded(&self) -> [Vec4; 16] {
        let alpha = self.alpha.decoded();
        let color = self.color.decoded();
        std::array::from_fn(|i| {
            color[i]
                .map_or(glam::Vec3A::ZERO, to_vec3)
                .extend(alpha[i])
        })
    }
    fn mode(&self) -> BlockMode {
        self.color.block().mode()
    }
    fn write_bits(&self, out: &mut [u8]) {
        let alpha = self.alpha.block().pack(EacKind::Alpha);
        let color = self.color.block().pack(false, true);
        out[..8].copy_from_slice(&alpha.to_be_bytes());
        out[8..16].copy_from_slice(&color.to_be_bytes());
    }
}
