use glam::{Vec3A, Vec4};

use super::etc::BlockMode;
use super::search::{ColorModes, ColorSearch};
use super::EncodingState;
use crate::color::to_vec3;
use crate::ErrorMetric;

/// Alpha below this value is encoded as transparent.
pub(crate) const PUNCH_THROUGH_THRESHOLD: f32 = 0.5;

/// ETC2 RGB blocks with 1-bit punch-through alpha.
///
/// Blocks with transparent pixels clear the opaque flag, which rules out
/// planar blocks and reserves one selector for transparency.
#[derive(Debug, Clone)]
pub(crate) struct Rgb8A1State {
    search: ColorSearch,
    /// Error of transparent pixels and of the alpha plane. Both are fixed by
    /// the source and don't depend on the block.
    fixed_error: f32,
}

impl Rgb8A1State {
    pub fn new(pixels: &[Vec4; 16], mask: u16, metric: ErrorMetric) -> Self {
        let prepared = pixels.map(|p| metric.prepare(p));

        let mut transparent = 0;
        let mut fixed_error = 0.0;
        for (i, p) in prepared.iter().enumerate() {
            if mask & (1 << i) == 0 {
                continue;
            }
            if p.w < PUNCH_THROUGH_THRESHOLD {
                transparent |= 1 << i;
                fixed_error += metric.color_error(*p, Vec3A::ZERO) + p.w * p.w;
            } else {
                fixed_error += (1.0 - p.w) * (1.0 - p.w);
            }
        }

        let modes = if transparent != 0 {
            ColorModes::PUNCH_THROUGH_TRANSPARENT
        } else {
            ColorModes::PUNCH_THROUGH_OPAQUE
        };
        Self {
            search: ColorSearch::new(metric, modes, prepared, mask & !transparent, transparent),
            fixed_error,
        }
    }
}

impl EncodingState for Rgb8A1State {
    fn iterate(&mut self, effort: f32) {
        self.search.iterate(effort);
    }
    fn is_done(&self) -> bool {
        self.search.is_done()
    }
    fn error(&self) -> f32 {
        self.search.error() + self.fixed_error
    }
    fn decoded(&self) -> [Vec4; 16] {
        self.search
            .decoded()
            .map(|c| c.map_or(Vec4::ZERO, |c| to_vec3(c).extend(1.0)))
    }
    fn mode(&self) -> BlockMode {
        self.search.block().mode()
    }
    fn write_bits(&self, out: &mut [u8]) {
        let bits = self.search.block().pack(true, self.search.opaque());
        out[..8].copy_from_slice(&bits.to_be_bytes());
    }
}
