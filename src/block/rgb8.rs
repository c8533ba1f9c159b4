use glam::Vec4;

use super::etc::BlockMode;
use super::search::{ColorModes, ColorSearch};
use super::EncodingState;
use crate::color::to_vec3;
use crate::ErrorMetric;

/// ETC1 and ETC2 RGB blocks.
#[derive(Debug, Clone)]
pub(crate) struct Rgb8State {
    search: ColorSearch,
}

impl Rgb8State {
    pub fn new(pixels: &[Vec4; 16], mask: u16, metric: ErrorMetric, etc1: bool) -> Self {
        let modes = if etc1 {
            ColorModes::ETC1
        } else {
            ColorModes::ETC2
        };
        let prepared = pixels.map(|p| metric.prepare(p));
        Self {
            search: ColorSearch::new(metric, modes, prepared, mask, 0),
        }
    }
}

impl EncodingState for Rgb8State {
    fn iterate(&mut self, effort: f32) {
        self.search.iterate(effort);
    }
    fn is_done(&self) -> bool {
        self.search.is_done()
    }
    fn error(&self) -> f32 {
        self.search.error()
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
        let bits = self.search.block().pack(false, true);
        out[..8].copy_from_slice(&bits.to_be_bytes());
    }
}
