use glam::Vec4;

use super::eac::{EacKind, EacSearch};
use super::etc::BlockMode;
use super::{sanitize, EncodingState};

fn kind(signed: bool) -> EacKind {
    if signed {
        EacKind::Signed11
    } else {
        EacKind::Unsigned11
    }
}

/// Single channel EAC blocks. The error is the squared red difference.
#[derive(Debug, Clone)]
pub(crate) struct R11State {
    kind: EacKind,
    red: EacSearch,
}

impl R11State {
    pub fn new(pixels: &[Vec4; 16], mask: u16, signed: bool) -> Self {
        let kind = kind(signed);
        Self {
            kind,
            red: EacSearch::new(kind, pixels.map(|p| sanitize(p.x)), mask),
        }
    }
}

impl EncodingState for R11State {
    fn iterate(&mut self, effort: f32) {
        self.red.iterate(effort);
    }
    fn is_done(&self) -> bool {
        self.red.is_done()
    }
    fn error(&self) -> f32 {
        self.red.error()
    }
    fn decoded(&self) -> [Vec4; 16] {
        self.red.decoded().map(|r| Vec4::new(r, 0.0, 0.0, 1.0))
    }
    fn mode(&self) -> BlockMode {
        BlockMode::Eac
    }
    fn write_bits(&self, out: &mut [u8]) {
        let bits = self.red.block().pack(self.kind);
        out[..8].copy_from_slice(&bits.to_be_bytes());
    }
}

/// Dual channel EAC blocks. Red and green are searched independently.
#[derive(Debug, Clone)]
pub(crate) struct Rg11State {
    kind: EacKind,
    red: EacSearch,
    green: EacSearch,
}

impl Rg11State {
    pub fn new(pixels: &[Vec4; 16], mask: u16, signed: bool) -> Self {
        let kind = kind(signed);
        Self {
            kind,
            red: EacSearch::new(kind, pixels.map(|p| sanitize(p.x)), mask),
            green: EacSearch::new(kind, pixels.map(|p| sanitize(p.y)), mask),
        }
    }
}

impl EncodingState for Rg11State {
    fn iterate(&mut self, effort: f32) {
        self.red.iterate(effort);
        self.green.iterate(effort);
    }
    fn is_done(&self) -> bool {
        self.red.is_done() && self.green.is_done()
    }
    fn error(&self) -> f32 {
        self.red.error() + self.green.error()
    }
    fn decoded(&self) -> [Vec4; 16] {
        let red = self.red.decoded();
        let green = self.green.decoded();
        std::array::from_fn(|i| Vec4::new(red[i], green[i], 0.0, 1.0))
    }
    fn mode(&self) -> BlockMode {
        BlockMode::Eac
    }
    fn write_bits(&self, out: &mut [u8]) {
        let red = self.red.block().pack(self.kind);
        let green = self.green.block().pack(self.kind);
        out[..8].copy_from_slice(&red.to_be_bytes());
        out[8..16].copy_from_slice(&green.to_be_bytes());
    }
}
