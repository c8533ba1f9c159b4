//! Decoding of packed blocks.
//!
//! The decoder implements the standard ETC1, ETC2 and EAC decoding rules and
//! shares the bit-level code with the encoder. Values are reported in the
//! same normalized space the encoder works in, so signed formats are mapped
//! back from `-1..=1` to `0..=1`.

use crate::block::eac::{EacBlock, EacKind};
use crate::block::etc::{EtcBlock, PaletteColor};
use crate::color::to_vec3;
use crate::{BitFormat, Format};

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buffer = [0; 8];
    buffer.copy_from_slice(&bytes[..8]);
    u64::from_be_bytes(buffer)
}

fn eac_channel(bytes: &[u8], kind: EacKind) -> [f32; 16] {
    EacBlock::unpack(read_u64(bytes), kind).decode(kind)
}

fn color(c: PaletteColor) -> [f32; 4] {
    match c {
        Some(c) => to_vec3(c).extend(1.0).to_array(),
        None => [0.0; 4],
    }
}

/// Decodes a single block.
///
/// Returns the 16 pixels of the block in row-major order, or `None` if the
/// format is unknown or `block` does not have the size of one block of the
/// format.
pub fn decode_block(format: Format, block: &[u8]) -> Option<[[f32; 4]; 16]> {
    let bit_format = format.bit_format()?;
    if block.len() != bit_format.bytes_per_block() {
        return None;
    }
    let eac_kind = if format.is_signed() {
        EacKind::Signed11
    } else {
        EacKind::Unsigned11
    };

    // all blocks store pixels in vertical scan order
    let vertical: [[f32; 4]; 16] = match bit_format {
        BitFormat::Rgb8 => {
            let (etc, _) = EtcBlock::unpack(read_u64(block), false);
            etc.decode(true).map(color)
        }
        BitFormat::Rgba8 => {
            let alpha = eac_channel(&block[..8], EacKind::Alpha);
            let (etc, _) = EtcBlock::unpack(read_u64(&block[8..]), false);
            let colors = etc.decode(true);
            std::array::from_fn(|i| {
                let [r, g, b, _] = color(colors[i]);
                [r, g, b, alpha[i]]
            })
        }
        BitFormat::R11 => eac_channel(block, eac_kind).map(|r| [r, 0.0, 0.0, 1.0]),
        BitFormat::Rg11 => {
            let red = eac_channel(&block[..8], eac_kind);
            let green = eac_channel(&block[8..], eac_kind);
            std::array::from_fn(|i| [red[i], green[i], 0.0, 1.0])
        }
        BitFormat::Rgb8A1 => {
            let (etc, opaque) = EtcBlock::unpack(read_u64(block), true);
            etc.decode(opaque).map(color)
        }
    };

    Some(std::array::from_fn(|i| {
        let (x, y) = (i % 4, i / 4);
        vertical[x * 4 + y]
    }))
}

/// Decodes a whole image.
///
/// `data` must hold one block per tile in row-major tile order, exactly as
/// produced by [`encode`](crate::encode()). The returned pixels are in
/// row-major order and cropped to `width` x `height`.
///
/// Returns `None` if the format is unknown or `data` has the wrong size.
pub fn decode(format: Format, data: &[u8], width: u32, height: u32) -> Option<Vec<[f32; 4]>> {
    let bytes_per_block = format.bit_format()?.bytes_per_block();
    let grid_width = width.div_ceil(4) as usize;
    let grid_height = height.div_ceil(4) as usize;
    if data.len() != grid_width * grid_height * bytes_per_block {
        return None;
    }

    let (width, height) = (width as usize, height as usize);
    let mut pixels = vec![[0.0; 4]; width * height];
    for (i, block) in data.chunks_exact(bytes_per_block).enumerate() {
        let decoded = decode_block(format, block)?;
        let (tx, ty) = (i % grid_width * 4, i / grid_width * 4);
        for (j, pixel) in decoded.iter().enumerate() {
            let (x, y) = (tx + j % 4, ty + j / 4);
            if x < width && y < height {
                pixels[y * width + x] = *pixel;
            }
        }
    }
    Some(pixels)
}
