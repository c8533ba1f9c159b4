//! Parameters, bit layouts, and decoding of ETC1/ETC2 color blocks.
//!
//! All blocks are 64 bits, stored big-endian. Pixels are indexed in vertical
//! scan order, i.e. pixel `i` is at `x = i / 4, y = i % 4`.

use crate::color::{expand4, expand5, expand6, expand7};

/// The ETC1 intensity modifiers `(a, b)`. Selector `0..4` maps to `+a, +b, -a, -b`.
pub(crate) const MODIFIERS: [[i16; 2]; 8] = [
    [2, 8],
    [5, 17],
    [9, 29],
    [13, 42],
    [18, 60],
    [24, 80],
    [33, 106],
    [47, 183],
];

/// The distances of T and H mode blocks.
pub(crate) const DISTANCES: [i16; 8] = [3, 6, 11, 16, 23, 32, 41, 64];

/// The selector that means "transparent" in punch-through blocks without the
/// opaque flag.
pub(crate) const TRANSPARENT_SELECTOR: u8 = 2;

/// Pixel mask of the first sub-block.
pub(crate) const fn half_mask(flip: bool, half: usize) -> u16 {
    match (flip, half) {
        // left/right
        (false, 0) => 0x00FF,
        (false, _) => 0xFF00,
        // top/bottom
        (true, 0) => 0x3333,
        (true, _) => 0xCCCC,
    }
}

/// A decoded palette entry. `None` is a transparent black pixel.
pub(crate) type PaletteColor = Option<[u8; 3]>;
pub(crate) type Palette = [PaletteColor; 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EtcBlock {
    /// Two 4-bit colors.
    Individual {
        flip: bool,
        colors: [[u8; 3]; 2],
        tables: [u8; 2],
        selectors: [u8; 16],
    },
    /// A 5-bit base color and a 3-bit signed delta for the second sub-block.
    Differential {
        flip: bool,
        base: [u8; 3],
        delta: [i8; 3],
        tables: [u8; 2],
        selectors: [u8; 16],
    },
    /// Two 4-bit colors, the second one is used with `+d, 0, -d`.
    T {
        colors: [[u8; 3]; 2],
        distance: u8,
        selectors: [u8; 16],
    },
    /// Two 4-bit colors, both used with `+d, -d`.
    ///
    /// The lowest bit of `distance` is implied by the order of the two colors.
    /// Use [`h_distance_is_valid`] to check that the combination can be
    /// represented.
    H {
        colors: [[u8; 3]; 2],
        distance: u8,
        selectors: [u8; 16],
    },
    /// A gradient defined by 6/7/6-bit colors at `(0,0)`, `(4,0)`, and `(0,4)`.
    Planar {
        origin: [u8; 3],
        horizontal: [u8; 3],
        vertical: [u8; 3],
    },
}

/// The kind of a color block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockMode {
    Individual,
    Differential,
    T,
    H,
    Planar,
    /// An EAC single channel block. Only used by R11 and RG11.
    Eac,
}

fn h_color_value(c: [u8; 3]) -> u16 {
    ((c[0] as u16) << 8) | ((c[1] as u16) << 4) | c[2] as u16
}
/// Whether an H block with the given colors and distance can be encoded.
pub(crate) fn h_distance_is_valid(colors: [[u8; 3]; 2], distance: u8) -> bool {
    let lsb = h_color_value(colors[0]) >= h_color_value(colors[1]);
    lsb == (distance & 1 == 1)
}

#[inline]
fn add_clamped(c: [u8; 3], d: i16) -> [u8; 3] {
    c.map(|c| (c as i16 + d).clamp(0, 255) as u8)
}

/// The palette of an individual or differential sub-block.
pub(crate) fn etc1_palette(base: [u8; 3], table: u8, opaque: bool) -> Palette {
    let [a, b] = MODIFIERS[table as usize];
    if opaque {
        [
            Some(add_clamped(base, a)),
            Some(add_clamped(base, b)),
            Some(add_clamped(base, -a)),
            Some(add_clamped(base, -b)),
        ]
    } else {
        [
            Some(base),
            Some(add_clamped(base, b)),
            None,
            Some(add_clamped(base, -b)),
        ]
    }
}
pub(crate) fn t_palette(colors: [[u8; 3]; 2], distance: u8, opaque: bool) -> Palette {
    let c1 = colors[0].map(expand4);
    let c2 = colors[1].map(expand4);
    let d = DISTANCES[distance as usize];
    [
        Some(c1),
        Some(add_clamped(c2, d)),
        opaque.then_some(c2),
        Some(add_clamped(c2, -d)),
    ]
}
pub(crate) fn h_palette(colors: [[u8; 3]; 2], distance: u8, opaque: bool) -> Palette {
    let c1 = colors[0].map(expand4);
    let c2 = colors[1].map(expand4);
    let d = DISTANCES[distance as usize];
    [
        Some(add_clamped(c1, d)),
        Some(add_clamped(c1, -d)),
        opaque.then_some(add_clamped(c2, d)),
        Some(add_clamped(c2, -d)),
    ]
}

/// The 8-bit color of a pixel of a planar block.
pub(crate) fn planar_color(
    origin: [u8; 3],
    horizontal: [u8; 3],
    vertical: [u8; 3],
    pixel: usize,
) -> [u8; 3] {
    let x = (pixel / 4) as i32;
    let y = (pixel % 4) as i32;
    let mut out = [0; 3];
    for c in 0..3 {
        let (o, h, v) = if c == 1 {
            (expand7(origin[c]), expand7(horizontal[c]), expand7(vertical[c]))
        } else {
            (expand6(origin[c]), expand6(horizontal[c]), expand6(vertical[c]))
        };
        let (o, h, v) = (o as i32, h as i32, v as i32);
        out[c] = ((x * (h - o) + y * (v - o) + 4 * o + 2) >> 2).clamp(0, 255) as u8;
    }
    out
}

impl EtcBlock {
    pub fn mode(&self) -> BlockMode {
        match self {
            EtcBlock::Individual { .. } => BlockMode::Individual,
            EtcBlock::Differential { .. } => BlockMode::Differential,
            EtcBlock::T { .. } => BlockMode::T,
            EtcBlock::H { .. } => BlockMode::H,
            EtcBlock::Planar { .. } => BlockMode::Planar,
        }
    }

    pub fn flip(&self) -> Option<bool> {
        match *self {
            EtcBlock::Individual { flip, .. } | EtcBlock::Differential { flip, .. } => Some(flip),
            _ => None,
        }
    }

    /// The 8-bit base colors of the two sub-blocks.
    pub fn sub_block_colors(&self) -> Option<[[u8; 3]; 2]> {
        match *self {
            EtcBlock::Individual { colors, .. } => Some(colors.map(|c| c.map(expand4))),
            EtcBlock::Differential { base, delta, .. } => {
                let second: [u8; 3] = std::array::from_fn(|i| (base[i] as i8 + delta[i]) as u8);
                Some([base.map(expand5), second.map(expand5)])
            }
            _ => None,
        }
    }

    pub fn selectors_mut(&mut self) -> Option<&mut [u8; 16]> {
        match self {
            EtcBlock::Individual { selectors, .. }
            | EtcBlock::Differential { selectors, .. }
            | EtcBlock::T { selectors, .. }
            | EtcBlock::H { selectors, .. } => Some(selectors),
            EtcBlock::Planar { .. } => None,
        }
    }

    /// Calls `f` with the palette and pixel mask of each part of the block.
    ///
    /// T and H blocks have a single part covering all 16 pixels.
    pub fn for_each_palette(&self, opaque: bool, mut f: impl FnMut(u16, Palette)) {
        match *self {
            EtcBlock::Individual { flip, tables, .. } | EtcBlock::Differential { flip, tables, .. } => {
                if let Some(colors) = self.sub_block_colors() {
                    for half in 0..2 {
                        f(
                            half_mask(flip, half),
                            etc1_palette(colors[half], tables[half], opaque),
                        );
                    }
                }
            }
            EtcBlock::T {
                colors, distance, ..
            } => f(0xFFFF, t_palette(colors, distance, opaque)),
            EtcBlock::H {
                colors, distance, ..
            } => f(0xFFFF, h_palette(colors, distance, opaque)),
            EtcBlock::Planar { .. } => {}
        }
    }

    /// Decodes all 16 pixels. `None` is a transparent black pixel.
    pub fn decode(&self, opaque: bool) -> [PaletteColor; 16] {
        let mut out = [None; 16];
        match *self {
            EtcBlock::Planar {
                origin,
                horizontal,
                vertical,
            } => {
                for (i, pixel) in out.iter_mut().enumerate() {
                    *pixel = Some(planar_color(origin, horizontal, vertical, i));
                }
            }
            EtcBlock::Individual { selectors, .. }
            | EtcBlock::Differential { selectors, .. }
            | EtcBlock::T { selectors, .. }
            | EtcBlock::H { selectors, .. } => {
                self.for_each_palette(opaque, |mask, palette| {
                    for i in 0..16 {
                        if mask & (1 << i) != 0 {
                            out[i] = palette[selectors[i] as usize & 3];
                        }
                    }
                });
            }
        }
        out
    }

    /// Packs the block into its 64-bit representation.
    ///
    /// For punch-through formats, `opaque` is stored in the "diff" bit.
    /// Otherwise `opaque` must be `true`.
    pub fn pack(&self, punch_through: bool, opaque: bool) -> u64 {
        debug_assert!(punch_through || opaque);
        let bits = match *self {
            EtcBlock::Individual {
                flip,
                colors,
                tables,
                selectors,
            } => {
                debug_assert!(!punch_through);
                let [c1, c2] = colors;
                (c1[0] as u64) << 60
                    | (c2[0] as u64) << 56
                    | (c1[1] as u64) << 52
                    | (c2[1] as u64) << 48
                    | (c1[2] as u64) << 44
                    | (c2[2] as u64) << 40
                    | (tables[0] as u64) << 37
                    | (tables[1] as u64) << 34
                    | (flip as u64) << 32
                    | pack_selectors(&selectors)
            }
            EtcBlock::Differential {
                flip,
                base,
                delta,
                tables,
                selectors,
            } => {
                let d = delta.map(|d| (d as u8 & 0b111) as u64);
                (base[0] as u64) << 59
                    | d[0] << 56
                    | (base[1] as u64) << 51
                    | d[1] << 48
                    | (base[2] as u64) << 43
                    | d[2] << 40
                    | (tables[0] as u64) << 37
                    | (tables[1] as u64) << 34
                    | 1 << 33
                    | (flip as u64) << 32
                    | pack_selectors(&selectors)
            }
            EtcBlock::T {
                colors,
                distance,
                selectors,
            } => {
                let [c1, c2] = colors;
                let r1a = (c1[0] >> 2) as u64;
                let r1b = (c1[0] & 0b11) as u64;
                // force the red differential to overflow
                let (d2, d1) = if r1a + r1b >= 4 { (0b111, 0) } else { (0, 1) };
                d2 << 61
                    | r1a << 59
                    | d1 << 58
                    | r1b << 56
                    | (c1[1] as u64) << 52
                    | (c1[2] as u64) << 48
                    | (c2[0] as u64) << 44
                    | (c2[1] as u64) << 40
                    | (c2[2] as u64) << 36
                    | ((distance >> 1) as u64) << 34
                    | 1 << 33
                    | ((distance & 1) as u64) << 32
                    | pack_selectors(&selectors)
            }
            EtcBlock::H {
                colors,
                distance,
                selectors,
            } => {
                debug_assert!(h_distance_is_valid(colors, distance));
                let [c1, c2] = colors;
                let g1a = (c1[1] >> 1) as u64;
                let g1b = (c1[1] & 1) as u64;
                let b1a = (c1[2] >> 3) as u64;
                let b1b = (c1[2] & 0b111) as u64;
                // red must not overflow, green must
                let r_sign = (g1a >= 4) as u64;
                let x = (g1b << 1) | b1a;
                let y = b1b >> 1;
                let (d3, d1) = if x + y >= 4 { (0b111, 0) } else { (0, 1) };
                r_sign << 63
                    | (c1[0] as u64) << 59
                    | g1a << 56
                    | d3 << 53
                    | g1b << 52
                    | b1a << 51
                    | d1 << 50
                    | b1b << 47
                    | (c2[0] as u64) << 43
                    | (c2[1] as u64) << 39
                    | (c2[2] as u64) << 35
                    | ((distance >> 2) as u64) << 34
                    | 1 << 33
                    | (((distance >> 1) & 1) as u64) << 32
                    | pack_selectors(&selectors)
            }
            EtcBlock::Planar {
                origin,
                horizontal,
                vertical,
            } => {
                let ro = origin[0] as u64;
                let go = origin[1] as u64;
                let bo = origin[2] as u64;
                let go1 = go >> 6;
                let go2 = go & 0x3F;
                let bo1 = bo >> 5;
                let bo2 = (bo >> 3) & 0b11;
                let bo3 = bo & 0b111;
                let rh = horizontal[0] as u64;

                // red and green must not overflow, blue must
                let r_sign = (ro >> 1) & 1;
                let g_sign = (go2 >> 1) & 1;
                let (d3, d1) = if bo2 + (bo3 >> 1) >= 4 {
                    (0b111, 0)
                } else {
                    (0, 1)
                };

                r_sign << 63
                    | ro << 57
                    | go1 << 56
                    | g_sign << 55
                    | go2 << 49
                    | bo1 << 48
                    | d3 << 45
                    | bo2 << 43
                    | d1 << 42
                    | bo3 << 39
                    | (rh >> 1) << 34
                    | 1 << 33
                    | (rh & 1) << 32
                    | (horizontal[1] as u64) << 25
                    | (horizontal[2] as u64) << 19
                    | (vertical[0] as u64) << 13
                    | (vertical[1] as u64) << 6
                    | vertical[2] as u64
            }
        };

        if punch_through && !opaque {
            bits & !(1 << 33)
        } else {
            bits
        }
    }

    /// Unpacks a 64-bit block.
    ///
    /// Returns the block and whether it is opaque. Blocks of non punch-through
    /// formats are always opaque.
    pub fn unpack(bits: u64, punch_through: bool) -> (Self, bool) {
        let diff = (bits >> 33) & 1 == 1;
        let opaque = !punch_through || diff;
        let flip = (bits >> 32) & 1 == 1;
        let tables = [((bits >> 37) & 0b111) as u8, ((bits >> 34) & 0b111) as u8];
        let selectors = unpack_selectors(bits);

        if !punch_through && !diff {
            let nibble = |shift: u32| ((bits >> shift) & 0xF) as u8;
            let block = EtcBlock::Individual {
                flip,
                colors: [
                    [nibble(60), nibble(52), nibble(44)],
                    [nibble(56), nibble(48), nibble(40)],
                ],
                tables,
                selectors,
            };
            return (block, opaque);
        }

        let field = |shift: u32| ((bits >> shift) & 0x1F) as i8;
        let delta = |shift: u32| sign_extend3(((bits >> shift) & 0b111) as u8);
        let (r, dr) = (field(59), delta(56));
        let (g, dg) = (field(51), delta(48));
        let (b, db) = (field(43), delta(40));
        let overflows = |c: i8, d: i8| !(0..32).contains(&(c + d));

        let block = if overflows(r, dr) {
            let r1 = (((bits >> 59) & 0b11) << 2 | (bits >> 56) & 0b11) as u8;
            EtcBlock::T {
                colors: [
                    [r1, ((bits >> 52) & 0xF) as u8, ((bits >> 48) & 0xF) as u8],
                    [
                        ((bits >> 44) & 0xF) as u8,
                        ((bits >> 40) & 0xF) as u8,
                        ((bits >> 36) & 0xF) as u8,
                    ],
                ],
                distance: (((bits >> 34) & 0b11) << 1 | (bits >> 32) & 1) as u8,
                selectors,
            }
        } else if overflows(g, dg) {
            let c1 = [
                ((bits >> 59) & 0xF) as u8,
                (((bits >> 56) & 0b111) << 1 | (bits >> 52) & 1) as u8,
                (((bits >> 51) & 1) << 3 | (bits >> 47) & 0b111) as u8,
            ];
            let c2 = [
                ((bits >> 43) & 0xF) as u8,
                ((bits >> 39) & 0xF) as u8,
                ((bits >> 35) & 0xF) as u8,
            ];
            let lsb = (h_color_value(c1) >= h_color_value(c2)) as u64;
            EtcBlock::H {
                colors: [c1, c2],
                distance: (((bits >> 34) & 1) << 2 | ((bits >> 32) & 1) << 1 | lsb) as u8,
                selectors,
            }
        } else if overflows(b, db) {
            let ro = ((bits >> 57) & 0x3F) as u8;
            let go = (((bits >> 56) & 1) << 6 | (bits >> 49) & 0x3F) as u8;
            let bo = (((bits >> 48) & 1) << 5 | ((bits >> 43) & 0b11) << 3 | (bits >> 39) & 0b111)
                as u8;
            let rh = (((bits >> 34) & 0x1F) << 1 | (bits >> 32) & 1) as u8;
            EtcBlock::Planar {
                origin: [ro, go, bo],
                horizontal: [rh, ((bits >> 25) & 0x7F) as u8, ((bits >> 19) & 0x3F) as u8],
                vertical: [
                    ((bits >> 13) & 0x3F) as u8,
                    ((bits >> 6) & 0x7F) as u8,
                    (bits & 0x3F) as u8,
                ],
            }
        } else {
            EtcBlock::Differential {
                flip,
                base: [r as u8, g as u8, b as u8],
                delta: [dr, dg, db],
                tables,
                selectors,
            }
        };

        // planar blocks are always opaque
        let opaque = opaque || matches!(block, EtcBlock::Planar { .. });
        (block, opaque)
    }
}

fn sign_extend3(v: u8) -> i8 {
    ((v << 5) as i8) >> 5
}

fn pack_selectors(selectors: &[u8; 16]) -> u64 {
    let mut bits = 0;
    for (i, &s) in selectors.iter().enumerate() {
        bits |= ((s as u64 >> 1) & 1) << (16 + i);
        bits |= (s as u64 & 1) << i;
    }
    bits
}
fn unpack_selectors(bits: u64) -> [u8; 16] {
    std::array::from_fn(|i| (((bits >> (16 + i)) & 1) << 1 | (bits >> i) & 1) as u8)
}
