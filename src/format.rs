use std::str::FromStr;

use num_enum::FromPrimitive;

use crate::EncodingStatus;

/// The output formats supported by the encoder.
///
/// Formats are grouped into families that share a packed block layout (see
/// [`BitFormat`]). sRGB variants are encoded exactly like their linear
/// counterparts. Only the tag differs, so the caller is responsible for
/// providing sRGB-encoded source values.
///
/// Formats can also be created from their numeric code with
/// `Format::from(code)`. Codes that don't name a known format produce
/// [`Format::Unknown`], which the encoder rejects with
/// [`EncodingStatus::ERROR_UNKNOWN_FORMAT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(u8)]
#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
pub enum Format {
    /// ETC1 RGB. Only individual and differential blocks are produced.
    ETC1 = 1,

    // ETC2 formats
    RGB8 = 2,
    SRGB8 = 3,
    /// ETC2 RGB with a separate EAC alpha block.
    RGBA8 = 4,
    SRGBA8 = 5,
    /// Single channel EAC.
    R11 = 6,
    /// Single channel EAC. Source values in `[0, 1]` are mapped to `[-1, 1]`.
    SIGNED_R11 = 7,
    /// Dual channel EAC.
    RG11 = 8,
    /// Dual channel EAC. Source values in `[0, 1]` are mapped to `[-1, 1]`.
    SIGNED_RG11 = 9,
    /// ETC2 RGB with 1-bit punch-through alpha.
    RGB8A1 = 10,
    SRGB8A1 = 11,

    /// A format code this crate does not know about.
    #[num_enum(catch_all)]
    Unknown(u8),
}

impl Format {
    /// All known formats.
    pub const ALL: &'static [Format] = &[
        Format::ETC1,
        Format::RGB8,
        Format::SRGB8,
        Format::RGBA8,
        Format::SRGBA8,
        Format::R11,
        Format::SIGNED_R11,
        Format::RG11,
        Format::SIGNED_RG11,
        Format::RGB8A1,
        Format::SRGB8A1,
    ];

    /// The numeric code of this format.
    pub const fn code(self) -> u8 {
        match self {
            Format::ETC1 => 1,
            Format::RGB8 => 2,
            Format::SRGB8 => 3,
            Format::RGBA8 => 4,
            Format::SRGBA8 => 5,
            Format::R11 => 6,
            Format::SIGNED_R11 => 7,
            Format::RG11 => 8,
            Format::SIGNED_RG11 => 9,
            Format::RGB8A1 => 10,
            Format::SRGB8A1 => 11,
            Format::Unknown(code) => code,
        }
    }

    /// The packed block layout of this format, or `None` for unknown formats.
    pub const fn bit_format(self) -> Option<BitFormat> {
        Some(match self {
            Format::ETC1 | Format::RGB8 | Format::SRGB8 => BitFormat::Rgb8,
            Format::RGBA8 | Format::SRGBA8 => BitFormat::Rgba8,
            Format::R11 | Format::SIGNED_R11 => BitFormat::R11,
            Format::RG11 | Format::SIGNED_RG11 => BitFormat::Rg11,
            Format::RGB8A1 | Format::SRGB8A1 => BitFormat::Rgb8A1,
            Format::Unknown(_) => return None,
        })
    }

    /// Whether the format only allows ETC1 block modes.
    pub const fn is_etc1(self) -> bool {
        matches!(self, Format::ETC1)
    }
    /// Whether the format stores signed EAC values.
    pub const fn is_signed(self) -> bool {
        matches!(self, Format::SIGNED_R11 | Format::SIGNED_RG11)
    }

    /// The warnings that are meaningful when encoding to this format.
    ///
    /// Warnings about image content are only reported if they are part of
    /// this set. E.g. "all pixels are opaque" is only worth mentioning for
    /// formats that spend bits on alpha.
    pub const fn tracked_warnings(self) -> EncodingStatus {
        let common = EncodingStatus::WARNING_ALL_TRANSPARENT_PIXELS
            .union(EncodingStatus::WARNING_SOME_RGBA_NOT_0_TO_1);

        let specific = match self {
            Format::ETC1 | Format::RGB8 | Format::SRGB8 => {
                EncodingStatus::WARNING_SOME_NON_OPAQUE_PIXELS
                    .union(EncodingStatus::WARNING_SOME_TRANSLUCENT_PIXELS)
            }
            Format::RGB8A1 | Format::SRGB8A1 => EncodingStatus::WARNING_SOME_TRANSLUCENT_PIXELS
                .union(EncodingStatus::WARNING_ALL_OPAQUE_PIXELS),
            Format::RGBA8 | Format::SRGBA8 => EncodingStatus::WARNING_ALL_OPAQUE_PIXELS,
            Format::R11 | Format::SIGNED_R11 => EncodingStatus::WARNING_SOME_NON_OPAQUE_PIXELS
                .union(EncodingStatus::WARNING_SOME_TRANSLUCENT_PIXELS)
                .union(EncodingStatus::WARNING_SOME_GREEN_VALUES_ARE_NOT_ZERO)
                .union(EncodingStatus::WARNING_SOME_BLUE_VALUES_ARE_NOT_ZERO),
            Format::RG11 | Format::SIGNED_RG11 => EncodingStatus::WARNING_SOME_NON_OPAQUE_PIXELS
                .union(EncodingStatus::WARNING_SOME_TRANSLUCENT_PIXELS)
                .union(EncodingStatus::WARNING_SOME_BLUE_VALUES_ARE_NOT_ZERO),
            Format::Unknown(_) => return EncodingStatus::empty(),
        };

        common.union(specific)
    }

    /// The canonical name of the format, e.g. `"SIGNED_RG11"`.
    pub const fn name(self) -> &'static str {
        match self {
            Format::ETC1 => "ETC1",
            Format::RGB8 => "RGB8",
            Format::SRGB8 => "SRGB8",
            Format::RGBA8 => "RGBA8",
            Format::SRGBA8 => "SRGBA8",
            Format::R11 => "R11",
            Format::SIGNED_R11 => "SIGNED_R11",
            Format::RG11 => "RG11",
            Format::SIGNED_RG11 => "SIGNED_RG11",
            Format::RGB8A1 => "RGB8A1",
            Format::SRGB8A1 => "SRGB8A1",
            Format::Unknown(_) => "UNKNOWN",
        }
    }
}

impl Default for Format {
    fn default() -> Self {
        Format::SRGB8
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFormatName(pub String);
impl std::fmt::Display for UnknownFormatName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown format name {:?}", self.0)
    }
}
impl std::error::Error for UnknownFormatName {}

impl FromStr for Format {
    type Err = UnknownFormatName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::ALL
            .iter()
            .copied()
            .find(|format| format.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownFormatName(s.to_string()))
    }
}

/// A family of formats that share the same packed block layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitFormat {
    /// 64-bit ETC1/ETC2 color block.
    Rgb8,
    /// 64-bit EAC alpha block followed by a 64-bit ETC2 color block.
    Rgba8,
    /// 64-bit EAC block.
    R11,
    /// 64-bit EAC red block followed by a 64-bit EAC green block.
    Rg11,
    /// 64-bit ETC2 color block with punch-through alpha.
    Rgb8A1,
}

impl BitFormat {
    /// The size of one encoded 4x4 block in bytes.
    pub const fn bytes_per_block(self) -> usize {
        match self {
            BitFormat::Rgb8 | BitFormat::R11 | BitFormat::Rgb8A1 => 8,
            BitFormat::Rgba8 | BitFormat::Rg11 => 16,
        }
    }
}
