use bitflags::bitflags;

bitflags! {
    /// The outcome of an encode call.
    ///
    /// Flags below [`EncodingStatus::ERROR_THRESHOLD`] are warnings. They are
    /// informational and the encoded data is still valid. Flags at or above
    /// the threshold are hard errors, in which case no data is produced.
    ///
    /// An empty set means success.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct EncodingStatus: u32 {
        /// The requested effort was outside `0..=100` (or NaN) and has been
        /// clamped.
        const WARNING_EFFORT_OUT_OF_RANGE = 1 << 1;
        /// The requested number of jobs was outside `1..=max_jobs` and has been
        /// clamped.
        const WARNING_JOBS_OUT_OF_RANGE = 1 << 2;
        /// At least one pixel has an alpha value that is not 1.
        const WARNING_SOME_NON_OPAQUE_PIXELS = 1 << 3;
        /// Every pixel has an alpha value of 1.
        const WARNING_ALL_OPAQUE_PIXELS = 1 << 4;
        /// Every pixel has an alpha value of 0 (or NaN).
        const WARNING_ALL_TRANSPARENT_PIXELS = 1 << 5;
        /// At least one pixel has an alpha value strictly between 0 and 1.
        const WARNING_SOME_TRANSLUCENT_PIXELS = 1 << 6;
        /// At least one channel of one pixel is outside `0..=1`.
        const WARNING_SOME_RGBA_NOT_0_TO_1 = 1 << 7;
        /// At least one pixel has a non-zero blue channel.
        const WARNING_SOME_BLUE_VALUES_ARE_NOT_ZERO = 1 << 8;
        /// At least one pixel has a non-zero green channel.
        const WARNING_SOME_GREEN_VALUES_ARE_NOT_ZERO = 1 << 9;

        const ERROR_UNKNOWN_FORMAT = 1 << 17;
        const ERROR_UNKNOWN_ERROR_METRIC = 1 << 18;
        const ERROR_ZERO_WIDTH_OR_HEIGHT = 1 << 19;
        /// The pixel slice holds fewer than `width * height` pixels.
        const ERROR_SOURCE_SIZE_MISMATCH = 1 << 20;
    }
}

impl EncodingStatus {
    /// The lowest warning bit. No flag uses this bit.
    pub const WARNING_THRESHOLD: u32 = 1 << 0;
    /// The lowest error bit. Every flag at or above this bit is an error.
    pub const ERROR_THRESHOLD: u32 = 1 << 16;

    /// Whether the status contains at least one hard error.
    pub const fn is_error(self) -> bool {
        self.bits() & !(Self::ERROR_THRESHOLD - 1) != 0
    }
    /// Whether the status contains at least one warning.
    pub const fn has_warnings(self) -> bool {
        self.bits() & (Self::ERROR_THRESHOLD - 1) != 0
    }

    /// The warning flags of this status.
    pub const fn warnings(self) -> Self {
        Self::from_bits_retain(self.bits() & (Self::ERROR_THRESHOLD - 1))
    }
    /// The error flags of this status.
    pub const fn errors(self) -> Self {
        Self::from_bits_retain(self.bits() & !(Self::ERROR_THRESHOLD - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_error_split() {
        assert!(!EncodingStatus::empty().is_error());
        assert!(!EncodingStatus::empty().has_warnings());

        let warnings = EncodingStatus::WARNING_EFFORT_OUT_OF_RANGE
            | EncodingStatus::WARNING_SOME_GREEN_VALUES_ARE_NOT_ZERO;
        assert!(!warnings.is_error());
        assert!(warnings.has_warnings());

        let mixed = warnings | EncodingStatus::ERROR_UNKNOWN_FORMAT;
        assert!(mixed.is_error());
        assert_eq!(mixed.warnings(), warnings);
        assert_eq!(mixed.errors(), EncodingStatus::ERROR_UNKNOWN_FORMAT);

        // every error flag is at or above the threshold
        for flag in EncodingStatus::all().errors().iter() {
            assert!(flag.bits() >= EncodingStatus::ERROR_THRESHOLD);
        }
        for flag in EncodingStatus::all().warnings().iter() {
            assert!(flag.bits() > EncodingStatus::WARNING_THRESHOLD);
        }
    }
}
