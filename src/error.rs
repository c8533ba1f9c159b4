use thiserror::Error;

use crate::EncodingStatus;

/// A hard error that prevented encoding.
///
/// This is the `Result`-friendly view of the error flags in
/// [`EncodingStatus`]. See [`Encoded::into_result`](crate::Encoded::into_result).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum EncodeError {
    #[error("unknown output format")]
    UnknownFormat,
    #[error("unknown error metric")]
    UnknownErrorMetric,
    #[error("the width or height of the image is zero")]
    ZeroDimension,
    #[error("the source has fewer pixels than width times height")]
    SourceSizeMismatch,
}

impl EncodeError {
    /// Returns the first error in the given status, if any.
    pub fn from_status(status: EncodingStatus) -> Option<Self> {
        if status.contains(EncodingStatus::ERROR_UNKNOWN_FORMAT) {
            Some(Self::UnknownFormat)
        } else if status.contains(EncodingStatus::ERROR_UNKNOWN_ERROR_METRIC) {
            Some(Self::UnknownErrorMetric)
        } else if status.contains(EncodingStatus::ERROR_ZERO_WIDTH_OR_HEIGHT) {
            Some(Self::ZeroDimension)
        } else if status.contains(EncodingStatus::ERROR_SOURCE_SIZE_MISMATCH) {
            Some(Self::SourceSizeMismatch)
        } else {
            None
        }
    }

    /// The status flag corresponding to this error.
    pub const fn status(&self) -> EncodingStatus {
        match self {
            Self::UnknownFormat => EncodingStatus::ERROR_UNKNOWN_FORMAT,
            Self::UnknownErrorMetric => EncodingStatus::ERROR_UNKNOWN_ERROR_METRIC,
            Self::ZeroDimension => EncodingStatus::ERROR_ZERO_WIDTH_OR_HEIGHT,
            Self::SourceSizeMismatch => EncodingStatus::ERROR_SOURCE_SIZE_MISMATCH,
        }
    }
}
