use glam::{Vec3A, Vec4, Vec4Swizzles};
use num_enum::FromPrimitive;

/// The error metric the encoder minimizes.
///
/// The same metric is used while searching for a block encoding and for the
/// error reported in [`Encoded::error`](crate::Encoded::error).
///
/// The metric only governs color channels. Alpha planes (EAC alpha and 1-bit
/// punch-through alpha) always use the squared alpha difference, and the
/// single and dual channel formats (R11, RG11) always use the squared channel
/// difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(u8)]
pub enum ErrorMetric {
    /// Squared RGB difference, weighted by the alpha of the source pixel.
    ///
    /// Fully transparent pixels don't contribute any color error.
    Rgba = 0,
    /// Squared RGB difference. Alpha does not affect color error.
    Rgbx = 1,
    /// Squared difference in Rec. 709 luma and chroma, weighted by the alpha
    /// of the source pixel.
    Rec709 = 2,
    /// Squared RGB difference against the raw source values.
    ///
    /// Unlike all other metrics, source values outside `0..=1` are not clamped
    /// before comparing, so out of range values contribute their unavoidable
    /// error.
    Numeric = 3,
    /// Squared distance between normal vectors.
    ///
    /// RGB is interpreted as an XYZ vector mapped from `[-1, 1]` to `[0, 1]`.
    /// Source and decoded vectors are both normalized before comparing.
    NormalXyz = 4,

    /// An error metric code this crate does not know about.
    #[num_enum(catch_all)]
    Unknown(u8),
}

impl Default for ErrorMetric {
    fn default() -> Self {
        ErrorMetric::Rgba
    }
}

const REC709_LUMA: Vec3A = Vec3A::new(0.2126, 0.7152, 0.0722);
const REC709_CB_SCALE: f32 = 1.0 / 1.8556;
const REC709_CR_SCALE: f32 = 1.0 / 1.5748;

impl ErrorMetric {
    /// All known error metrics.
    pub const ALL: &'static [ErrorMetric] = &[
        ErrorMetric::Rgba,
        ErrorMetric::Rgbx,
        ErrorMetric::Rec709,
        ErrorMetric::Numeric,
        ErrorMetric::NormalXyz,
    ];

    pub const fn code(self) -> u8 {
        match self {
            ErrorMetric::Rgba => 0,
            ErrorMetric::Rgbx => 1,
            ErrorMetric::Rec709 => 2,
            ErrorMetric::Numeric => 3,
            ErrorMetric::NormalXyz => 4,
            ErrorMetric::Unknown(code) => code,
        }
    }

    pub const fn is_known(self) -> bool {
        !matches!(self, ErrorMetric::Unknown(_))
    }

    /// Turns a source pixel into the value the encoder compares against.
    ///
    /// NaN channels become 0. Alpha is always clamped to `0..=1`. Color is
    /// clamped too, except for [`ErrorMetric::Numeric`].
    pub(crate) fn prepare(self, pixel: Vec4) -> Vec4 {
        let pixel = Vec4::select(pixel.is_nan_mask(), Vec4::ZERO, pixel);
        let alpha = pixel.w.clamp(0.0, 1.0);
        let color = match self {
            ErrorMetric::Numeric => pixel.xyz(),
            _ => pixel.xyz().clamp(glam::Vec3::ZERO, glam::Vec3::ONE),
        };
        color.extend(alpha)
    }

    /// The error of the decoded color given a prepared source pixel.
    #[inline]
    pub(crate) fn color_error(self, source: Vec4, decoded: Vec3A) -> f32 {
        let target = Vec3A::from(source.xyz());
        match self {
            ErrorMetric::Rgba => {
                let d = (decoded - target) * source.w;
                d.length_squared()
            }
            ErrorMetric::Rgbx | ErrorMetric::Numeric | ErrorMetric::Unknown(_) => {
                (decoded - target).length_squared()
            }
            ErrorMetric::Rec709 => {
                let d = decoded - target;
                let dy = d.dot(REC709_LUMA);
                let dcb = (d.z - dy) * REC709_CB_SCALE;
                let dcr = (d.x - dy) * REC709_CR_SCALE;
                (dy * dy + dcb * dcb + dcr * dcr) * (source.w * source.w)
            }
            ErrorMetric::NormalXyz => {
                let source_normal = (target * 2.0 - Vec3A::ONE).normalize_or_zero();
                let decoded_normal = (decoded * 2.0 - Vec3A::ONE).normalize_or_zero();
                (decoded_normal - source_normal).length_squared()
            }
        }
    }
}
