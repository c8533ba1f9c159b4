use glam::Vec3A;

/// Expands a 4-bit channel to 8 bits.
#[inline(always)]
pub(crate) const fn expand4(c: u8) -> u8 {
    debug_assert!(c < 16);
    (c << 4) | c
}
/// Expands a 5-bit channel to 8 bits.
#[inline(always)]
pub(crate) const fn expand5(c: u8) -> u8 {
    debug_assert!(c < 32);
    (c << 3) | (c >> 2)
}
/// Expands a 6-bit channel to 8 bits.
#[inline(always)]
pub(crate) const fn expand6(c: u8) -> u8 {
    debug_assert!(c < 64);
    (c << 2) | (c >> 4)
}
/// Expands a 7-bit channel to 8 bits.
#[inline(always)]
pub(crate) const fn expand7(c: u8) -> u8 {
    debug_assert!(c < 128);
    (c << 1) | (c >> 6)
}

/// Quantizes a normalized value to the nearest `bits`-bit value.
#[inline]
pub(crate) fn quantize(value: f32, bits: u8) -> u8 {
    let max = ((1_u32 << bits) - 1) as f32;
    (value * max + 0.5).clamp(0.0, max) as u8
}
/// Quantizes a normalized color to the nearest `bits`-bit value per channel.
#[inline]
pub(crate) fn quantize3(color: Vec3A, bits: u8) -> [u8; 3] {
    [
        quantize(color.x, bits),
        quantize(color.y, bits),
        quantize(color.z, bits),
    ]
}

/// Converts an 8-bit color to a normalized color.
#[inline(always)]
pub(crate) fn to_vec3(c: [u8; 3]) -> Vec3A {
    Vec3A::new(c[0] as f32, c[1] as f32, c[2] as f32) / 255.0
}

/// The principal axis of a set of colors.
///
/// Used to split the colors of a block into two groups along the direction of
/// largest variance.
pub(crate) struct ColorLine3 {
    /// The centroid of the colors
    centroid: Vec3A,
    /// The normalized direction of the line
    d: Vec3A,
}
impl ColorLine3 {
    pub fn new(colors: &[Vec3A]) -> Self {
        fn mean(colors: &[Vec3A]) -> Vec3A {
            let mut mean = Vec3A::ZERO;
            for &color in colors {
                mean += color;
            }
            mean * (1. / colors.len() as f32)
        }
        fn covariance_matrix(colors: &[Vec3A], centroid: Vec3A) -> [Vec3A; 3] {
            let mut cov = [Vec3A::ZERO; 3];

            for &p in colors {
                let d = p - centroid;
                cov[0] += d * d.x;
                cov[1] += d * d.y;
                cov[2] += d * d.z;
            }

            let n_r = 1.0 / colors.len() as f32;
            cov[0] *= n_r;
            cov[1] *= n_r;
            cov[2] *= n_r;

            cov
        }
        fn largest_eigenvector(matrix: [Vec3A; 3]) -> Vec3A {
            // power iteration, starting from the gray axis
            let mut v = Vec3A::ONE;
            for _ in 0..4 {
                let r = matrix[0].dot(v);
                let g = matrix[1].dot(v);
                let b = matrix[2].dot(v);
                v = Vec3A::new(r, g, b).normalize_or_zero();
            }
            v
        }

        debug_assert!(!colors.is_empty());

        let centroid = mean(colors);
        let covariance = covariance_matrix(colors, centroid);
        let mut d = largest_eigenvector(covariance);
        if d == Vec3A::ZERO {
            // covariance is orthogonal to gray, fall back to the channel with
            // the largest variance
            let variance = Vec3A::new(covariance[0].x, covariance[1].y, covariance[2].z);
            d = if variance.x >= variance.y && variance.x >= variance.z {
                Vec3A::X
            } else if variance.y >= variance.z {
                Vec3A::Y
            } else {
                Vec3A::Z
            };
        }

        Self { centroid, d }
    }

    /// Projects the color onto the line and returns the parameter `t`.
    pub fn project(&self, color: Vec3A) -> f32 {
        (color - self.centroid).dot(self.d)
    }
}
