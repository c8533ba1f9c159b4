#![allow(unused)]

use etcenc::*;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

pub fn create_rng() -> impl Rng {
    rand_chacha::ChaChaRng::seed_from_u64(123456789)
}

pub fn hash_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let bytes: [u8; 32] = result.into();

    let mut hex = String::new();
    for byte in bytes.iter() {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

/// An image with every pixel set to the same value.
pub fn solid(width: u32, height: u32, pixel: [f32; 4]) -> Vec<[f32; 4]> {
    vec![pixel; width as usize * height as usize]
}

/// A smooth image with some noise on top. Alpha is 1 unless `alpha` is set,
/// in which case it varies over the whole range.
pub fn noisy_gradient(rng: &mut impl Rng, width: u32, height: u32, alpha: bool) -> Vec<[f32; 4]> {
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        for x in 0..width {
            let u = x as f32 / width.max(2) as f32;
            let v = y as f32 / height.max(2) as f32;
            let mut noise = || rng.gen_range(-0.05..0.05);
            let a = if alpha {
                (u * v + noise()).clamp(0.0, 1.0)
            } else {
                1.0
            };
            pixels.push([
                (u + noise()).clamp(0.0, 1.0),
                (v + noise()).clamp(0.0, 1.0),
                (0.5 * (u + v) + noise()).clamp(0.0, 1.0),
                a,
            ]);
        }
    }
    pixels
}

/// Uniformly random pixels in `0..=1`.
pub fn random(rng: &mut impl Rng, width: u32, height: u32) -> Vec<[f32; 4]> {
    (0..width as usize * height as usize)
        .map(|_| rng.gen::<[f32; 4]>())
        .collect()
}

pub fn options(format: Format, effort: f32, jobs: usize) -> EncodeOptions {
    let mut options = EncodeOptions::default();
    options.format = format;
    options.effort = effort;
    options.jobs = jobs;
    options
}

/// The largest absolute difference of any channel.
pub fn max_difference(a: &[[f32; 4]], b: &[[f32; 4]]) -> f32 {
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .flat_map(|(a, b)| a.iter().zip(b).map(|(a, b)| (a - b).abs()))
        .fold(0.0, f32::max)
}

/// Encodes and decodes the image, panicking on hard errors.
pub fn round_trip(
    pixels: &[[f32; 4]],
    width: u32,
    height: u32,
    options: &EncodeOptions,
) -> (Encoded, Vec<[f32; 4]>) {
    let encoded = encode(pixels, width, height, options);
    assert!(!encoded.status.is_error(), "{:?}", encoded.status);
    let data = encoded.data.as_ref().expect("no data");
    let decoded = decode(options.format, data, width, height).expect("cannot decode");
    (encoded, decoded)
}
