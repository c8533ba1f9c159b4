#![no_main]

use etcenc::*;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let [format, effort, width, height, rest @ ..] = data else {
        return;
    };
    let format = Format::from(*format % 12);
    let (width, height) = ((*width % 16) as u32, (*height % 16) as u32);

    let pixels: Vec<[f32; 4]> = rest
        .chunks_exact(4)
        .map(|c| [c[0], c[1], c[2], c[3]].map(|v| v as f32 / 255.0))
        .collect();

    let mut options = EncodeOptions::default();
    options.format = format;
    options.effort = *effort as f32 / 2.0;
    options.jobs = 3;

    let encoded = encode(&pixels, width, height, &options);
    let valid = format.bit_format().is_some()
        && width > 0
        && height > 0
        && pixels.len() >= (width * height) as usize;
    assert_eq!(encoded.status.is_error(), !valid);

    if let Some(data) = encoded.data {
        let bytes_per_block = format.bit_format().expect("known format").bytes_per_block();
        let tiles = (width.div_ceil(4) * height.div_ceil(4)) as usize;
        assert_eq!(data.len(), tiles * bytes_per_block);
        let decoded = decode(format, &data, width, height).expect("decodable");
        assert_eq!(decoded.len(), (width * height) as usize);
    }
});
