#![no_main]

use etcenc::*;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Just no panic
    let Some((&code, blocks)) = data.split_first() else {
        return;
    };
    let format = Format::from(code);
    let Some(bit_format) = format.bit_format() else {
        return;
    };

    for block in blocks.chunks_exact(bit_format.bytes_per_block()) {
        let pixels = decode_block(format, block).expect("valid block size");
        assert!(pixels.iter().flatten().all(|c| (0.0..=1.0).contains(c)));
    }
});
