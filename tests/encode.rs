use etcenc::*;
use util::{create_rng, options, round_trip};

mod util;

fn all_warnings_except(status: EncodingStatus, allowed: EncodingStatus) -> bool {
    (status.warnings() - allowed).is_empty()
}

#[test]
fn output_does_not_depend_on_jobs() {
    let mut rng = create_rng();
    let pixels = util::noisy_gradient(&mut rng, 37, 21, true);

    for &format in Format::ALL {
        let reference = encode(&pixels, 37, 21, &options(format, 50.0, 1));
        assert!(!reference.status.is_error());

        for jobs in [2, 7, 1000] {
            let encoded = encode(&pixels, 37, 21, &options(format, 50.0, jobs));
            assert_eq!(encoded.status, reference.status, "{format} with {jobs} jobs");
            assert_eq!(encoded.error, reference.error, "{format} with {jobs} jobs");
            assert_eq!(
                util::hash_hex(encoded.data.as_deref().unwrap()),
                util::hash_hex(reference.data.as_deref().unwrap()),
                "{format} with {jobs} jobs"
            );
        }
    }
}

#[test]
fn repeated_encodes_are_identical() {
    let mut rng = create_rng();
    let pixels = util::random(&mut rng, 16, 16);
    let options = options(Format::RGB8A1, 70.0, 4);

    let first = encode(&pixels, 16, 16, &options);
    let second = encode(&pixels, 16, 16, &options);
    assert_eq!(first.data, second.data);
    assert_eq!(first.status, second.status);
}

#[test]
fn output_size_and_layout() {
    let pixels = util::solid(12, 8, [0.5, 0.5, 0.5, 1.0]);
    for &format in Format::ALL {
        let data = encode(&pixels, 12, 8, &options(format, 10.0, 2))
            .into_result()
            .unwrap();
        let bytes_per_block = format.bit_format().unwrap().bytes_per_block();
        // 3x2 tiles
        assert_eq!(data.len(), 6 * bytes_per_block, "{format}");

        // all tiles have the same content, so all blocks are identical
        let first = &data[..bytes_per_block];
        assert!(data.chunks_exact(bytes_per_block).all(|b| b == first));
    }
}

#[test]
fn effort_is_clamped() {
    let pixels = util::solid(4, 4, [0.1, 0.2, 0.3, 1.0]);
    for effort in [-1.0, 100.5, f32::NAN, f32::NEG_INFINITY] {
        let encoded = encode(&pixels, 4, 4, &options(Format::RGB8, effort, 1));
        assert!(!encoded.status.is_error());
        assert!(encoded
            .status
            .contains(EncodingStatus::WARNING_EFFORT_OUT_OF_RANGE));
        assert_eq!(encoded.data.map(|d| d.len()), Some(8));
    }

    let encoded = encode(&pixels, 4, 4, &options(Format::RGB8, 100.0, 1));
    assert!(!encoded
        .status
        .contains(EncodingStatus::WARNING_EFFORT_OUT_OF_RANGE));
}

#[test]
fn jobs_are_clamped() {
    let pixels = util::solid(8, 8, [0.1, 0.2, 0.3, 1.0]);

    let mut opts = options(Format::RGB8, 40.0, 0);
    let encoded = encode(&pixels, 8, 8, &opts);
    assert!(!encoded.status.is_error());
    assert!(encoded.status.contains(EncodingStatus::WARNING_JOBS_OUT_OF_RANGE));
    assert_eq!(encoded.data.map(|d| d.len()), Some(4 * 8));

    opts.jobs = 9;
    opts.max_jobs = 8;
    let encoded = encode(&pixels, 8, 8, &opts);
    assert!(encoded.status.contains(EncodingStatus::WARNING_JOBS_OUT_OF_RANGE));
    assert!(encoded.data.is_some());

    // more jobs than tiles is fine
    opts.jobs = 8;
    let encoded = encode(&pixels, 8, 8, &opts);
    assert!(!encoded.status.contains(EncodingStatus::WARNING_JOBS_OUT_OF_RANGE));
}

#[test]
fn unknown_format_and_metric() {
    let pixels = util::solid(4, 4, [0.5; 4]);

    let encoded = encode(&pixels, 4, 4, &options(Format::from(200), 40.0, 1));
    assert_eq!(encoded.status, EncodingStatus::ERROR_UNKNOWN_FORMAT);
    assert_eq!(encoded.data, None);
    assert_eq!(encoded.into_result(), Err(EncodeError::UnknownFormat));

    let mut opts = options(Format::RGB8, 40.0, 1);
    opts.error_metric = ErrorMetric::from(77);
    let encoded = encode(&pixels, 4, 4, &opts);
    assert_eq!(encoded.status, EncodingStatus::ERROR_UNKNOWN_ERROR_METRIC);
    assert_eq!(encoded.data, None);
}

#[test]
fn errors_accumulate_with_parameter_warnings() {
    let mut opts = options(Format::from(0), 500.0, 0);
    opts.error_metric = ErrorMetric::from(5);
    let encoded = encode(&[], 0, 7, &opts);

    assert!(encoded.status.is_error());
    assert_eq!(
        encoded.status,
        EncodingStatus::ERROR_UNKNOWN_FORMAT
            | EncodingStatus::ERROR_UNKNOWN_ERROR_METRIC
            | EncodingStatus::ERROR_ZERO_WIDTH_OR_HEIGHT
            | EncodingStatus::WARNING_EFFORT_OUT_OF_RANGE
    );
    assert_eq!(encoded.data, None);
}

#[test]
fn invalid_format_has_no_jobs_warning() {
    let pixels = util::solid(4, 4, [0.5; 4]);
    let encoded = encode(&pixels, 4, 4, &options(Format::from(0), 40.0, 0));
    assert_eq!(encoded.status, EncodingStatus::ERROR_UNKNOWN_FORMAT);
    assert_eq!(encoded.data, None);
}

#[test]
fn source_too_small() {
    let pixels = util::solid(4, 3, [0.5; 4]);
    let encoded = encode(&pixels, 4, 4, &options(Format::RGBA8, 40.0, 1));
    assert_eq!(encoded.status, EncodingStatus::ERROR_SOURCE_SIZE_MISMATCH);
    assert_eq!(encoded.into_result(), Err(EncodeError::SourceSizeMismatch));

    // extra pixels are ignored
    let pixels = util::solid(5, 4, [0.5, 0.5, 0.5, 1.0]);
    assert!(!encode(&pixels, 4, 4, &options(Format::RGBA8, 40.0, 1))
        .status
        .is_error());
}

#[test]
fn partial_tiles_are_excluded_from_statistics() {
    let pixels = util::solid(5, 3, [0.25, 0.5, 0.75, 1.0]);

    let image = Image::new(&pixels, 5, 3, Format::RGBA8, ErrorMetric::Rgba).unwrap();
    assert_eq!(image.grid_size(), (2, 1));
    assert!(image.tiles().iter().all(|t| t.has_border_pixels()));
    assert!(image
        .tiles()
        .iter()
        .all(|t| t.alpha_mix() == AlphaMix::Opaque));

    let encoded = encode(&pixels, 5, 3, &options(Format::RGBA8, 40.0, 2));
    assert_eq!(encoded.status, EncodingStatus::WARNING_ALL_OPAQUE_PIXELS);
    assert_eq!(encoded.data.map(|d| d.len()), Some(2 * 16));
}

#[test]
fn solid_color_round_trip() {
    let color = [0.3, 0.6, 0.9, 1.0];
    let pixels = util::solid(12, 8, color);

    for format in [Format::RGBA8, Format::SRGBA8, Format::RGB8A1, Format::SRGB8A1] {
        let (encoded, decoded) = round_trip(&pixels, 12, 8, &options(format, 100.0, 3));

        assert!(encoded
            .status
            .contains(EncodingStatus::WARNING_ALL_OPAQUE_PIXELS));
        assert!(!encoded
            .status
            .contains(EncodingStatus::WARNING_SOME_TRANSLUCENT_PIXELS));
        assert!(all_warnings_except(
            encoded.status,
            EncodingStatus::WARNING_ALL_OPAQUE_PIXELS
        ));

        assert!(encoded.error < 0.01, "{format}: {}", encoded.error);
        assert!(util::max_difference(&pixels, &decoded) <= 3.0 / 255.0);
        assert!(decoded.iter().all(|p| p[3] == 1.0));
    }
}

#[test]
fn white_tile() {
    let pixels = util::solid(4, 4, [1.0; 4]);

    for format in [Format::ETC1, Format::RGB8, Format::SRGB8] {
        let (encoded, decoded) = round_trip(&pixels, 4, 4, &options(format, 100.0, 4));
        assert_eq!(encoded.data.as_ref().map(|d| d.len()), Some(8));
        assert!(encoded.status.warnings() == encoded.status);
        assert!(util::max_difference(&pixels, &decoded) <= 1.0 / 255.0);
    }
}

#[test]
fn minimum_effort_is_decodable() {
    let mut rng = create_rng();
    let pixels = util::noisy_gradient(&mut rng, 13, 9, true);

    for &format in Format::ALL {
        let (encoded, decoded) = round_trip(&pixels, 13, 9, &options(format, MIN_EFFORT, 3));
        assert_eq!(decoded.len(), 13 * 9);
        assert!(encoded.error.is_finite());
        assert!(decoded.iter().flatten().all(|c| (0.0..=1.0).contains(c)));
    }
}

#[test]
fn more_effort_is_not_worse() {
    let mut rng = create_rng();
    let pixels = util::noisy_gradient(&mut rng, 24, 24, true);

    for &format in Format::ALL {
        let low = encode(&pixels, 24, 24, &options(format, 0.0, 2));
        let mid = encode(&pixels, 24, 24, &options(format, 50.0, 2));
        let high = encode(&pixels, 24, 24, &options(format, 100.0, 2));
        assert!(mid.error <= low.error, "{format}");
        assert!(high.error <= mid.error, "{format}");
    }
}

#[test]
fn reported_error_is_the_sum_of_tile_errors() {
    let mut rng = create_rng();
    let pixels = util::random(&mut rng, 10, 10);

    let mut image = Image::new(&pixels, 10, 10, Format::RGBA8, ErrorMetric::Rec709).unwrap();
    let encoded = image.encode(30.0, 2, MAX_JOBS, None);
    let sum: f32 = image.tiles().iter().map(|t| t.error()).sum();
    assert_eq!(encoded.error, sum);
    assert_eq!(encoded.error, image.error());

    // the packed bits of every tile are part of the output
    let data = encoded.data.unwrap();
    for (tile, block) in image.tiles().iter().zip(data.chunks_exact(16)) {
        assert_eq!(tile.encoding_bits(), block);
    }
}

#[test]
fn maximum_effort_finishes_every_tile() {
    let mut rng = create_rng();
    let pixels = util::noisy_gradient(&mut rng, 16, 12, false);

    let mut image = Image::new(&pixels, 16, 12, Format::RGB8, ErrorMetric::Rgba).unwrap();
    image.encode(MAX_EFFORT, 3, MAX_JOBS, None);
    assert!(image.tiles().iter().all(|t| t.is_done()));
}

#[test]
fn cached_decode_matches_packed_bits() {
    let mut rng = create_rng();
    let pixels = util::random(&mut rng, 8, 8);

    for &format in Format::ALL {
        let mut image = Image::new(&pixels, 8, 8, format, ErrorMetric::Rgba).unwrap();
        image.encode(60.0, 1, MAX_JOBS, None);

        for tile in image.tiles() {
            let decoded = decode_block(format, &tile.encoding_bits()).unwrap();
            let colors = tile.decoded_colors();
            let alphas = tile.decoded_alphas();
            for i in 0..16 {
                // cached values are in vertical scan order
                let pixel = decoded[(i % 4) * 4 + i / 4];
                for c in 0..3 {
                    assert!((pixel[c] - colors[i][c]).abs() < 1e-6, "{format}");
                }
                assert!((pixel[3] - alphas[i]).abs() < 1e-6, "{format}");
            }
        }
    }
}

#[test]
fn content_warnings_depend_on_format() {
    let pixels = util::solid(4, 4, [0.2, 0.4, 0.6, 1.0]);

    let status = encode(&pixels, 4, 4, &options(Format::R11, 0.0, 1)).status;
    assert_eq!(
        status,
        EncodingStatus::WARNING_SOME_BLUE_VALUES_ARE_NOT_ZERO
            | EncodingStatus::WARNING_SOME_GREEN_VALUES_ARE_NOT_ZERO
    );
    let status = encode(&pixels, 4, 4, &options(Format::SIGNED_RG11, 0.0, 1)).status;
    assert_eq!(status, EncodingStatus::WARNING_SOME_BLUE_VALUES_ARE_NOT_ZERO);
    let status = encode(&pixels, 4, 4, &options(Format::ETC1, 0.0, 1)).status;
    assert_eq!(status, EncodingStatus::empty());

    let translucent = util::solid(4, 4, [0.2, 0.4, 0.6, 0.5]);
    let status = encode(&translucent, 4, 4, &options(Format::RGB8, 0.0, 1)).status;
    assert_eq!(
        status,
        EncodingStatus::WARNING_SOME_NON_OPAQUE_PIXELS
            | EncodingStatus::WARNING_SOME_TRANSLUCENT_PIXELS
    );
    let status = encode(&translucent, 4, 4, &options(Format::RGBA8, 0.0, 1)).status;
    assert_eq!(status, EncodingStatus::empty());
}

#[test]
fn transparent_and_out_of_range_warnings() {
    let transparent = util::solid(6, 6, [0.5, 0.5, 0.5, 0.0]);
    let mut out_of_range = util::solid(6, 6, [0.5, 0.5, 0.5, 1.0]);
    out_of_range[7] = [1.5, 0.5, f32::NAN, 1.0];

    for &format in Format::ALL {
        let status = encode(&transparent, 6, 6, &options(format, 0.0, 1)).status;
        assert!(status.contains(EncodingStatus::WARNING_ALL_TRANSPARENT_PIXELS));
        let status = encode(&out_of_range, 6, 6, &options(format, 0.0, 1)).status;
        assert!(status.contains(EncodingStatus::WARNING_SOME_RGBA_NOT_0_TO_1));
        assert!(!status.is_error());
    }
}

#[test]
fn punch_through_alpha() {
    let mut pixels = util::solid(4, 4, [0.8, 0.4, 0.2, 1.0]);
    for p in pixels.iter_mut().step_by(3) {
        p[3] = 0.0;
    }

    let (encoded, decoded) = round_trip(&pixels, 4, 4, &options(Format::RGB8A1, 100.0, 1));
    // not a concern for 1-bit alpha, as long as nothing is translucent
    assert_eq!(encoded.status, EncodingStatus::empty());
    for (source, decoded) in pixels.iter().zip(&decoded) {
        if source[3] == 0.0 {
            assert_eq!(*decoded, [0.0; 4]);
        } else {
            assert_eq!(decoded[3], 1.0);
            assert!((decoded[0] - source[0]).abs() <= 8.0 / 255.0);
        }
    }

    let image = Image::new(&pixels, 4, 4, Format::RGB8A1, ErrorMetric::Rgba).unwrap();
    assert!(image.tiles()[0].has_punch_through_pixels());
    assert_eq!(image.tiles()[0].alpha_mix(), AlphaMix::Translucent);
}

#[test]
fn signed_channels() {
    let pixels: Vec<[f32; 4]> = (0..16)
        .map(|i| {
            let t = i as f32 / 15.0;
            [0.4 + 0.2 * t, 0.6 - 0.2 * t, 0.0, 1.0]
        })
        .collect();

    for format in [Format::RG11, Format::SIGNED_RG11] {
        let (_, decoded) = round_trip(&pixels, 4, 4, &options(format, 100.0, 1));
        for (source, decoded) in pixels.iter().zip(&decoded) {
            assert!((source[0] - decoded[0]).abs() < 0.05, "{format}");
            assert!((source[1] - decoded[1]).abs() < 0.05, "{format}");
            assert_eq!(decoded[2..], [0.0, 1.0]);
        }
    }
}

#[test]
fn gradients_have_low_error() {
    let mut rng = create_rng();
    let pixels = util::noisy_gradient(&mut rng, 32, 32, false);

    for format in [Format::ETC1, Format::RGB8, Format::RGBA8] {
        let (_, decoded) = round_trip(&pixels, 32, 32, &options(format, 60.0, 4));
        let mse: f32 = pixels
            .iter()
            .zip(&decoded)
            .flat_map(|(a, b)| (0..3).map(move |c| (a[c] - b[c]).powi(2)))
            .sum::<f32>()
            / (pixels.len() * 3) as f32;
        assert!(mse.sqrt() < 0.08, "{format}: {}", mse.sqrt());
    }
}
