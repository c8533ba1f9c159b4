use std::time::{Duration, Instant};

use crate::progress::{sub_progress, ProgressRange, Report};
use crate::sorted::SortedTileList;
use crate::{EncodeError, EncodingStatus, ErrorMetric, Format, Image, Progress, Tile};

mod jobs;

/// The lowest effort. Only a single search step is performed per tile.
pub const MIN_EFFORT: f32 = 0.0;
/// The highest effort. Every tile is searched until it cannot improve.
pub const MAX_EFFORT: f32 = 100.0;
pub const DEFAULT_EFFORT: f32 = 40.0;
pub const DEFAULT_JOBS: usize = 8;
pub const MAX_JOBS: usize = 1024;

const FIRST_PASS_PROGRESS: ProgressRange = ProgressRange {
    start: 0.0,
    length: 0.3,
};
const REFINE_PROGRESS: ProgressRange = ProgressRange {
    start: 0.3,
    length: 0.6,
};
const FINALIZE_PROGRESS: ProgressRange = ProgressRange {
    start: 0.9,
    length: 0.1,
};

/// Options for encoding images.
///
/// ## See also
///
/// - [`encode`]
/// - [`Image::encode`]
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct EncodeOptions {
    /// The output format.
    ///
    /// Default: [`Format::SRGB8`]
    pub format: Format,
    /// The error metric minimized by the search.
    ///
    /// Default: [`ErrorMetric::Rgba`]
    pub error_metric: ErrorMetric,
    /// The compression effort in `MIN_EFFORT..=MAX_EFFORT`.
    ///
    /// The effort is the percentage of tiles that will be searched until they
    /// cannot improve any further. The remaining tiles keep a cheaper
    /// solution. The effort also limits how far the search of each tile
    /// goes. Values outside the range (and NaN) are clamped and reported with
    /// [`EncodingStatus::WARNING_EFFORT_OUT_OF_RANGE`].
    ///
    /// Default: [`DEFAULT_EFFORT`]
    pub effort: f32,
    /// The number of parallel jobs per phase.
    ///
    /// Values outside `1..=max_jobs` are clamped and reported with
    /// [`EncodingStatus::WARNING_JOBS_OUT_OF_RANGE`]. The number of jobs never
    /// affects the encoded data.
    ///
    /// Default: [`DEFAULT_JOBS`]
    pub jobs: usize,
    /// The upper limit for `jobs`. 0 is treated as 1.
    ///
    /// Default: [`MAX_JOBS`]
    pub max_jobs: usize,
}
impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            format: Format::SRGB8,
            error_metric: ErrorMetric::Rgba,
            effort: DEFAULT_EFFORT,
            jobs: DEFAULT_JOBS,
            max_jobs: MAX_JOBS,
        }
    }
}

/// The result of an encode call.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded {
    /// All warnings and errors of the call.
    pub status: EncodingStatus,
    /// One packed block per tile in row-major tile order. `None` if and only
    /// if `status` contains an error.
    pub data: Option<Vec<u8>>,
    /// The sum of all tile errors. 0 if nothing was encoded.
    pub error: f32,
    /// The time spent encoding.
    pub elapsed: Duration,
}
impl Encoded {
    fn failed(status: EncodingStatus, elapsed: Duration) -> Self {
        debug_assert!(status.is_error());
        Self {
            status,
            data: None,
            error: 0.0,
            elapsed,
        }
    }

    /// Returns the encoded data, or the first hard error of the status.
    ///
    /// Warnings are discarded.
    pub fn into_result(self) -> Result<Vec<u8>, EncodeError> {
        match EncodeError::from_status(self.status) {
            Some(error) => Err(error),
            None => Ok(self.data.unwrap_or_default()),
        }
    }
}

/// Encodes the given pixels.
///
/// `pixels` are unpremultiplied RGBA values in row-major order. The result
/// contains all warnings and errors. Hard errors are reported together with
/// the warning about a clamped effort, but without any data.
///
/// ## Panics
///
/// Panics if an allocation fails.
pub fn encode(pixels: &[[f32; 4]], width: u32, height: u32, options: &EncodeOptions) -> Encoded {
    encode_with_progress(pixels, width, height, options, None)
}

/// Same as [`encode`], but reports progress to the given reporter.
pub fn encode_with_progress(
    pixels: &[[f32; 4]],
    width: u32,
    height: u32,
    options: &EncodeOptions,
    progress: Option<&mut Progress>,
) -> Encoded {
    let start = Instant::now();

    match Image::new(pixels, width, height, options.format, options.error_metric) {
        Ok(mut image) => image.encode(options.effort, options.jobs, options.max_jobs, progress),
        Err(errors) => {
            // jobs are only validated once the image is known to be encodable
            let (_, effort_warning) = clamp_effort(options.effort);
            tracing::debug!(?errors, "invalid encode parameters");
            Encoded::failed(errors | effort_warning, start.elapsed())
        }
    }
}

impl Image<'_> {
    /// Searches for the best encoding of every tile and packs the result.
    ///
    /// Effort and jobs are clamped as described in [`EncodeOptions`].
    pub fn encode(
        &mut self,
        effort: f32,
        jobs: usize,
        max_jobs: usize,
        mut progress: Option<&mut Progress>,
    ) -> Encoded {
        let start = Instant::now();

        let (effort, effort_warning) = clamp_effort(effort);
        let Some(bit_format) = self.format().bit_format() else {
            return Encoded::failed(
                effort_warning | EncodingStatus::ERROR_UNKNOWN_FORMAT,
                start.elapsed(),
            );
        };

        let (jobs, jobs_warning) = clamp_jobs(jobs, max_jobs);
        let status = self.warnings() | effort_warning | jobs_warning;
        if !effort_warning.is_empty() || !jobs_warning.is_empty() {
            tracing::debug!(effort, jobs, "clamped encode parameters");
        }

        let tile_count = self.tiles.len();
        let jobs = jobs.min(tile_count).max(1);
        tracing::debug!(
            format = %self.format(),
            metric = ?self.error_metric(),
            width = self.width(),
            height = self.height(),
            tile_count,
            effort,
            jobs,
            "encoding image"
        );

        first_pass(&mut self.tiles, effort, jobs);
        progress.report(FIRST_PASS_PROGRESS.project(1.0));
        tracing::debug!(elapsed = ?start.elapsed(), "finished first pass");

        if effort > MIN_EFFORT {
            let mut list = SortedTileList::with_capacity(tile_count);
            for i in 0..tile_count {
                list.add(i);
            }
            let passes = refine(
                &mut self.tiles,
                &mut list,
                effort,
                jobs,
                sub_progress(&mut progress, REFINE_PROGRESS),
            );
            tracing::debug!(passes, elapsed = ?start.elapsed(), "finished refinement");
        }
        progress.report(REFINE_PROGRESS.project(1.0));

        let mut data = vec![0; tile_count * bit_format.bytes_per_block()];
        finalize(&self.tiles, &mut data, bit_format.bytes_per_block(), jobs);
        progress.report(FINALIZE_PROGRESS.project(1.0));

        let error = self.error();
        let elapsed = start.elapsed();
        tracing::debug!(error, ?elapsed, ?status, "encoded image");

        Encoded {
            status,
            data: Some(data),
            error,
            elapsed,
        }
    }
}

/// Clamps the effort to `MIN_EFFORT..=MAX_EFFORT`. NaN becomes the minimum.
fn clamp_effort(effort: f32) -> (f32, EncodingStatus) {
    if effort.is_nan() {
        (MIN_EFFORT, EncodingStatus::WARNING_EFFORT_OUT_OF_RANGE)
    } else if (MIN_EFFORT..=MAX_EFFORT).contains(&effort) {
        (effort, EncodingStatus::empty())
    } else {
        (
            effort.clamp(MIN_EFFORT, MAX_EFFORT),
            EncodingStatus::WARNING_EFFORT_OUT_OF_RANGE,
        )
    }
}

/// Clamps the number of jobs to `1..=max_jobs`.
fn clamp_jobs(jobs: usize, max_jobs: usize) -> (usize, EncodingStatus) {
    let max_jobs = max_jobs.max(1);
    if (1..=max_jobs).contains(&jobs) {
        (jobs, EncodingStatus::empty())
    } else {
        (
            jobs.clamp(1, max_jobs),
            EncodingStatus::WARNING_JOBS_OUT_OF_RANGE,
        )
    }
}

/// The number of tiles that must be done before refinement stops.
///
/// Computed in `f32` and rounded half away from zero. Which tiles get refined
/// depends on this count, so it must not change with the float width.
pub(crate) fn finished_target(effort: f32, tile_count: usize) -> usize {
    (0.01_f32 * effort * tile_count as f32).round() as usize
}

fn first_pass(tiles: &mut [Tile], effort: f32, jobs: usize) {
    jobs::run(jobs::partition(tiles.iter_mut(), jobs), |tile| {
        tile.iterate(effort)
    });
}

/// Iterates the worst tiles until enough tiles are done. Returns the number
/// of passes.
fn refine(
    tiles: &mut [Tile],
    list: &mut SortedTileList,
    effort: f32,
    jobs: usize,
    mut progress: Option<Progress>,
) -> usize {
    let tile_count = tiles.len();
    let target = finished_target(effort, tile_count);

    let mut passes = 0;
    loop {
        list.sort(tiles);
        let unfinished = list.unfinished_count();
        let finished = tile_count - unfinished;
        progress.report((finished as f32 / target.max(1) as f32).min(1.0));
        if finished >= target {
            return passes;
        }

        // finished < target <= tile_count, so some tiles are unfinished
        let budget = target - finished;
        let jobs = jobs.min(unfinished);
        tracing::trace!(pass = passes, unfinished, budget, jobs, "refinement pass");

        // every tile appears in the list exactly once, so each slot is taken
        // by at most one job
        let mut slots: Vec<Option<&mut Tile>> = tiles.iter_mut().map(Some).collect();
        let buckets: Vec<Vec<&mut Tile>> = (0..jobs)
            .map(|offset| {
                list.walk(offset, jobs, budget)
                    .filter_map(|i| slots[i].take())
                    .collect()
            })
            .collect();
        jobs::run(buckets, |tile| tile.iterate(effort));

        passes += 1;
    }
}

fn finalize(tiles: &[Tile], data: &mut [u8], bytes_per_block: usize, jobs: usize) {
    let blocks = data.chunks_exact_mut(bytes_per_block).zip(tiles);
    jobs::run(jobs::partition(blocks, jobs), |(out, tile)| {
        tile.write_bits(out)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effort_clamping() {
        assert_eq!(clamp_effort(40.0), (40.0, EncodingStatus::empty()));
        assert_eq!(clamp_effort(0.0), (0.0, EncodingStatus::empty()));
        assert_eq!(clamp_effort(100.0), (100.0, EncodingStatus::empty()));
        let warning = EncodingStatus::WARNING_EFFORT_OUT_OF_RANGE;
        assert_eq!(clamp_effort(-3.0), (0.0, warning));
        assert_eq!(clamp_effort(150.0), (100.0, warning));
        assert_eq!(clamp_effort(f32::NAN), (0.0, warning));
        assert_eq!(clamp_effort(f32::INFINITY), (100.0, warning));
    }

    #[test]
    fn jobs_clamping() {
        let warning = EncodingStatus::WARNING_JOBS_OUT_OF_RANGE;
        assert_eq!(clamp_jobs(4, 8), (4, EncodingStatus::empty()));
        assert_eq!(clamp_jobs(0, 8), (1, warning));
        assert_eq!(clamp_jobs(9, 8), (8, warning));
        assert_eq!(clamp_jobs(1, 0), (1, EncodingStatus::empty()));
        assert_eq!(clamp_jobs(2, 0), (1, warning));
    }

    #[test]
    fn finished_targets() {
        assert_eq!(finished_target(0.0, 37), 0);
        assert_eq!(finished_target(100.0, 37), 37);
        assert_eq!(finished_target(100.0, 1), 1);
        assert_eq!(finished_target(25.0, 10), 3);
        assert_eq!(finished_target(33.0, 10), 3);
        assert_eq!(finished_target(40.0, 7), 3);
        assert_eq!(finished_target(1.0, 49), 0);
        assert_eq!(finished_target(1.0, 51), 1);

        // single precision products just below or at a half
        assert_eq!(finished_target(2.5, 20), 0);
        assert_eq!(finished_target(2.5, 60), 1);
        assert_eq!(finished_target(2.5, 100), 2);
        assert_eq!(finished_target(0.9, 500), 5);
        assert_eq!(finished_target(1.8, 250), 5);
    }

    #[test]
    fn refinement_reaches_the_target() {
        let pixels: Vec<[f32; 4]> = (0..32 * 32)
            .map(|i| {
                let (x, y) = ((i % 32) as f32, (i / 32) as f32);
                [x / 31.0, y / 31.0, ((x * 7.0 + y * 3.0) % 11.0) / 10.0, 1.0]
            })
            .collect();

        for effort in [10.0, 55.5, 100.0] {
            let mut image = Image::new(&pixels, 32, 32, Format::RGB8, ErrorMetric::Rgba).unwrap();
            let encoded = image.encode(effort, 3, MAX_JOBS, None);
            assert!(!encoded.status.is_error());

            let done = image.tiles().iter().filter(|t| t.is_done()).count();
            assert!(done >= finished_target(effort, image.tiles().len()));
        }
    }
}
