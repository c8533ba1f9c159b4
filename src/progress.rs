pub(crate) trait Report {
    fn report(&mut self, progress: f32);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ProgressRange {
    pub start: f32,
    pub length: f32,
}
impl ProgressRange {
    pub const FULL: Self = Self {
        start: 0.0,
        length: 1.0,
    };

    pub fn sub_range(&self, other: Self) -> Self {
        Self {
            start: self.start + other.start * self.length,
            length: other.length * self.length,
        }
    }

    pub fn project(&self, progress: f32) -> f32 {
        debug_assert!((0.0..=1.0).contains(&progress));
        self.start + self.length * progress
    }
}

/// A progress reporter used by [`encode_with_progress()`](crate::encode_with_progress())
/// and [`Image::encode`](crate::Image::encode).
///
/// This structure is just a wrapper around a function that handles progress
/// reports. A progress report is a single `f32` value between 0 to 1
/// representing the percentage of the task that has been completed.
///
/// Reports are made between the phases of an encode and after every
/// refinement pass, always from the thread that called the encoder. Worker
/// threads never report, so the function does not need to be thread-safe.
///
/// Reports are guaranteed to only increase or stay the same. In particular,
/// there may be multiple reports for 100%.
pub struct Progress<'a> {
    reporter: &'a mut dyn FnMut(f32),
    range: ProgressRange,
}
impl<'a> Progress<'a> {
    /// Creates a new progress reporter.
    pub fn new<F: FnMut(f32)>(reporter: &'a mut F) -> Self {
        Self {
            reporter,
            range: ProgressRange::FULL,
        }
    }

    /// Calls the underlying reporter function with the given progress.
    ///
    /// ### Panics
    ///
    /// If the function is called with a value outside the range of `0.0..=1.0`,
    /// the function will panic **if debug assertions are enabled**.
    ///
    /// The underlying reporter may also panic.
    pub fn report(&mut self, progress: f32) {
        let progress = self.range.project(progress);
        (self.reporter)(progress);
    }

    pub(crate) fn sub_range(&mut self, range: ProgressRange) -> Progress<'_> {
        Progress {
            reporter: &mut *self.reporter,
            range: self.range.sub_range(range),
        }
    }
}
impl Report for Progress<'_> {
    fn report(&mut self, progress: f32) {
        self.report(progress);
    }
}
impl Report for Option<&mut Progress<'_>> {
    fn report(&mut self, progress: f32) {
        if let Some(reporter) = self {
            reporter.report(progress);
        }
    }
}
impl Report for Option<Progress<'_>> {
    fn report(&mut self, progress: f32) {
        if let Some(reporter) = self {
            reporter.report(progress);
        }
    }
}

pub(crate) fn sub_progress<'a>(
    progress: &'a mut Option<&mut Progress>,
    range: ProgressRange,
) -> Option<Progress<'a>> {
    progress.as_mut().map(|progress| progress.sub_range(range))
}
