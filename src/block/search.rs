//! Effort-gated search for ETC1/ETC2 color blocks.

use glam::{Mat3, Vec3, Vec3A, Vec4, Vec4Swizzles};

use super::etc::*;
use crate::color::{expand4, expand5, quantize3, to_vec3, ColorLine3};
use crate::ErrorMetric;

/// The block modes a search may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ColorModes {
    pub individual: bool,
    /// T and H modes.
    pub t_and_h: bool,
    pub planar: bool,
    /// Whether the block is opaque. Non-opaque blocks reserve selector 2 for
    /// transparent pixels.
    pub opaque: bool,
}
impl ColorModes {
    pub const ETC1: Self = Self {
        individual: true,
        t_and_h: false,
        planar: false,
        opaque: true,
    };
    pub const ETC2: Self = Self {
        individual: true,
        t_and_h: true,
        planar: true,
        opaque: true,
    };
    /// Punch-through blocks without transparent pixels.
    pub const PUNCH_THROUGH_OPAQUE: Self = Self {
        individual: false,
        t_and_h: true,
        planar: true,
        opaque: true,
    };
    /// Punch-through blocks with at least one transparent pixel.
    pub const PUNCH_THROUGH_TRANSPARENT: Self = Self {
        individual: false,
        t_and_h: true,
        planar: false,
        opaque: false,
    };
}

#[derive(Debug, Clone, Copy)]
enum FlipChoice {
    /// The orientation of the current best block.
    Best,
    Other,
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Radius(u8, FlipChoice),
    Planar,
    TAndH,
    Refine,
}

const ETC1_STEPS: &[Step] = &[
    Step::Radius(1, FlipChoice::Best),
    Step::Radius(1, FlipChoice::Other),
    Step::Radius(2, FlipChoice::Best),
    Step::Radius(2, FlipChoice::Other),
    Step::Refine,
];
const ETC2_STEPS: &[Step] = &[
    Step::Radius(1, FlipChoice::Best),
    Step::Planar,
    Step::Radius(1, FlipChoice::Other),
    Step::TAndH,
    Step::Radius(2, FlipChoice::Best),
    Step::Radius(2, FlipChoice::Other),
    Step::Refine,
];

/// Search state of one ETC color block.
#[derive(Debug, Clone)]
pub(crate) struct ColorSearch {
    metric: ErrorMetric,
    modes: ColorModes,
    /// Prepared source pixels.
    pixels: [Vec4; 16],
    /// Pixels whose color contributes to the error.
    active: u16,
    /// Pixels that must use the transparent selector.
    transparent: u16,

    best: EtcBlock,
    decoded: [PaletteColor; 16],
    error: f32,

    step: usize,
    done: bool,
}

impl ColorSearch {
    /// Creates a new search and seeds it with a cheap initial block.
    ///
    /// `active` and `transparent` must be disjoint. Transparent pixels are
    /// only allowed if `modes` is not opaque.
    pub fn new(
        metric: ErrorMetric,
        modes: ColorModes,
        pixels: [Vec4; 16],
        active: u16,
        transparent: u16,
    ) -> Self {
        debug_assert!(active & transparent == 0);
        debug_assert!(transparent == 0 || !modes.opaque);

        let mut search = Self {
            metric,
            modes,
            pixels,
            active,
            transparent,
            best: EtcBlock::Planar {
                origin: [0; 3],
                horizontal: [0; 3],
                vertical: [0; 3],
            },
            decoded: [None; 16],
            error: f32::INFINITY,
            step: 0,
            done: false,
        };

        for flip in [false, true] {
            search.search_sub_blocks(flip, 0);
        }
        if search.error == 0.0 {
            search.done = true;
        }

        search
    }

    fn steps(&self) -> &'static [Step] {
        if self.modes.t_and_h || self.modes.planar {
            ETC2_STEPS
        } else {
            ETC1_STEPS
        }
    }

    pub fn iterate(&mut self, effort: f32) {
        if self.done {
            return;
        }

        let steps = self.steps();
        match steps[self.step] {
            Step::Radius(radius, choice) => {
                let best_flip = self.best.flip().unwrap_or(false);
                let flip = match choice {
                    FlipChoice::Best => best_flip,
                    FlipChoice::Other => !best_flip,
                };
                self.search_sub_blocks(flip, radius);
            }
            Step::Planar => self.search_planar(),
            Step::TAndH => self.search_t_and_h(),
            Step::Refine => self.refine(),
        }

        self.step += 1;
        self.done = self.error == 0.0
            || self.step >= steps.len()
            || effort < super::effort_cutoff(self.step, steps.len());
    }

    pub fn error(&self) -> f32 {
        self.error
    }
    pub fn is_done(&self) -> bool {
        self.done
    }
    pub fn block(&self) -> &EtcBlock {
        &self.best
    }
    pub fn decoded(&self) -> &[PaletteColor; 16] {
        &self.decoded
    }
    pub fn opaque(&self) -> bool {
        self.modes.opaque
    }

    /// Decodes the block and keeps it if it is strictly better.
    fn consider(&mut self, block: EtcBlock) {
        let decoded = block.decode(self.modes.opaque);
        let mut error = 0.0;
        for (i, decoded) in decoded.iter().enumerate() {
            if self.active & (1 << i) != 0 {
                let color = decoded.map(to_vec3).unwrap_or(Vec3A::ZERO);
                error += self.metric.color_error(self.pixels[i], color);
            }
        }

        if error < self.error {
            self.best = block;
            self.decoded = decoded;
            self.error = error;
        }
    }

    /// The error of the given pixels when each one picks its best palette
    /// entry. Stops early once `limit` is reached.
    fn palette_error(&self, mask: u16, palette: &Palette, limit: f32) -> f32 {
        let colors = palette.map(|c| c.map(to_vec3));
        let mut total = 0.0;
        for i in 0..16 {
            if mask & self.active & (1 << i) == 0 {
                continue;
            }
            let source = self.pixels[i];
            let mut best = f32::INFINITY;
            for &color in colors.iter().flatten() {
                best = best.min(self.metric.color_error(source, color));
            }
            total += best;
            if total >= limit {
                break;
            }
        }
        total
    }

    fn assign_selectors(&self, mask: u16, palette: &Palette, selectors: &mut [u8; 16]) {
        let colors = palette.map(|c| c.map(to_vec3));
        for i in 0..16 {
            if mask & (1 << i) == 0 {
                continue;
            }
            selectors[i] = if self.transparent & (1 << i) != 0 {
                TRANSPARENT_SELECTOR
            } else if self.active & (1 << i) != 0 {
                let source = self.pixels[i];
                let mut best = (f32::INFINITY, 0);
                for (s, color) in colors.iter().enumerate() {
                    if let Some(color) = color {
                        let e = self.metric.color_error(source, *color);
                        if e < best.0 {
                            best = (e, s as u8);
                        }
                    }
                }
                best.1
            } else {
                0
            };
        }
    }

    /// Returns the best table of a sub-block and its error.
    fn fit_sub_block(&self, mask: u16, base: [u8; 3]) -> (f32, u8) {
        let mut best = (f32::INFINITY, 0);
        for table in 0..8 {
            let palette = etc1_palette(base, table, self.modes.opaque);
            let error = self.palette_error(mask, &palette, best.0);
            if error < best.0 {
                best = (error, table);
            }
        }
        best
    }

    /// Picks the best tables (for individual and differential blocks) and
    /// selectors of the block.
    fn fit_block(&self, block: &mut EtcBlock) {
        if let (Some(flip), Some(colors)) = (block.flip(), block.sub_block_colors()) {
            let fitted =
                [0_usize, 1].map(|half| self.fit_sub_block(half_mask(flip, half), colors[half]).1);
            if let EtcBlock::Individual { tables, .. } | EtcBlock::Differential { tables, .. } = block
            {
                *tables = fitted;
            }
        }

        let mut selectors = [0; 16];
        block.for_each_palette(self.modes.opaque, |mask, palette| {
            self.assign_selectors(mask, &palette, &mut selectors)
        });
        if let Some(s) = block.selectors_mut() {
            *s = selectors;
        }
    }

    fn fit_and_consider(&mut self, mut block: EtcBlock) {
        self.fit_block(&mut block);
        self.consider(block);
    }

    /// The average color of the active pixels of a sub-block.
    fn mean_color(&self, mask: u16) -> Vec3A {
        let mut sum = Vec3A::ZERO;
        let mut count = 0;
        for i in 0..16 {
            if mask & self.active & (1 << i) != 0 {
                sum += Vec3A::from(self.pixels[i].xyz());
                count += 1;
            }
        }
        if count > 0 {
            sum / count as f32
        } else if mask != 0xFFFF {
            self.mean_color(0xFFFF)
        } else {
            Vec3A::ZERO
        }
    }

    /// Searches individual and differential blocks with the given flip.
    ///
    /// Base colors are searched within `radius` of the quantized averages of
    /// each sub-block.
    fn search_sub_blocks(&mut self, flip: bool, radius: u8) {
        let masks = [half_mask(flip, 0), half_mask(flip, 1)];
        let means = masks.map(|mask| self.mean_color(mask));

        if self.modes.individual {
            let colors = [0_usize, 1].map(|half| {
                let center = quantize3(means[half], 4);
                let mut best = (f32::INFINITY, center);
                for c in cube(center, radius, 15) {
                    let (error, _) = self.fit_sub_block(masks[half], c.map(expand4));
                    if error < best.0 {
                        best = (error, c);
                    }
                }
                best.1
            });
            self.fit_and_consider(EtcBlock::Individual {
                flip,
                colors,
                tables: [0; 2],
                selectors: [0; 16],
            });
        }

        // every candidate base color of each sub-block with its error
        let centers = means.map(|mean| quantize3(mean, 5));
        let candidates: [Vec<([u8; 3], f32)>; 2] = [0_usize, 1].map(|half| {
            cube(centers[half], radius, 31)
                .map(|c| (c, self.fit_sub_block(masks[half], c.map(expand5)).0))
                .collect()
        });

        let mut best: Option<(f32, [u8; 3], [u8; 3])> = None;
        for &(a, error_a) in &candidates[0] {
            for &(b, error_b) in &candidates[1] {
                let error = error_a + error_b;
                if delta_is_valid(a, b) && best.map_or(true, |(e, _, _)| error < e) {
                    best = Some((error, a, b));
                }
            }
        }
        let (base, second) = match best {
            Some((_, a, b)) => (a, b),
            None => {
                // no valid pair, move the second color towards the first one
                let first = candidates[0]
                    .iter()
                    .min_by(|x, y| x.1.total_cmp(&y.1))
                    .map_or(centers[0], |c| c.0);
                let second = std::array::from_fn(|i| {
                    (centers[1][i] as i16).clamp(first[i] as i16 - 4, first[i] as i16 + 3) as u8
                });
                (first, second)
            }
        };
        self.fit_and_consider(EtcBlock::Differential {
            flip,
            base,
            delta: std::array::from_fn(|i| second[i] as i8 - base[i] as i8),
            tables: [0; 2],
            selectors: [0; 16],
        });
    }

    /// Splits the pixels into two groups along the principal axis and tries T
    /// and H blocks for every split.
    fn search_t_and_h(&mut self) {
        if !self.modes.t_and_h {
            return;
        }

        let indices: Vec<usize> = (0..16).filter(|i| self.active & (1 << i) != 0).collect();
        if indices.len() < 2 {
            return;
        }
        let colors: Vec<Vec3A> = indices
            .iter()
            .map(|&i| Vec3A::from(self.pixels[i].xyz()))
            .collect();
        let line = ColorLine3::new(&colors);
        let mut sorted = colors.clone();
        sorted.sort_by(|a, b| line.project(*a).total_cmp(&line.project(*b)));

        let total: Vec3A = sorted.iter().copied().sum();
        let opaque = self.modes.opaque;
        let mut best_t: Option<(f32, EtcBlock)> = None;
        let mut best_h: Option<(f32, EtcBlock)> = None;

        let mut prefix = Vec3A::ZERO;
        for k in 1..sorted.len() {
            prefix += sorted[k - 1];
            let low = quantize3(prefix / k as f32, 4);
            let high = quantize3((total - prefix) / (sorted.len() - k) as f32, 4);

            for colors in [[low, high], [high, low]] {
                for distance in 0..8 {
                    let limit = best_t.map_or(f32::INFINITY, |b| b.0);
                    let error = self.palette_error(0xFFFF, &t_palette(colors, distance, opaque), limit);
                    if error < limit {
                        best_t = Some((
                            error,
                            EtcBlock::T {
                                colors,
                                distance,
                                selectors: [0; 16],
                            },
                        ));
                    }

                    if h_distance_is_valid(colors, distance) {
                        let limit = best_h.map_or(f32::INFINITY, |b| b.0);
                        let error =
                            self.palette_error(0xFFFF, &h_palette(colors, distance, opaque), limit);
                        if error < limit {
                            best_h = Some((
                                error,
                                EtcBlock::H {
                                    colors,
                                    distance,
                                    selectors: [0; 16],
                                },
                            ));
                        }
                    }
                }
            }
        }

        for (_, block) in best_t.into_iter().chain(best_h) {
            self.fit_and_consider(block);
        }
    }

    /// Fits a plane through each channel with least squares.
    fn search_planar(&mut self) {
        if !self.modes.planar {
            return;
        }

        let mut n = 0.0;
        let (mut sx, mut sy, mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0, 0.0, 0.0);
        let mut sums = [Vec3::ZERO; 3];
        for i in 0..16 {
            if self.active & (1 << i) == 0 {
                continue;
            }
            let (x, y) = ((i / 4) as f32, (i % 4) as f32);
            n += 1.0;
            sx += x;
            sy += y;
            sxx += x * x;
            sxy += x * y;
            syy += y * y;
            let row = Vec3::new(1.0, x, y);
            let pixel = self.pixels[i];
            sums[0] += row * pixel.x;
            sums[1] += row * pixel.y;
            sums[2] += row * pixel.z;
        }
        if n == 0.0 {
            return;
        }

        let normal = Mat3::from_cols(
            Vec3::new(n, sx, sy),
            Vec3::new(sx, sxx, sxy),
            Vec3::new(sy, sxy, syy),
        );
        let planes: [Vec3; 3] = if normal.determinant().abs() > 1e-3 {
            let inverse = normal.inverse();
            sums.map(|s| inverse * s)
        } else {
            // not enough pixels to fit a plane, use a flat color
            sums.map(|s| Vec3::new(s.x / n, 0.0, 0.0))
        };

        let bits = [6, 7, 6];
        let quantize = |value: f32, c: usize| crate::color::quantize(value, bits[c]);
        let origin = std::array::from_fn(|c| quantize(planes[c].x, c));
        let horizontal = std::array::from_fn(|c| quantize(planes[c].x + 4.0 * planes[c].y, c));
        let vertical = std::array::from_fn(|c| quantize(planes[c].x + 4.0 * planes[c].z, c));

        self.consider(EtcBlock::Planar {
            origin,
            horizontal,
            vertical,
        });
    }

    /// Coordinate descent around the current best block.
    fn refine(&mut self) {
        for _ in 0..4 {
            let before = self.error;
            for candidate in neighbors(&self.best, self.modes) {
                self.fit_and_consider(candidate);
            }
            if self.error >= before {
                break;
            }
        }
    }
}

fn delta_is_valid(a: [u8; 3], b: [u8; 3]) -> bool {
    (0..3).all(|i| (-4..=3).contains(&(b[i] as i16 - a[i] as i16)))
}

/// All colors within `radius` of `center` with channels in `0..=max`.
fn cube(center: [u8; 3], radius: u8, max: u8) -> impl Iterator<Item = [u8; 3]> {
    let range = move |c: u8| c.saturating_sub(radius)..=c.saturating_add(radius).min(max);
    range(center[0]).flat_map(move |r| {
        range(center[1]).flat_map(move |g| range(center[2]).map(move |b| [r, g, b]))
    })
}

/// Blocks that differ from `block` by one step in one parameter.
fn neighbors(block: &EtcBlock, modes: ColorModes) -> Vec<EtcBlock> {
    fn step(value: u8, delta: i8, max: u8) -> Option<u8> {
        let v = value as i16 + delta as i16;
        (0..=max as i16).contains(&v).then_some(v as u8)
    }

    let mut out = Vec::new();
    match *block {
        EtcBlock::Individual {
            flip,
            colors,
            tables,
            selectors,
        } => {
            for half in 0..2 {
                for c in 0..3 {
                    for delta in [-1, 1] {
                        if let Some(v) = step(colors[half][c], delta, 15) {
                            let mut colors = colors;
                            colors[half][c] = v;
                            out.push(EtcBlock::Individual {
                                flip,
                                colors,
                                tables,
                                selectors,
                            });
                        }
                    }
                }
            }
        }
        EtcBlock::Differential {
            flip,
            base,
            delta,
            tables,
            selectors,
        } => {
            for c in 0..3 {
                for d in [-1, 1] {
                    // move the base color, keeping the second color
                    if let Some(v) = step(base[c], d, 31) {
                        let second = base[c] as i8 + delta[c];
                        let new_delta = second - v as i8;
                        if (-4..=3).contains(&new_delta) {
                            let (mut base, mut delta) = (base, delta);
                            base[c] = v;
                            delta[c] = new_delta;
                            out.push(EtcBlock::Differential {
                                flip,
                                base,
                                delta,
                                tables,
                                selectors,
                            });
                        }
                    }
                    // move the second color
                    let new_delta = delta[c] + d;
                    let second = base[c] as i8 + new_delta;
                    if (-4..=3).contains(&new_delta) && (0..32).contains(&second) {
                        let mut delta = delta;
                        delta[c] = new_delta;
                        out.push(EtcBlock::Differential {
                            flip,
                            base,
                            delta,
                            tables,
                            selectors,
                        });
                    }
                }
            }
        }
        EtcBlock::T {
            colors,
            distance,
            selectors,
        }
        | EtcBlock::H {
            colors,
            distance,
            selectors,
        } => {
            let is_t = matches!(block, EtcBlock::T { .. });
            let make = |colors: [[u8; 3]; 2], distance: u8| {
                if is_t {
                    Some(EtcBlock::T {
                        colors,
                        distance,
                        selectors,
                    })
                } else if h_distance_is_valid(colors, distance) {
                    Some(EtcBlock::H {
                        colors,
                        distance,
                        selectors,
                    })
                } else {
                    None
                }
            };

            for half in 0..2 {
                for c in 0..3 {
                    for delta in [-1, 1] {
                        if let Some(v) = step(colors[half][c], delta, 15) {
                            let mut colors = colors;
                            colors[half][c] = v;
                            out.extend(make(colors, distance));
                            // H blocks may need the neighboring distance
                            if !is_t {
                                out.extend(make(colors, distance ^ 1));
                            }
                        }
                    }
                }
            }
            for delta in [-1, 1] {
                if let Some(d) = step(distance, delta, 7) {
                    out.extend(make(colors, d));
                }
            }
        }
        EtcBlock::Planar {
            origin,
            horizontal,
            vertical,
        } => {
            if modes.planar {
                let max = [63, 127, 63];
                for c in 0..3 {
                    for delta in [-1, 1] {
                        if let Some(v) = step(origin[c], delta, max[c]) {
                            let mut origin = origin;
                            origin[c] = v;
                            out.push(EtcBlock::Planar {
                                origin,
                                horizontal,
                                vertical,
                            });
                        }
                        if let Some(v) = step(horizontal[c], delta, max[c]) {
                            let mut horizontal = horizontal;
                            horizontal[c] = v;
                            out.push(EtcBlock::Planar {
                                origin,
                                horizontal,
                                vertical,
                            });
                        }
                        if let Some(v) = step(vertical[c], delta, max[c]) {
                            let mut vertical = vertical;
                            vertical[c] = v;
                            out.push(EtcBlock::Planar {
                                origin,
                                horizontal,
                                vertical,
                            });
                        }
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient() -> [Vec4; 16] {
        std::array::from_fn(|i| {
            let (x, y) = ((i / 4) as f32, (i % 4) as f32);
            Vec4::new(x / 6.0, y / 6.0, 0.5, 1.0)
        })
    }

    fn run_to_end(search: &mut ColorSearch) -> Vec<f32> {
        let mut errors = vec![search.error()];
        while !search.is_done() {
            search.iterate(100.0);
            errors.push(search.error());
        }
        errors
    }

    #[test]
    fn solid_color_is_exact() {
        // 0x88 is exactly representable by T blocks and by 0x77 + 17
        let gray = 0x88 as f32 / 255.0;
        let pixels = [Vec4::new(gray, gray, gray, 1.0); 16];
        for modes in [ColorModes::ETC1, ColorModes::ETC2] {
            let mut search = ColorSearch::new(ErrorMetric::Rgba, modes, pixels, 0xFFFF, 0);
            run_to_end(&mut search);
            assert_eq!(search.error(), 0.0, "{modes:?}");
        }
    }

    #[test]
    fn errors_never_increase() {
        for modes in [ColorModes::ETC1, ColorModes::ETC2, ColorModes::PUNCH_THROUGH_OPAQUE] {
            let mut search = ColorSearch::new(ErrorMetric::Rgba, modes, gradient(), 0xFFFF, 0);
            let errors = run_to_end(&mut search);
            for pair in errors.windows(2) {
                assert!(pair[1] <= pair[0], "{modes:?} {errors:?}");
            }
        }
    }

    #[test]
    fn planar_fits_gradients() {
        let mut search = ColorSearch::new(ErrorMetric::Rgbx, ColorModes::ETC2, gradient(), 0xFFFF, 0);
        run_to_end(&mut search);
        assert!(search.error() < 0.02, "{}", search.error());

        let mut etc1 = ColorSearch::new(ErrorMetric::Rgbx, ColorModes::ETC1, gradient(), 0xFFFF, 0);
        run_to_end(&mut etc1);
        assert!(matches!(
            etc1.block().mode(),
            BlockMode::Individual | BlockMode::Differential
        ));
    }

    #[test]
    fn transparent_pixels_use_the_transparent_selector() {
        let mut pixels = gradient();
        pixels[3].w = 0.0;
        pixels[9].w = 0.0;
        let transparent = (1 << 3) | (1 << 9);
        let mut search = ColorSearch::new(
            ErrorMetric::Rgba,
            ColorModes::PUNCH_THROUGH_TRANSPARENT,
            pixels,
            0xFFFF & !transparent,
            transparent,
        );
        run_to_end(&mut search);

        assert_ne!(search.block().mode(), BlockMode::Planar);
        assert_ne!(search.block().mode(), BlockMode::Individual);
        for (i, decoded) in search.decoded().iter().enumerate() {
            assert_eq!(decoded.is_none(), transparent & (1 << i) != 0, "pixel {i}");
        }
    }

    #[test]
    fn low_effort_finishes_early() {
        let mut search = ColorSearch::new(ErrorMetric::Rgba, ColorModes::ETC2, gradient(), 0xFFFF, 0);
        search.iterate(0.0);
        assert!(search.is_done());
    }

    #[test]
    fn cube_is_clamped() {
        assert_eq!(cube([0, 0, 0], 1, 31).count(), 8);
        assert_eq!(cube([5, 5, 5], 1, 31).count(), 27);
        assert_eq!(cube([31, 15, 3], 0, 31).collect::<Vec<_>>(), vec![[31, 15, 3]]);
    }
}
