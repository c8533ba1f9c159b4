//! EAC blocks, used for the alpha plane of RGBA8 and for R11/RG11.

/// The EAC modifier tables.
pub(crate) const EAC_MODIFIERS: [[i16; 8]; 16] = [
    [-3, -6, -9, -15, 2, 5, 8, 14],
    [-3, -7, -10, -13, 2, 6, 9, 12],
    [-2, -5, -8, -13, 1, 4, 7, 12],
    [-2, -4, -6, -13, 1, 3, 5, 12],
    [-3, -6, -8, -12, 2, 5, 7, 11],
    [-3, -7, -9, -11, 2, 6, 8, 10],
    [-4, -7, -8, -11, 3, 6, 7, 10],
    [-3, -5, -8, -11, 2, 4, 7, 10],
    [-2, -6, -8, -10, 1, 5, 7, 9],
    [-2, -5, -8, -10, 1, 4, 7, 9],
    [-2, -4, -8, -10, 1, 3, 7, 9],
    [-2, -5, -7, -10, 1, 4, 6, 9],
    [-3, -4, -7, -10, 2, 3, 6, 9],
    [-1, -2, -3, -10, 0, 1, 2, 9],
    [-4, -6, -8, -9, 3, 5, 7, 8],
    [-3, -5, -7, -9, 2, 4, 6, 8],
];

/// How the values of an EAC block are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EacKind {
    /// 8-bit alpha of RGBA8.
    Alpha,
    /// 11-bit unsigned channel of R11/RG11.
    Unsigned11,
    /// 11-bit signed channel of SIGNED_R11/SIGNED_RG11.
    Signed11,
}

impl EacKind {
    pub const fn base_range(self) -> (i16, i16) {
        match self {
            EacKind::Alpha | EacKind::Unsigned11 => (0, 255),
            EacKind::Signed11 => (-127, 127),
        }
    }
    pub const fn multiplier_range(self) -> (u8, u8) {
        match self {
            EacKind::Alpha => (1, 15),
            EacKind::Unsigned11 | EacKind::Signed11 => (0, 15),
        }
    }

    /// Maps a normalized source value in `0..=1` into "base units", i.e. the
    /// scale in which `value ≈ base + modifier * multiplier`.
    pub fn to_base_units(self, value: f32) -> f32 {
        match self {
            EacKind::Alpha => value * 255.0,
            EacKind::Unsigned11 => (value * 2047.0 - 4.0) / 8.0,
            EacKind::Signed11 => (value * 2.0 - 1.0) * 1023.0 / 8.0,
        }
    }

    /// Decodes a single value, normalized to `0..=1`.
    ///
    /// Signed values are mapped from `-1..=1` back to `0..=1`.
    #[inline]
    pub fn decode(self, base: i16, multiplier: u8, modifier: i16) -> f32 {
        let base = base as i32;
        let multiplier = multiplier as i32;
        let modifier = modifier as i32;
        match self {
            EacKind::Alpha => (base + modifier * multiplier).clamp(0, 255) as f32 / 255.0,
            EacKind::Unsigned11 => {
                let offset = if multiplier == 0 {
                    modifier
                } else {
                    modifier * multiplier * 8
                };
                (base * 8 + 4 + offset).clamp(0, 2047) as f32 / 2047.0
            }
            EacKind::Signed11 => {
                let offset = if multiplier == 0 {
                    modifier
                } else {
                    modifier * multiplier * 8
                };
                let signed = (base * 8 + offset).clamp(-1023, 1023) as f32 / 1023.0;
                (signed + 1.0) * 0.5
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EacBlock {
    pub base: i16,
    pub multiplier: u8,
    pub table: u8,
    pub selectors: [u8; 16],
}

impl EacBlock {
    pub fn decode(&self, kind: EacKind) -> [f32; 16] {
        let table = &EAC_MODIFIERS[self.table as usize];
        self.selectors
            .map(|s| kind.decode(self.base, self.multiplier, table[s as usize & 7]))
    }

    pub fn pack(&self, kind: EacKind) -> u64 {
        let base = match kind {
            EacKind::Signed11 => self.base as i8 as u8,
            _ => self.base as u8,
        };
        let mut bits = (base as u64) << 56
            | (self.multiplier as u64 & 0xF) << 52
            | (self.table as u64 & 0xF) << 48;
        for (i, &s) in self.selectors.iter().enumerate() {
            bits |= (s as u64 & 0b111) << (45 - 3 * i);
        }
        bits
    }

    pub fn unpack(bits: u64, kind: EacKind) -> Self {
        let raw_base = (bits >> 56) as u8;
        let base = match kind {
            // -128 is treated as -127
            EacKind::Signed11 => (raw_base as i8).max(-127) as i16,
            _ => raw_base as i16,
        };
        EacBlock {
            base,
            multiplier: ((bits >> 52) & 0xF) as u8,
            table: ((bits >> 48) & 0xF) as u8,
            selectors: std::array::from_fn(|i| ((bits >> (45 - 3 * i)) & 0b111) as u8),
        }
    }
}

/// Effort-gated search for the best EAC block of one channel.
///
/// Each call to [`EacSearch::iterate`] widens the base and multiplier search
/// radius around the current best block, trying every table.
#[derive(Debug, Clone)]
pub(crate) struct EacSearch {
    kind: EacKind,
    /// Normalized target values.
    targets: [f32; 16],
    /// Pixels that contribute to the error.
    mask: u16,
    best: EacBlock,
    decoded: [f32; 16],
    error: f32,
    step: usize,
    done: bool,
}

/// `(base radius, multiplier radius)` of each iteration.
const SEARCH_RADII: [(i16, i16); 4] = [(1, 1), (3, 1), (6, 2), (12, 3)];

impl EacSearch {
    pub fn new(kind: EacKind, targets: [f32; 16], mask: u16) -> Self {
        let mut search = Self {
            kind,
            targets,
            mask,
            best: EacBlock {
                base: 0,
                multiplier: kind.multiplier_range().0,
                table: 0,
                selectors: [0; 16],
            },
            decoded: [0.0; 16],
            error: f32::INFINITY,
            step: 0,
            done: false,
        };
        search.init();
        search
    }

    fn init(&mut self) {
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for i in 0..16 {
            if self.mask & (1 << i) != 0 {
                let v = self.kind.to_base_units(self.targets[i]);
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
        if lo > hi {
            // no pixels, every block is perfect
            lo = 0.0;
            hi = 0.0;
        }

        let (min_mul, max_mul) = self.kind.multiplier_range();
        let (min_base, max_base) = self.kind.base_range();
        for table in 0..16 {
            let modifiers = &EAC_MODIFIERS[table as usize];
            let (t_min, t_max) = (modifiers[3] as f32, modifiers[7] as f32);
            let multiplier = ((hi - lo) / (t_max - t_min)).round() as i32;
            let multiplier = multiplier.clamp(min_mul as i32, max_mul as i32) as u8;
            let center = (lo + hi) * 0.5 - (t_max + t_min) * 0.5 * multiplier as f32;
            let base = (center.round() as i32).clamp(min_base as i32, max_base as i32) as i16;
            self.consider(base, multiplier, table);
        }

        if self.error == 0.0 {
            self.done = true;
        }
    }

    /// Assigns the best selectors for the given parameters and keeps the block
    /// if it is strictly better than the current best.
    fn consider(&mut self, base: i16, multiplier: u8, table: u8) {
        let modifiers = &EAC_MODIFIERS[table as usize];
        let palette: [f32; 8] = modifiers.map(|m| self.kind.decode(base, multiplier, m));

        let mut error = 0.0;
        let mut selectors = [0; 16];
        for i in 0..16 {
            if self.mask & (1 << i) == 0 {
                continue;
            }
            let target = self.targets[i];
            let mut best = (f32::INFINITY, 0);
            for (s, &value) in palette.iter().enumerate() {
                let e = (value - target) * (value - target);
                if e < best.0 {
                    best = (e, s as u8);
                }
            }
            error += best.0;
            selectors[i] = best.1;
            if error >= self.error {
                return;
            }
        }

        if error < self.error {
            self.best = EacBlock {
                base,
                multiplier,
                table,
                selectors,
            };
            self.decoded = self.best.decode(self.kind);
            self.error = error;
        }
    }

    pub fn iterate(&mut self, effort: f32) {
        if self.done {
            return;
        }

        let (base_radius, mul_radius) = SEARCH_RADII[self.step];
        let (min_mul, max_mul) = self.kind.multiplier_range();
        let (min_base, max_base) = self.kind.base_range();
        let center = self.best;

        let bases = (center.base - base_radius).max(min_base)..=(center.base + base_radius).min(max_base);
        let muls = (center.multiplier as i16 - mul_radius).max(min_mul as i16)
            ..=(center.multiplier as i16 + mul_radius).min(max_mul as i16);
        for base in bases {
            for multiplier in muls.clone() {
                for table in 0..16 {
                    self.consider(base, multiplier as u8, table);
                }
            }
        }

        self.step += 1;
        self.done = self.error == 0.0
            || self.step >= SEARCH_RADII.len()
            || effort < super::effort_cutoff(self.step, SEARCH_RADII.len());
    }

    pub fn error(&self) -> f32 {
        self.error
    }
    pub fn is_done(&self) -> bool {
        self.done
    }
    pub fn decoded(&self) -> &[f32; 16] {
        &self.decoded
    }
    pub fn block(&self) -> &EacBlock {
        &self.best
    }
}
