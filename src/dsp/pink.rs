//! Pink noise after Gardner, Voss and McCartney.
//!
//! `N` white noise rows are summed, row `k` being redrawn once every `2^(k+1)`
//! samples. The row to redraw is picked from the trailing zeros of a wrapping
//! counter, so each sample touches at most one row:
//!
//! ```text
//! x x x x x x x x x x x x x x x x
//!  x   x   x   x   x   x   x   x
//!    x       x       x       x
//!        x               x
//!                x
//! ```
//!
//! A fresh white value is added to every output to flatten the top octave.

use super::error::NoiseError;
use super::white::WhiteNoiseSource;

/// Smallest usable row count
pub const MIN_ROWS: usize = 1;
/// Largest row count whose index mask fits comfortably in a `u32`
pub const MAX_ROWS: usize = 30;
/// Row count used when none is configured
pub const DEFAULT_ROWS: usize = 12;

/// Check a row count before building or reconfiguring a generator
pub fn validate_row_count(row_count: usize) -> Result<(), NoiseError> {
    if (MIN_ROWS..=MAX_ROWS).contains(&row_count) {
        Ok(())
    } else {
        Err(NoiseError::InvalidRowCount {
            requested: row_count,
            min: MIN_ROWS,
            max: MAX_ROWS,
        })
    }
}

/// Real-time pink noise generator
/// `generate` is allocation-free and lock-free; `reconfigure` is not
#[derive(Debug, Clone)]
pub struct PinkNoise<S> {
    /// Current value of each row
    rows: Vec<f32>,
    /// Sum of `rows`, maintained incrementally
    running_sum: f64,
    /// Wrapping sample counter, always within `index_mask`
    index: u32,
    /// 2^N - 1
    index_mask: u32,
    /// 1 / (N + 1)
    normalization: f64,
    source: S,
}

impl<S: WhiteNoiseSource> PinkNoise<S> {
    /// Create a generator with `row_count` rows seeded from `source`
    pub fn new(row_count: usize, source: S) -> Result<Self, NoiseError> {
        validate_row_count(row_count)?;

        let mut pink = Self {
            rows: Vec::with_capacity(row_count),
            running_sum: 0.0,
            index: 0,
            index_mask: 0,
            normalization: 1.0,
            source,
        };
        pink.reconfigure(row_count)?;
        Ok(pink)
    }

    /// Discard all row state and start over with `row_count` rows.
    ///
    /// May allocate when the row count grows. Call from a non-audio thread
    /// only, never while another thread can call [`generate`](Self::generate).
    pub fn reconfigure(&mut self, row_count: usize) -> Result<(), NoiseError> {
        validate_row_count(row_count)?;

        self.index = 0;
        self.index_mask = (1u32 << row_count) - 1;
        self.normalization = 1.0 / (row_count + 1) as f64;

        // Rows start as noise rather than silence to avoid a ramp-up
        let source = &mut self.source;
        self.rows.clear();
        self.rows.extend((0..row_count).map(|_| source.next_sample()));
        self.running_sum = self.rows.iter().map(|&row| f64::from(row)).sum();

        Ok(())
    }

    /// Generate the next pink noise sample in [0.0, 1.0)
    #[inline]
    pub fn generate(&mut self) -> f32 {
        self.index = (self.index + 1) & self.index_mask;

        // Index 0 comes round once per 2^N calls and updates no row
        if self.index != 0 {
            let row = self.index.trailing_zeros() as usize;

            self.running_sum -= f64::from(self.rows[row]);
            let fresh = self.source.next_sample();
            self.running_sum += f64::from(fresh);
            self.rows[row] = fresh;
        }

        // Extra white term applies to this sample only
        let extra = f64::from(self.source.next_sample());
        ((self.running_sum + extra) * self.normalization) as f32
    }

    /// Fill a buffer with consecutive samples
    pub fn fill(&mut self, output: &mut [f32]) {
        for sample in output.iter_mut() {
            *sample = self.generate();
        }
    }
}

impl<S> PinkNoise<S> {
    /// Number of rows in the current configuration
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[f32] {
        &self.rows
    }

    #[cfg(test)]
    pub fn running_sum(&self) -> f64 {
        self.running_sum
    }

    #[cfg(test)]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[cfg(test)]
    pub fn source(&self) -> &S {
        &self.source
    }
}
