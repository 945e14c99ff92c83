use thiserror::Error;

/// Configuration errors raised by the noise generators and analysis helpers.
/// Never produced from inside a per-sample call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NoiseError {
    /// Row count outside `1..=MAX_ROWS`
    #[error("row count must be between {min} and {max}, got {requested}")]
    InvalidRowCount {
        requested: usize,
        min: usize,
        max: usize,
    },

    /// Not enough samples to fill a single analysis window
    #[error("spectrum analysis needs at least {needed} samples, got {got}")]
    InsufficientSamples { needed: usize, got: usize },

    /// FFT window too small to resolve any octave band
    #[error("analysis window must be at least {min} samples, got {requested}")]
    InvalidWindowSize { requested: usize, min: usize },
}
