use rand::{rngs::SmallRng, Rng, SeedableRng};

/// Scale for turning 24 random bits into an f32 in [0.0, 1.0)
const UNIT_SCALE: f32 = 1.0 / (1u32 << 24) as f32;

/// Uniform white noise source producing values in [0.0, 1.0)
/// Must be O(1) and allocation-free: it is called from the audio thread
pub trait WhiteNoiseSource {
    /// Draw the next independent uniform value in [0.0, 1.0)
    fn next_sample(&mut self) -> f32;
}

/// White noise generator using linear congruential generator (LCG)
/// Fast, deterministic pseudo-random noise for real-time audio
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    /// Create new noise generator with default seed
    pub fn new() -> Self {
        Self {
            state: 0x12345678, // Default seed value
        }
    }

    /// Create new noise generator with custom seed
    pub fn new_with_seed(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Create a generator seeded from the thread-local entropy source
    pub fn from_entropy() -> Self {
        Self::new_with_seed(rand::random())
    }
}

impl Default for Lcg {
    fn default() -> Self {
        Self::new()
    }
}

impl WhiteNoiseSource for Lcg {
    fn next_sample(&mut self) -> f32 {
        // LCG: next = (a * current + c) mod m
        // Using constants from Numerical Recipes
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);

        // Low bits of an LCG have short periods, keep the top 24
        (self.state >> 8) as f32 * UNIT_SCALE
    }
}

/// White noise backed by a `rand` generator
#[derive(Debug, Clone)]
pub struct RandSource<R> {
    rng: R,
}

impl<R: Rng> RandSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandSource<SmallRng> {
    /// Replayable source: the same seed always yields the same sequence
    pub fn from_seed(seed: u64) -> Self {
        Self::new(SmallRng::seed_from_u64(seed))
    }

    /// Source seeded from operating system entropy
    pub fn from_entropy() -> Self {
        Self::new(SmallRng::from_os_rng())
    }
}

impl<R: Rng> WhiteNoiseSource for RandSource<R> {
    #[inline]
    fn next_sample(&mut self) -> f32 {
        // f32 sampling in rand yields multiples of 2^-24 in [0, 1)
        self.rng.random::<f32>()
    }
}

/// Which white noise algorithm backs a generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    #[default]
    Small,
    Lcg,
}

impl SourceKind {
    /// Build a source of this kind
    /// Without a seed both kinds start from fresh entropy, so unseeded channels never match
    pub fn build(self, seed: Option<u64>) -> AnySource {
        match (self, seed) {
            (SourceKind::Small, Some(seed)) => AnySource::Small(RandSource::from_seed(seed)),
            (SourceKind::Small, None) => AnySource::Small(RandSource::from_entropy()),
            // Fold the upper half in so 64-bit seeds differing only there still diverge
            (SourceKind::Lcg, Some(seed)) => {
                AnySource::Lcg(Lcg::new_with_seed((seed ^ (seed >> 32)) as u32))
            }
            (SourceKind::Lcg, None) => AnySource::Lcg(Lcg::from_entropy()),
        }
    }
}

/// Enum dispatch over the available sources, so channels can mix kinds
/// without boxing
#[derive(Debug, Clone)]
pub enum AnySource {
    Small(RandSource<SmallRng>),
    Lcg(Lcg),
}

impl AnySource {
    #[cfg(test)]
    pub fn kind(&self) -> SourceKind {
        match self {
            AnySource::Small(_) => SourceKind::Small,
            AnySource::Lcg(_) => SourceKind::Lcg,
        }
    }
}

impl WhiteNoiseSource for AnySource {
    #[inline]
    fn next_sample(&mut self) -> f32 {
        match self {
            AnySource::Small(source) => source.next_sample(),
            AnySource::Lcg(source) => source.next_sample(),
        }
    }
}
