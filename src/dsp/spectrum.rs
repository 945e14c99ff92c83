use rustfft::{num_complex::Complex, FftPlanner};

use super::error::NoiseError;

/// Smallest FFT window that still yields a few octave bands
pub const MIN_WINDOW: usize = 64;

/// Average power over one octave of FFT bins
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctaveBand {
    /// First bin in the band (inclusive)
    pub low_bin: usize,
    /// Last bin in the band (exclusive)
    pub high_bin: usize,
    /// Geometric center frequency in Hz
    pub center_hz: f32,
    /// Mean power spectral density in dB
    pub power_db: f32,
}

/// Welch power spectrum estimate: Hann-windowed segments with 50% overlap,
/// averaged. Returns `window / 2 + 1` bins from DC to Nyquist.
///
/// The signal mean is removed first so DC does not leak into the low bins.
pub fn welch_psd(samples: &[f32], window: usize) -> Result<Vec<f32>, NoiseError> {
    if window < MIN_WINDOW {
        return Err(NoiseError::InvalidWindowSize {
            requested: window,
            min: MIN_WINDOW,
        });
    }
    if samples.len() < window {
        return Err(NoiseError::InsufficientSamples {
            needed: window,
            got: samples.len(),
        });
    }

    let mean = samples.iter().map(|&s| f64::from(s)).sum::<f64>() / samples.len() as f64;
    let hann: Vec<f32> = (0..window)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / window as f32;
            0.5 - 0.5 * phase.cos()
        })
        .collect();
    let window_power: f32 = hann.iter().map(|w| w * w).sum();

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(window);

    let bins = window / 2 + 1;
    let mut psd = vec![0.0f32; bins];
    let mut buffer = vec![Complex::new(0.0f32, 0.0); window];
    let hop = window / 2;
    let mut segments = 0usize;

    let mut start = 0;
    while start + window <= samples.len() {
        for (slot, (&sample, &w)) in buffer
            .iter_mut()
            .zip(samples[start..start + window].iter().zip(hann.iter()))
        {
            *slot = Complex::new((f64::from(sample) - mean) as f32 * w, 0.0);
        }

        fft.process(&mut buffer);

        for (power, value) in psd.iter_mut().zip(buffer.iter()) {
            *power += value.norm_sqr();
        }

        segments += 1;
        start += hop;
    }

    let scale = 1.0 / (segments as f32 * window_power);
    for power in psd.iter_mut() {
        *power *= scale;
    }

    Ok(psd)
}

/// Group bins into octaves `[2^j, 2^(j+1))`, starting at bin 2 so the
/// window's DC leakage stays out of the fit
pub fn octave_bands(psd: &[f32], sample_rate: f32) -> Vec<OctaveBand> {
    if psd.len() < 2 {
        return Vec::new();
    }

    let window = (psd.len() - 1) * 2;
    let bin_hz = sample_rate / window as f32;
    let mut bands = Vec::new();

    let mut low = 2;
    while low * 2 <= psd.len() {
        let high = low * 2;
        let mean = psd[low..high].iter().sum::<f32>() / (high - low) as f32;
        bands.push(OctaveBand {
            low_bin: low,
            high_bin: high,
            center_hz: bin_hz * (low as f32 * high as f32).sqrt(),
            power_db: 10.0 * mean.max(f32::MIN_POSITIVE).log10(),
        });
        low = high;
    }

    bands
}

/// Least-squares slope of band power in dB per octave
/// Pink noise sits near -3, white near 0, brown near -6
pub fn slope_db_per_octave(bands: &[OctaveBand]) -> Option<f32> {
    if bands.len() < 2 {
        return None;
    }

    let n = bands.len() as f32;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = bands.iter().map(|b| b.power_db).sum::<f32>() / n;

    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (octave, band) in bands.iter().enumerate() {
        let dx = octave as f32 - mean_x;
        covariance += dx * (band.power_db - mean_y);
        variance += dx * dx;
    }

    Some(covariance / variance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::pink::PinkNoise;
    use crate::dsp::white::{RandSource, WhiteNoiseSource};

    fn white_samples(count: usize, seed: u64) -> Vec<f32> {
        let mut source = RandSource::from_seed(seed);
        (0..count).map(|_| source.next_sample()).collect()
    }

    fn pink_samples(count: usize, rows: usize, seed: u64) -> Vec<f32> {
        let mut pink = PinkNoise::new(rows, RandSource::from_seed(seed)).unwrap();
        let mut samples = vec![0.0; count];
        pink.fill(&mut samples);
        samples
    }

    fn fitted_slope(samples: &[f32], window: usize) -> f32 {
        let psd = welch_psd(samples, window).unwrap();
        let bands = octave_bands(&psd, 48_000.0);
        // Drop the top octave, where the extra white term flattens the curve
        slope_db_per_octave(&bands[..bands.len() - 1]).unwrap()
    }

    #[test]
    fn test_rejects_short_input() {
        assert_eq!(
            welch_psd(&[0.0; 100], 256).unwrap_err(),
            NoiseError::InsufficientSamples { needed: 256, got: 100 }
        );
        assert!(welch_psd(&[0.0; 100], 16).is_err());
    }

    #[test]
    fn test_bin_count() {
        let psd = welch_psd(&white_samples(4096, 1), 1024).unwrap();
        assert_eq!(psd.len(), 513);
    }

    #[test]
    fn test_octave_bands_cover_spectrum() {
        let psd = vec![1.0; 513];
        let bands = octave_bands(&psd, 48_000.0);

        assert_eq!(bands.first().unwrap().low_bin, 2);
        assert_eq!(bands.last().unwrap().high_bin, 512);
        assert!(bands.iter().all(|b| b.power_db.abs() < 1e-6));
        assert!(bands.windows(2).all(|w| w[0].high_bin == w[1].low_bin));
    }

    #[test]
    fn test_white_noise_is_flat() {
        let slope = fitted_slope(&white_samples(1 << 17, 5), 4096);
        assert!(slope.abs() < 1.0, "White noise slope: {}", slope);
    }

    #[test]
    fn test_pink_noise_rolls_off_3db_per_octave() {
        let slope = fitted_slope(&pink_samples(1 << 17, 12, 11), 4096);
        assert!(
            (-4.5..-1.5).contains(&slope),
            "Pink noise slope: {} dB/octave",
            slope
        );
    }

    #[test]
    fn test_slope_needs_two_bands() {
        let band = OctaveBand {
            low_bin: 2,
            high_bin: 4,
            center_hz: 100.0,
            power_db: 0.0,
        };
        assert_eq!(slope_db_per_octave(&[band]), None);
    }
}
