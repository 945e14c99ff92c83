use anyhow::{anyhow, Context, Result};
use std::path::Path;

use super::engine::NoiseEngine;

/// Frames rendered per engine call
const BLOCK_FRAMES: usize = 1024;

/// Render `seconds` of the engine's output to a 32-bit float WAV file.
/// Returns the number of frames written.
pub fn render_wav(
    engine: &mut NoiseEngine,
    path: impl AsRef<Path>,
    sample_rate: u32,
    seconds: f32,
) -> Result<u64> {
    let path = path.as_ref();

    if !(seconds.is_finite() && seconds > 0.0) {
        return Err(anyhow!("Render length must be a positive number of seconds"));
    }
    if sample_rate == 0 {
        return Err(anyhow!("Sample rate must be greater than zero"));
    }

    let num_channels = engine.required_output_channels();
    let channels = u16::try_from(num_channels)
        .ok()
        .filter(|&c| c > 0)
        .ok_or_else(|| anyhow!("Cannot render {} output channels", num_channels))?;

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;

    let total_frames = (f64::from(seconds) * f64::from(sample_rate)).round() as u64;
    let mut buffer = vec![0.0f32; BLOCK_FRAMES * num_channels];
    let mut written = 0u64;

    while written < total_frames {
        let frames = (total_frames - written).min(BLOCK_FRAMES as u64) as usize;
        let block = &mut buffer[..frames * num_channels];
        engine.process(block, num_channels);

        for &sample in block.iter() {
            writer
                .write_sample(sample)
                .with_context(|| format!("Failed to write WAV file: {}", path.display()))?;
        }
        written += frames as u64;
    }

    writer
        .finalize()
        .with_context(|| format!("Failed to finalize WAV file: {}", path.display()))?;

    Ok(written)
}
