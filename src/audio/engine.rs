use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;

use super::meters::ChannelMeters;
use crate::dsp::pink::PinkNoise;
use crate::dsp::white::AnySource;
use crate::types::events::GeneratorSwap;

/// Generator type used for every output channel
pub type ChannelNoise = PinkNoise<AnySource>;

/// One independent pink noise stream routed to an output channel
#[derive(Debug)]
pub struct NoiseChannel {
    pub generator: ChannelNoise,
    /// 0-indexed output channel
    pub audio_channel: usize,
}

impl NoiseChannel {
    pub fn new(generator: ChannelNoise, audio_channel: usize) -> Self {
        Self {
            generator,
            audio_channel,
        }
    }
}

/// Channels used to exchange generators with the UI thread
struct Handoff {
    swap_rx: Receiver<GeneratorSwap>,
    retired_tx: Sender<GeneratorSwap>,
}

/// Multi-channel pink noise engine
/// Runs in real-time audio thread - must be lock-free and allocation-free
pub struct NoiseEngine {
    channels: Vec<NoiseChannel>,
    meters: Arc<ChannelMeters>,
    handoff: Option<Handoff>,
}

impl NoiseEngine {
    /// Create an engine with one meter slot per channel and no UI handoff
    pub fn new(channels: Vec<NoiseChannel>) -> Self {
        let meters = Arc::new(ChannelMeters::new(channels.len()));
        Self {
            channels,
            meters,
            handoff: None,
        }
    }

    /// Accept replacement generators on `swap_rx` and return the replaced ones on `retired_tx`
    pub fn with_handoff(
        mut self,
        swap_rx: Receiver<GeneratorSwap>,
        retired_tx: Sender<GeneratorSwap>,
    ) -> Self {
        self.handoff = Some(Handoff { swap_rx, retired_tx });
        self
    }

    /// Shared level meters, one per channel in configuration order
    pub fn meters(&self) -> Arc<ChannelMeters> {
        Arc::clone(&self.meters)
    }

    #[cfg(test)]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Smallest interleaved channel count that every stream can be routed into
    pub fn required_output_channels(&self) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.audio_channel + 1)
            .max()
            .unwrap_or(0)
    }

    /// Row count of each channel's current generator
    #[cfg(test)]
    pub fn row_counts(&self) -> Vec<usize> {
        self.channels
            .iter()
            .map(|channel| channel.generator.row_count())
            .collect()
    }

    /// Fill an interleaved output buffer
    ///
    /// # Arguments
    /// * `output` - Interleaved multi-channel output buffer
    /// * `num_channels` - Number of output channels
    ///
    /// Streams routed past `num_channels` keep running but are not written.
    pub fn process(&mut self, output: &mut [f32], num_channels: usize) {
        output.fill(0.0);

        self.apply_swaps();

        if num_channels == 0 {
            return;
        }
        let frames = output.len() / num_channels;

        for (idx, channel) in self.channels.iter_mut().enumerate() {
            let route = channel.audio_channel;
            let mut energy = 0.0f32;

            for frame_idx in 0..frames {
                let sample = to_bipolar(channel.generator.generate());
                energy += sample * sample;

                if route < num_channels {
                    output[frame_idx * num_channels + route] += sample;
                }
            }

            if frames > 0 {
                self.meters.store(idx, (energy / frames as f32).sqrt());
            }
        }
    }

    /// Swap in any generators the UI thread has prepared (non-blocking)
    fn apply_swaps(&mut self) {
        let Some(handoff) = &self.handoff else {
            return;
        };

        while let Ok(mut swap) = handoff.swap_rx.try_recv() {
            if let Some(channel) = self.channels.get_mut(swap.channel) {
                std::mem::swap(&mut channel.generator, &mut swap.generator);
            }

            // Full or disconnected: the generator is dropped here, which only
            // happens if the UI has stopped draining retired generators
            let _ = handoff.retired_tx.try_send(swap);
        }
    }
}

/// Map a [0, 1) generator sample to bipolar [-1, 1) audio
#[inline]
fn to_bipolar(sample: f32) -> f32 {
    sample * 2.0 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::white::SourceKind;
    use crossbeam_channel::bounded;

    fn channel(rows: usize, seed: u64, audio_channel: usize) -> NoiseChannel {
        let generator = PinkNoise::new(rows, SourceKind::Small.build(Some(seed))).unwrap();
        NoiseChannel::new(generator, audio_channel)
    }

    #[test]
    fn test_engine_creation() {
        let engine = NoiseEngine::new(vec![channel(8, 1, 0), channel(12, 2, 3)]);

        assert_eq!(engine.channel_count(), 2);
        assert_eq!(engine.required_output_channels(), 4);
        assert_eq!(engine.row_counts(), vec![8, 12]);
        assert_eq!(engine.meters().len(), 2);
    }

    #[test]
    fn test_channel_routing() {
        let mut engine = NoiseEngine::new(vec![channel(8, 1, 0), channel(8, 2, 2)]);

        let mut output = vec![0.0f32; 256 * 3]; // 256 frames, 3 channels
        engine.process(&mut output, 3);

        let ch0_has_audio = output.iter().step_by(3).any(|&s| s != 0.0);
        let ch1_has_audio = output.iter().skip(1).step_by(3).any(|&s| s != 0.0);
        let ch2_has_audio = output.iter().skip(2).step_by(3).any(|&s| s != 0.0);

        assert!(ch0_has_audio, "Channel 0 should have audio");
        assert!(!ch1_has_audio, "Channel 1 should be silent");
        assert!(ch2_has_audio, "Channel 2 should have audio");
        assert!(output.iter().all(|s| (-1.0..1.0).contains(s)));
    }

    #[test]
    fn test_channels_are_decorrelated() {
        let mut engine = NoiseEngine::new(vec![channel(10, 1, 0), channel(10, 2, 1)]);

        let mut output = vec![0.0f32; 4096 * 2];
        engine.process(&mut output, 2);

        let left: Vec<f32> = output.iter().step_by(2).copied().collect();
        let right: Vec<f32> = output.iter().skip(1).step_by(2).copied().collect();
        assert_ne!(left, right);
    }

    #[test]
    fn test_matches_direct_generation() {
        let mut engine = NoiseEngine::new(vec![channel(6, 9, 0)]);
        let mut direct = PinkNoise::new(6, SourceKind::Small.build(Some(9))).unwrap();

        let mut output = vec![0.0f32; 64];
        engine.process(&mut output, 1);

        for sample in output {
            assert_eq!(sample, direct.generate() * 2.0 - 1.0);
        }
    }

    #[test]
    fn test_unrouted_channel_still_advances() {
        let mut engine = NoiseEngine::new(vec![channel(4, 3, 5)]);

        let mut output = vec![0.0f32; 32];
        engine.process(&mut output, 2);

        assert!(output.iter().all(|&s| s == 0.0));
        assert!(engine.meters().load(0) > 0.0);
    }

    #[test]
    fn test_zero_channels_is_noop() {
        let mut engine = NoiseEngine::new(vec![channel(4, 3, 0)]);
        let mut output: Vec<f32> = Vec::new();
        engine.process(&mut output, 0);
        assert_eq!(engine.meters().load(0), 0.0);
    }

    #[test]
    fn test_generator_swap() {
        let (swap_tx, swap_rx) = bounded(4);
        let (retired_tx, retired_rx) = bounded(4);
        let mut engine = NoiseEngine::new(vec![channel(8, 1, 0), channel(8, 2, 1)])
            .with_handoff(swap_rx, retired_tx);

        let replacement = PinkNoise::new(16, SourceKind::Lcg.build(None)).unwrap();
        swap_tx.try_send(GeneratorSwap::new(1, replacement)).unwrap();

        let mut output = vec![0.0f32; 128];
        engine.process(&mut output, 2);

        assert_eq!(engine.row_counts(), vec![8, 16]);

        let retired = retired_rx.try_recv().unwrap();
        assert_eq!(retired.channel, 1);
        assert_eq!(retired.generator.row_count(), 8);
    }

    #[test]
    fn test_swap_for_unknown_channel_is_returned() {
        let (swap_tx, swap_rx) = bounded(4);
        let (retired_tx, retired_rx) = bounded(4);
        let mut engine = NoiseEngine::new(vec![channel(8, 1, 0)]).with_handoff(swap_rx, retired_tx);

        let stray = PinkNoise::new(3, SourceKind::Lcg.build(None)).unwrap();
        swap_tx.try_send(GeneratorSwap::new(7, stray)).unwrap();

        let mut output = vec![0.0f32; 16];
        engine.process(&mut output, 1);

        assert_eq!(engine.row_counts(), vec![8]);
        assert_eq!(retired_rx.try_recv().unwrap().generator.row_count(), 3);
    }
}
