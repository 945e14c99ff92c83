use crate::audio::engine::ChannelNoise;

/// Generator handoff between the UI thread and the audio thread.
///
/// The UI builds or reconfigures a generator and sends it to the engine, which
/// swaps it in and sends the one it replaced back the same way, so allocation
/// and deallocation both stay off the audio thread.
#[derive(Debug)]
pub struct GeneratorSwap {
    /// Index into the engine's channel list (not the audio output channel)
    pub channel: usize,
    pub generator: ChannelNoise,
}

impl GeneratorSwap {
    pub fn new(channel: usize, generator: ChannelNoise) -> Self {
        Self { channel, generator }
    }
}
