use std::sync::atomic::{AtomicU32, Ordering};

/// Per-channel output levels written by the audio thread and read by the UI
/// Lock-free so the audio thread never blocks on a reader
pub struct ChannelMeters {
    /// RMS of the last processed block, bipolar full scale = 1.0
    levels: Vec<AtomicF32>,
}

impl ChannelMeters {
    pub fn new(channels: usize) -> Self {
        Self {
            levels: (0..channels).map(|_| AtomicF32::new(0.0)).collect(),
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Store a level; out-of-range channels are ignored
    pub fn store(&self, channel: usize, level: f32) {
        if let Some(slot) = self.levels.get(channel) {
            slot.store(level, Ordering::Relaxed);
        }
    }

    /// Last stored level, 0.0 for unknown channels
    pub fn load(&self, channel: usize) -> f32 {
        self.levels
            .get(channel)
            .map_or(0.0, |slot| slot.load(Ordering::Relaxed))
    }
}

/// Atomic f32 wrapper for lock-free level updates
pub struct AtomicF32 {
    storage: AtomicU32,
}

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self {
            storage: AtomicU32::new(value.to_bits()),
        }
    }

    pub fn load(&self, ordering: Ordering) -> f32 {
        f32::from_bits(self.storage.load(ordering))
    }

    pub fn store(&self, value: f32, ordering: Ordering) {
        self.storage.store(value.to_bits(), ordering);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_round_trip() {
        let value = AtomicF32::new(0.25);
        assert_eq!(value.load(Ordering::Relaxed), 0.25);
        value.store(-3.5, Ordering::Relaxed);
        assert_eq!(value.load(Ordering::Relaxed), -3.5);
    }

    #[test]
    fn test_meters_ignore_unknown_channels() {
        let meters = ChannelMeters::new(2);
        meters.store(1, 0.5);
        meters.store(5, 0.9);

        assert_eq!(meters.len(), 2);
        assert_eq!(meters.load(0), 0.0);
        assert_eq!(meters.load(1), 0.5);
        assert_eq!(meters.load(5), 0.0);
    }
}
