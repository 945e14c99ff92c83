use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::Arc;

use crate::audio::engine::ChannelNoise;
use crate::audio::meters::ChannelMeters;
use crate::config::ChannelConfig;
use crate::dsp::error::NoiseError;
use crate::dsp::pink::{PinkNoise, MAX_ROWS, MIN_ROWS};
use crate::dsp::white::SourceKind;
use crate::types::events::GeneratorSwap;

/// What the monitor shows for one noise channel
#[derive(Debug, Clone)]
pub struct ChannelView {
    pub name: String,
    /// 1-indexed output channel, as configured
    pub audioch: usize,
    /// Row count of the generator currently running on the audio thread
    pub rows: usize,
    pub source: SourceKind,
    /// Configured seed, reused whenever a fresh generator is built
    pub seed: Option<u64>,
}

impl From<&ChannelConfig> for ChannelView {
    fn from(config: &ChannelConfig) -> Self {
        Self {
            name: config.name.clone(),
            audioch: config.audioch,
            rows: config.rows,
            source: config.source_kind(),
            seed: config.seed,
        }
    }
}

/// UI application state
/// Owns the UI side of the generator handoff with the audio thread
pub struct App {
    pub channels: Vec<ChannelView>,
    /// Currently selected channel
    pub selected: usize,
    /// Output device name
    pub device_name: String,
    pub sample_rate: u32,
    /// Last status message
    pub status: Option<String>,
    /// Whether to quit the application
    pub should_quit: bool,
    meters: Arc<ChannelMeters>,
    swap_tx: Sender<GeneratorSwap>,
    retired_rx: Receiver<GeneratorSwap>,
    /// Generators returned by the audio thread, reused on the next change
    spares: Vec<Option<ChannelNoise>>,
}

impl App {
    pub fn new(
        channels: &[ChannelConfig],
        device_name: String,
        sample_rate: u32,
        meters: Arc<ChannelMeters>,
        swap_tx: Sender<GeneratorSwap>,
        retired_rx: Receiver<GeneratorSwap>,
    ) -> Self {
        Self {
            channels: channels.iter().map(ChannelView::from).collect(),
            selected: 0,
            device_name,
            sample_rate,
            status: None,
            should_quit: false,
            meters,
            swap_tx,
            retired_rx,
            spares: channels.iter().map(|_| None).collect(),
        }
    }

    /// Last RMS level reported by the audio thread for a channel
    pub fn level(&self, channel: usize) -> f32 {
        self.meters.load(channel)
    }

    /// Select next channel
    pub fn next_channel(&mut self) {
        if !self.channels.is_empty() {
            self.selected = (self.selected + 1) % self.channels.len();
        }
    }

    /// Select previous channel
    pub fn prev_channel(&mut self) {
        if !self.channels.is_empty() {
            self.selected = (self.selected + self.channels.len() - 1) % self.channels.len();
        }
    }

    /// Add a row to the selected channel
    pub fn increase_rows(&mut self) {
        self.change_rows(1);
    }

    /// Remove a row from the selected channel
    pub fn decrease_rows(&mut self) {
        self.change_rows(-1);
    }

    /// Take back generators the audio thread has swapped out
    pub fn collect_retired(&mut self) {
        while let Ok(swap) = self.retired_rx.try_recv() {
            if let Some(slot) = self.spares.get_mut(swap.channel) {
                *slot = Some(swap.generator);
            }
        }
    }

    fn change_rows(&mut self, delta: isize) {
        let idx = self.selected;
        let Some(view) = self.channels.get(idx) else {
            return;
        };

        let rows = view.rows.saturating_add_signed(delta).clamp(MIN_ROWS, MAX_ROWS);
        if rows == view.rows {
            return;
        }

        self.collect_retired();
        let generator = match self.prepare_generator(idx, rows) {
            Ok(generator) => generator,
            Err(err) => {
                self.status = Some(err.to_string());
                return;
            }
        };

        match self.swap_tx.try_send(GeneratorSwap::new(idx, generator)) {
            Ok(()) => {
                let view = &mut self.channels[idx];
                view.rows = rows;
                log::info!("Channel '{}' reconfigured to {} rows", view.name, rows);
                self.status = Some(format!("{}: {} rows", view.name, rows));
            }
            Err(TrySendError::Full(swap)) => {
                self.spares[idx] = Some(swap.generator);
                self.status = Some("Audio thread busy, try again".to_string());
            }
            Err(TrySendError::Disconnected(_)) => {
                log::warn!("Audio stream is gone, cannot reconfigure");
                self.status = Some("Audio stream stopped".to_string());
            }
        }
    }

    /// Reconfigure a spare generator if one came back, otherwise build one
    /// Runs on the UI thread, so allocation here is fine
    fn prepare_generator(&mut self, idx: usize, rows: usize) -> Result<ChannelNoise, NoiseError> {
        match self.spares[idx].take() {
            Some(mut spare) => {
                spare.reconfigure(rows)?;
                Ok(spare)
            }
            None => {
                let view = &self.channels[idx];
                PinkNoise::new(rows, view.source.build(view.seed))
            }
        }
    }

    /// Mark app for quit
    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::engine::{NoiseChannel, NoiseEngine};
    use crate::config::NoiseConfig;
    use crossbeam_channel::bounded;

    fn config() -> NoiseConfig {
        let yaml = r#"
channels:
  - name: "Left"
    audioch: 1
    rows: 4
    seed: 1
  - name: "Right"
    audioch: 2
    rows: 30
    source: lcg
"#;
        serde_yaml::from_str(yaml).unwrap()
    }

    fn app(
        capacity: usize,
    ) -> (App, Receiver<GeneratorSwap>, Sender<GeneratorSwap>) {
        let config = config();
        let (swap_tx, swap_rx) = bounded(capacity);
        let (retired_tx, retired_rx) = bounded(capacity);
        let meters = Arc::new(ChannelMeters::new(config.channels.len()));
        let app = App::new(&config.channels, "test".to_string(), 48_000, meters, swap_tx, retired_rx);
        (app, swap_rx, retired_tx)
    }

    #[test]
    fn test_channel_navigation_wraps() {
        let (mut app, _swap_rx, _retired_tx) = app(4);
        assert_eq!(app.selected, 0);
        app.prev_channel();
        assert_eq!(app.selected, 1);
        app.next_channel();
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn test_increase_rows_sends_generator() {
        let (mut app, swap_rx, _retired_tx) = app(4);
        app.increase_rows();

        assert_eq!(app.channels[0].rows, 5);
        let swap = swap_rx.try_recv().unwrap();
        assert_eq!(swap.channel, 0);
        assert_eq!(swap.generator.row_count(), 5);
        assert_eq!(swap.generator.index(), 0);
    }

    #[test]
    fn test_rebuilt_generator_keeps_configured_seed() {
        let (mut app, swap_rx, _retired_tx) = app(4);
        app.increase_rows();

        let mut rebuilt = swap_rx.try_recv().unwrap().generator;
        let mut expected = PinkNoise::new(5, SourceKind::Small.build(Some(1))).unwrap();
        for _ in 0..256 {
            assert_eq!(rebuilt.generate().to_bits(), expected.generate().to_bits());
        }
    }

    #[test]
    fn test_rows_clamped_to_range() {
        let (mut app, swap_rx, _retired_tx) = app(4);
        app.next_channel();
        app.increase_rows();

        assert_eq!(app.channels[1].rows, MAX_ROWS);
        assert!(swap_rx.try_recv().is_err());
    }

    #[test]
    fn test_retired_generator_is_reused() {
        let (mut app, swap_rx, retired_tx) = app(4);
        let retired = PinkNoise::new(4, SourceKind::Lcg.build(Some(99))).unwrap();
        retired_tx.try_send(GeneratorSwap::new(0, retired)).unwrap();

        app.decrease_rows();

        let swap = swap_rx.try_recv().unwrap();
        assert_eq!(swap.generator.row_count(), 3);
        // The spare keeps its own source rather than the channel's configured one
        assert_eq!(swap.generator.source().kind(), SourceKind::Lcg);
    }

    #[test]
    fn test_full_handoff_keeps_generator() {
        let (mut app, swap_rx, _retired_tx) = app(1);
        app.increase_rows();
        app.increase_rows();

        assert_eq!(app.channels[0].rows, 5);
        assert!(app.status.as_deref().unwrap().contains("busy"));
        assert_eq!(swap_rx.len(), 1);
    }

    #[test]
    fn test_handoff_through_engine() {
        let config = config();
        let (swap_tx, swap_rx) = bounded(4);
        let (retired_tx, retired_rx) = bounded(4);

        let channels: Vec<NoiseChannel> = config.build_channels().unwrap();
        let mut engine = NoiseEngine::new(channels).with_handoff(swap_rx, retired_tx);
        let mut app = App::new(
            &config.channels,
            "test".to_string(),
            48_000,
            engine.meters(),
            swap_tx,
            retired_rx,
        );

        app.increase_rows();
        let mut output = vec![0.0f32; 256];
        engine.process(&mut output, 2);

        assert_eq!(engine.row_counts(), vec![5, 30]);
        assert!(app.level(0) > 0.0);

        // The 4-row generator comes back and is reconfigured for the next change
        app.increase_rows();
        engine.process(&mut output, 2);
        assert_eq!(engine.row_counts(), vec![6, 30]);
        assert_eq!(app.channels[0].rows, 6);
    }
}
