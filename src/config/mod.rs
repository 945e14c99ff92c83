use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::audio::engine::{ChannelNoise, NoiseChannel};
use crate::dsp::pink::{self, PinkNoise};
use crate::dsp::white::SourceKind;

/// Top-level configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NoiseConfig {
    #[serde(default)]
    pub devices: DeviceConfig,

    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

impl NoiseConfig {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: NoiseConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.channels.is_empty() {
            return Err(anyhow!("Configuration must have at least one channel"));
        }

        let mut used = HashSet::new();
        for (idx, channel) in self.channels.iter().enumerate() {
            channel
                .validate()
                .with_context(|| format!("Invalid configuration for channel {}", idx))?;

            if !used.insert(channel.audioch) {
                return Err(anyhow!(
                    "Audio channel {} is assigned to more than one noise channel",
                    channel.audioch
                ));
            }
        }

        Ok(())
    }

    /// Build one routed generator per configured channel
    pub fn build_channels(&self) -> Result<Vec<NoiseChannel>> {
        self.channels
            .iter()
            .enumerate()
            .map(|(idx, channel)| {
                let generator = channel
                    .build_generator()
                    .with_context(|| format!("Failed to build generator for channel {}", idx))?;
                Ok(NoiseChannel::new(generator, channel.audio_channel_index()))
            })
            .collect()
    }
}

/// Device configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Output device name (substring match), index, or "default"
    #[serde(default = "default_audioout")]
    pub audioout: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            audioout: default_audioout(),
        }
    }
}

impl DeviceConfig {
    /// Whether the host's default output device should be used
    pub fn wants_default_output(&self) -> bool {
        self.audioout.trim().eq_ignore_ascii_case("default")
    }
}

/// Individual noise channel configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
    #[serde(default = "default_name", skip_serializing_if = "String::is_empty")]
    pub name: String,

    pub audioch: usize,

    #[serde(default = "default_rows")]
    pub rows: usize,

    #[serde(default)]
    pub source: SourceSpec,

    /// Fixed seed for a replayable stream; absent = fresh noise every run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl ChannelConfig {
    /// Validate this channel configuration
    pub fn validate(&self) -> Result<()> {
        pink::validate_row_count(self.rows)?;

        // Validate audio channel (1-indexed, must be >= 1)
        if self.audioch < 1 {
            return Err(anyhow!("Audio channel must be >= 1 (channels are 1-indexed)"));
        }

        Ok(())
    }

    /// Get the 0-indexed audio channel for internal use
    pub fn audio_channel_index(&self) -> usize {
        self.audioch.saturating_sub(1)
    }

    /// Map the configured source to a SourceKind
    pub fn source_kind(&self) -> SourceKind {
        match &self.source {
            SourceSpec::Small => SourceKind::Small,
            SourceSpec::Lcg => SourceKind::Lcg,
        }
    }

    /// Build this channel's generator
    pub fn build_generator(&self) -> Result<ChannelNoise> {
        let source = self.source_kind().build(self.seed);
        Ok(PinkNoise::new(self.rows, source)?)
    }
}

/// White noise source as written in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceSpec {
    #[default]
    Small,
    Lcg,
}

// Default value functions for serde
fn default_audioout() -> String {
    "default".to_string()
}

fn default_name() -> String {
    "Untitled".to_string()
}

fn default_rows() -> usize {
    pink::DEFAULT_ROWS
}
