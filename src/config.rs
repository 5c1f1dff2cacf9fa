use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::audio::{AutoplayPolicy, FetchMode, GraphConfig, DEFAULT_BEAT_THRESHOLD};
use crate::graphics::{ColorScheme, VisualParameters, VisualizerType};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Player options. Every field is optional in the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerConfig {
    /// Analysis window; the player uses 256 unless told otherwise.
    pub fft_size: usize,
    pub smoothing_time_constant: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
    pub sensitivity: f32,
    pub visualizer_type: VisualizerType,
    pub color_scheme: ColorScheme,
    pub beat_threshold: f32,
    pub volume: f32,
    pub autoplay_policy: AutoplayPolicy,
    pub fetch_mode: FetchMode,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        let graph = GraphConfig::default();
        Self {
            fft_size: graph.fft_size,
            smoothing_time_constant: graph.smoothing_time_constant,
            min_decibels: graph.min_decibels,
            max_decibels: graph.max_decibels,
            sensitivity: 1.0,
            visualizer_type: VisualizerType::Bars,
            color_scheme: ColorScheme::Aurora,
            beat_threshold: DEFAULT_BEAT_THRESHOLD,
            volume: 0.8,
            autoplay_policy: graph.autoplay,
            fetch_mode: FetchMode::Cors,
        }
    }
}

impl PlayerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: PlayerConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(ConfigError::Invalid(format!(
                "fftSize must be a power of two in 32..=32768, got {}",
                self.fft_size
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing_time_constant) {
            return Err(ConfigError::Invalid(format!(
                "smoothingTimeConstant must be within [0, 1], got {}",
                self.smoothing_time_constant
            )));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(ConfigError::Invalid(format!(
                "minDecibels ({}) must be below maxDecibels ({})",
                self.min_decibels, self.max_decibels
            )));
        }
        if !(self.sensitivity > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "sensitivity must be positive, got {}",
                self.sensitivity
            )));
        }
        if !(0.0..=255.0).contains(&self.beat_threshold) {
            return Err(ConfigError::Invalid(format!(
                "beatThreshold must be within [0, 255], got {}",
                self.beat_threshold
            )));
        }
        Ok(())
    }

    pub fn graph_config(&self) -> GraphConfig {
        GraphConfig {
            fft_size: self.fft_size,
            smoothing_time_constant: self.smoothing_time_constant,
            min_decibels: self.min_decibels,
            max_decibels: self.max_decibels,
            autoplay: self.autoplay_policy,
        }
    }

    pub fn visual_parameters(&self) -> VisualParameters {
        VisualParameters {
            variant: self.visualizer_type,
            color: self.color_scheme.palette().base,
            sensitivity: self.sensitivity,
        }
    }
}
