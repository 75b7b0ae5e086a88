//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VoseError};

/// Settings fixed for the lifetime of an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Scratch size for the streaming driver. Larger pulls are rendered in pieces.
    pub block_frames: usize,
    /// Per-note fade-in / fade-out time for oscillator voices, in seconds.
    pub note_fade_seconds: f64,
    /// Crossfade between consecutive phonemes, in seconds.
    pub crossfade_seconds: f64,
    /// Fixed gain applied to oscillator output.
    pub oscillator_gain: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            block_frames: 1024,
            note_fade_seconds: 0.01,
            crossfade_seconds: 0.005,
            oscillator_gain: 0.5,
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(VoseError::Config("sample_rate must be positive".into()));
        }
        if self.block_frames == 0 {
            return Err(VoseError::Config("block_frames must be positive".into()));
        }
        if !(self.note_fade_seconds >= 0.0) || !(self.crossfade_seconds >= 0.0) {
            return Err(VoseError::Config("fade times must be non-negative".into()));
        }
        Ok(())
    }

    /// Sample rate as used by the DSP code.
    pub fn rate(&self) -> f64 {
        self.sample_rate as f64
    }
}
