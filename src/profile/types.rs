//! Voice profile descriptors.
//!
//! A profile selects the synthesis mode for a singer: a plain oscillator
//! waveform, or a bank of recorded phonemes stitched together per note.
//! These types map directly to the `voices.json` manifest schema.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::VoseError;

// ── Waveform ────────────────────────────────────────────────

/// Oscillator shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveformKind {
    #[default]
    Sine,
    Square,
    Sawtooth,
}

impl WaveformKind {
    /// Parse a waveform name, falling back to sine for anything unrecognized.
    pub fn parse_or_sine(name: &str) -> Self {
        match name.parse() {
            Ok(kind) => kind,
            Err(_) => {
                tracing::warn!(waveform = name, "unrecognized waveform, using sine");
                WaveformKind::Sine
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WaveformKind::Sine => "sine",
            WaveformKind::Square => "square",
            WaveformKind::Sawtooth => "sawtooth",
        }
    }
}

impl FromStr for WaveformKind {
    type Err = VoseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sine" => Ok(WaveformKind::Sine),
            "square" => Ok(WaveformKind::Square),
            "sawtooth" | "saw" => Ok(WaveformKind::Sawtooth),
            _ => Err(VoseError::UnknownWaveform(s.to_string())),
        }
    }
}

impl fmt::Display for WaveformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn lenient_waveform<'de, D>(deserializer: D) -> Result<WaveformKind, D::Error>
where
    D: Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    Ok(WaveformKind::parse_or_sine(&name))
}

// ── Profile ─────────────────────────────────────────────────

/// Which renderer a profile uses, and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum SynthMode {
    Oscillator {
        #[serde(default, deserialize_with = "lenient_waveform")]
        waveform: WaveformKind,
    },
    SampleConcat {
        /// Directory of `<phoneme>.wav` recordings.
        #[serde(rename = "audioDir")]
        audio_dir: PathBuf,
    },
}

/// A named singer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    /// Unique identifier (e.g. "char_001").
    pub id: String,
    /// Display name.
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(flatten)]
    pub mode: SynthMode,
}

impl VoiceProfile {
    pub fn oscillator(id: impl Into<String>, name: impl Into<String>, waveform: WaveformKind) -> Self {
        VoiceProfile {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            mode: SynthMode::Oscillator { waveform },
        }
    }

    pub fn sample_concat(
        id: impl Into<String>,
        name: impl Into<String>,
        audio_dir: impl Into<PathBuf>,
    ) -> Self {
        VoiceProfile {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            mode: SynthMode::SampleConcat {
                audio_dir: audio_dir.into(),
            },
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn is_sample_concat(&self) -> bool {
        matches!(self.mode, SynthMode::SampleConcat { .. })
    }
}

// ── Manifest ────────────────────────────────────────────────

/// The `voices.json` file: every profile a project can switch between.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceManifest {
    pub voices: Vec<VoiceProfile>,
}

impl VoiceManifest {
    /// Resolve relative sample directories against the manifest's location.
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        for voice in &mut self.voices {
            if let SynthMode::SampleConcat { audio_dir } = &mut voice.mode {
                if audio_dir.is_relative() {
                    *audio_dir = base_dir.join(&*audio_dir);
                }
            }
        }
    }
}
