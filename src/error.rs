//! Error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the synthesis engine.
///
/// Only configuration and load-time failures live here. Degenerate input
/// (empty note lists, empty windows, notes without phonemes) renders as
/// silence, and the streaming path never fails.
#[derive(Debug, Error)]
pub enum VoseError {
    /// A render was requested before a voice profile was selected.
    #[error("no active voice profile")]
    NoActiveVoice,

    #[error("unknown voice profile '{0}'")]
    UnknownProfile(String),

    #[error("unrecognized waveform kind '{0}'")]
    UnknownWaveform(String),

    #[error("phoneme sample directory not found: {}", .0.display())]
    MissingSampleDir(PathBuf),

    #[error("no phoneme samples could be decoded from {}", .0.display())]
    NoPhonemes(PathBuf),

    /// The profile needs a capability this build does not include.
    #[error("voice profile '{0}' requires an unavailable feature: {1}")]
    UnsupportedMode(String, &'static str),

    #[error("render cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "wav")]
    #[error("WAV decode error: {0}")]
    Wav(#[from] hound::Error),
}

pub type Result<T> = std::result::Result<T, VoseError>;
