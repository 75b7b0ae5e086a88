//! Voice profile registry: profile id → descriptor.

use std::path::Path;

use crate::error::{Result, VoseError};

use super::types::{VoiceManifest, VoiceProfile, WaveformKind};

/// All voice profiles the host can switch between, in registration order.
#[derive(Debug, Clone, Default)]
pub struct VoiceRegistry {
    profiles: Vec<VoiceProfile>,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in oscillator singers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            VoiceProfile::oscillator("char_001", "アオイ", WaveformKind::Sawtooth)
                .with_description("元気な女性ボーカル"),
        );
        registry.register(
            VoiceProfile::oscillator("char_002", "ミライ", WaveformKind::Square)
                .with_description("落ち着いた男性ボーカル"),
        );
        registry.register(VoiceProfile::oscillator("sine", "Sine", WaveformKind::Sine));
        registry
    }

    /// Parse a `voices.json` manifest. Relative sample directories resolve
    /// against `base_dir`.
    pub fn from_manifest_str(json: &str, base_dir: &Path) -> Result<Self> {
        let mut manifest: VoiceManifest = serde_json::from_str(json)?;
        manifest.resolve_paths(base_dir);

        let mut registry = Self::new();
        for profile in manifest.voices {
            registry.register(profile);
        }
        Ok(registry)
    }

    pub fn from_manifest_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let registry = Self::from_manifest_str(&text, base_dir)?;
        tracing::info!(manifest = %path.display(), voices = registry.len(), "loaded voice manifest");
        Ok(registry)
    }

    /// Add a profile. A profile with the same id is replaced in place.
    pub fn register(&mut self, profile: VoiceProfile) {
        match self.profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
    }

    pub fn get(&self, id: &str) -> Option<&VoiceProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn require(&self, id: &str) -> Result<&VoiceProfile> {
        self.get(id)
            .ok_or_else(|| VoseError::UnknownProfile(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &VoiceProfile> {
        self.profiles.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
