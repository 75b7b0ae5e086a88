//! Synthesis engine: owns the profile registry and the active voice.
//!
//! The active voice is an immutable [`ActiveVoice`] snapshot behind an
//! `ArcSwapOption`. Switching profiles builds a complete new snapshot (loading
//! any phoneme bank first) and then swaps it in, so a render or stream pull
//! in flight keeps the snapshot it started with. Switches themselves are
//! serialized by a mutex; readers never take it.
//!
//! Replaced snapshots are parked in a retire list and only dropped by a
//! later switch once nothing else holds them, so an audio callback never
//! releases the last reference to a phoneme bank.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

use crate::config::EngineConfig;
use crate::error::{Result, VoseError};
use crate::model::{NoteEvent, PitchEvent, RenderWindow, SynthesisRequest};
use crate::profile::{PhonemeBank, SynthMode, VoiceProfile, VoiceRegistry};

use super::mixer;
use super::oscillator::OscillatorVoice;
use super::renderer::render_wav;
use super::sampler::ConcatVoice;
use super::stream::StreamDriver;
use super::voice::{ActiveVoice, NoteRenderer, VoiceRenderer};

/// Renders note tracks with the currently selected voice profile.
pub struct SynthEngine {
    config: EngineConfig,
    registry: VoiceRegistry,
    active: Arc<ArcSwapOption<ActiveVoice>>,
    /// Replaced snapshots; the lock also serializes switches.
    retired: Mutex<Vec<Arc<ActiveVoice>>>,
}

impl SynthEngine {
    /// An engine with the built-in oscillator profiles and no active voice.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_registry(config, VoiceRegistry::with_defaults())
    }

    pub fn with_registry(config: EngineConfig, registry: VoiceRegistry) -> Result<Self> {
        config.validate()?;
        Ok(SynthEngine {
            config,
            registry,
            active: Arc::new(ArcSwapOption::empty()),
            retired: Mutex::new(Vec::new()),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &VoiceRegistry {
        &self.registry
    }

    /// Add or replace a profile. Does not affect the active voice.
    pub fn register_profile(&mut self, profile: VoiceProfile) {
        self.registry.register(profile);
    }

    // ── Voice selection ─────────────────────────────────────

    /// Make profile `id` the active voice.
    ///
    /// On failure the previously active voice (if any) stays active.
    pub fn set_active_voice(&self, id: &str) -> Result<Arc<ActiveVoice>> {
        let mut retired = self.retired.lock();

        let profile = self.registry.require(id)?.clone();
        let renderer = match self.build_renderer(&profile) {
            Ok(renderer) => renderer,
            Err(e) => {
                tracing::warn!(profile = id, error = %e, "voice switch failed; keeping previous voice");
                return Err(e);
            }
        };

        let voice = Arc::new(ActiveVoice::new(profile, renderer));
        self.publish(&mut retired, Some(Arc::clone(&voice)));
        tracing::info!(profile = id, name = voice.profile.name.as_str(), "active voice switched");
        Ok(voice)
    }

    /// Activate a profile rendered by an external backend.
    pub fn set_custom_voice(&self, profile: VoiceProfile, backend: Arc<dyn NoteRenderer>) -> Arc<ActiveVoice> {
        let mut retired = self.retired.lock();
        let voice = Arc::new(ActiveVoice::new(profile, VoiceRenderer::External(backend)));
        self.publish(&mut retired, Some(Arc::clone(&voice)));
        tracing::info!(profile = voice.profile.id.as_str(), "active voice switched to external backend");
        voice
    }

    pub fn clear_active_voice(&self) {
        let mut retired = self.retired.lock();
        self.publish(&mut retired, None);
    }

    /// Drop retired snapshots nobody holds any more. Call from a
    /// non-realtime thread; switches also do this.
    pub fn collect_retired(&self) -> usize {
        let mut retired = self.retired.lock();
        retired.retain(|v| Arc::strong_count(v) > 1);
        retired.len()
    }

    fn publish(&self, retired: &mut Vec<Arc<ActiveVoice>>, voice: Option<Arc<ActiveVoice>>) {
        if let Some(previous) = self.active.swap(voice) {
            retired.push(previous);
        }
        retired.retain(|v| Arc::strong_count(v) > 1);
    }

    /// The current voice snapshot.
    pub fn active_voice(&self) -> Option<Arc<ActiveVoice>> {
        self.active.load_full()
    }

    fn build_renderer(&self, profile: &VoiceProfile) -> Result<VoiceRenderer> {
        match &profile.mode {
            SynthMode::Oscillator { waveform } => {
                let mut voice = OscillatorVoice::new(*waveform);
                voice.fade_seconds = self.config.note_fade_seconds;
                voice.gain = self.config.oscillator_gain;
                Ok(VoiceRenderer::Oscillator(voice))
            }
            SynthMode::SampleConcat { audio_dir } => self.load_concat(profile, audio_dir),
        }
    }

    #[cfg(feature = "wav")]
    fn load_concat(&self, _profile: &VoiceProfile, audio_dir: &std::path::Path) -> Result<VoiceRenderer> {
        let bank = crate::profile::loader::load_phoneme_dir(audio_dir, self.config.sample_rate)?;
        let mut voice = ConcatVoice::new(Arc::new(bank));
        voice.crossfade_seconds = self.config.crossfade_seconds;
        Ok(VoiceRenderer::Concat(voice))
    }

    #[cfg(not(feature = "wav"))]
    fn load_concat(&self, profile: &VoiceProfile, _audio_dir: &std::path::Path) -> Result<VoiceRenderer> {
        Err(VoseError::UnsupportedMode(profile.id.clone(), "wav"))
    }

    /// Activate a sample-concatenation voice from an already loaded bank.
    pub fn set_concat_voice(&self, profile: VoiceProfile, bank: PhonemeBank) -> Arc<ActiveVoice> {
        let mut retired = self.retired.lock();
        let phonemes = bank.len();
        let mut concat = ConcatVoice::new(Arc::new(bank));
        concat.crossfade_seconds = self.config.crossfade_seconds;
        let voice = Arc::new(ActiveVoice::new(profile, VoiceRenderer::Concat(concat)));
        self.publish(&mut retired, Some(Arc::clone(&voice)));
        tracing::info!(profile = voice.profile.id.as_str(), phonemes, "active voice switched");
        voice
    }

    // ── Offline rendering ───────────────────────────────────

    /// Render `[start_time, end_time)` of the track with the active voice.
    ///
    /// The result is exactly `round((end_time - start_time) * sample_rate)`
    /// samples long; an empty or inverted window gives an empty buffer.
    pub fn render_track(
        &self,
        notes: &[NoteEvent],
        pitch_events: &[PitchEvent],
        start_time: f64,
        end_time: f64,
    ) -> Result<Vec<f32>> {
        let voice = self.active.load_full().ok_or(VoseError::NoActiveVoice)?;
        Ok(mixer::render_track(
            &voice.renderer,
            notes,
            pitch_events,
            RenderWindow::new(start_time, end_time),
            self.config.rate(),
        ))
    }

    /// [`render_track`](Self::render_track), stopping with
    /// [`VoseError::Cancelled`] once `cancel` is set.
    pub fn render_track_cancellable(
        &self,
        notes: &[NoteEvent],
        pitch_events: &[PitchEvent],
        start_time: f64,
        end_time: f64,
        cancel: &AtomicBool,
    ) -> Result<Vec<f32>> {
        let voice = self.active.load_full().ok_or(VoseError::NoActiveVoice)?;
        mixer::render_track_cancellable(
            &voice.renderer,
            notes,
            pitch_events,
            RenderWindow::new(start_time, end_time),
            self.config.rate(),
            Some(cancel),
        )
    }

    pub fn render_request(&self, request: &SynthesisRequest) -> Result<Vec<f32>> {
        self.render_track(&request.notes, &request.pitch_events, request.start_time, request.end_time)
    }

    /// Render from zero to the end of the last note plus a short tail,
    /// ignoring the request's own window.
    pub fn render_request_full(&self, request: &SynthesisRequest) -> Result<Vec<f32>> {
        let window = request.full_extent();
        self.render_track(&request.notes, &request.pitch_events, window.start, window.end)
    }

    /// Render a window and encode it as a 16-bit mono WAV file.
    pub fn render_track_wav(
        &self,
        notes: &[NoteEvent],
        pitch_events: &[PitchEvent],
        start_time: f64,
        end_time: f64,
    ) -> Result<Vec<u8>> {
        let samples = self.render_track(notes, pitch_events, start_time, end_time)?;
        Ok(render_wav(&samples, self.config.sample_rate))
    }

    // ── Streaming ───────────────────────────────────────────

    /// A pull driver that follows this engine's active voice.
    pub fn stream_driver(&self) -> StreamDriver {
        StreamDriver::new(Arc::clone(&self.active), self.config.sample_rate, self.config.block_frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{SampleBuffer, WaveformKind};
    use std::ops::Range;
    use std::sync::atomic::Ordering;

    use crate::dsp::voice::{NoteJob, RenderCarry};

    fn engine(sample_rate: u32) -> SynthEngine {
        SynthEngine::new(EngineConfig::with_sample_rate(sample_rate)).unwrap()
    }

    #[test]
    fn render_requires_active_voice() {
        let engine = engine(8000);
        let notes = [NoteEvent::new(69, 0.0, 1.0, 100)];
        let err = engine.render_track(&notes, &[], 0.0, 1.0).unwrap_err();
        assert!(matches!(err, VoseError::NoActiveVoice));
    }

    #[test]
    fn unknown_profile_keeps_previous_voice() {
        let engine = engine(8000);
        engine.set_active_voice("char_001").unwrap();
        let err = engine.set_active_voice("nobody").unwrap_err();
        assert!(matches!(err, VoseError::UnknownProfile(_)));
        assert_eq!(engine.active_voice().unwrap().profile.id, "char_001");
    }

    #[test]
    fn missing_sample_dir_keeps_previous_voice() {
        let mut engine = engine(8000);
        engine.register_profile(VoiceProfile::sample_concat("ghost", "Ghost", "/definitely/not/here"));
        engine.set_active_voice("sine").unwrap();

        let err = engine.set_active_voice("ghost").unwrap_err();
        assert!(matches!(err, VoseError::MissingSampleDir(_)));
        assert_eq!(engine.active_voice().unwrap().profile.id, "sine");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = EngineConfig {
            sample_rate: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(SynthEngine::new(config), Err(VoseError::Config(_))));
    }

    #[test]
    fn eight_hertz_scenario() {
        let engine = engine(8);
        engine.set_active_voice("sine").unwrap();
        let notes = [NoteEvent::new(69, 0.0, 1.0, 127)];
        let out = engine.render_track(&notes, &[], 0.0, 1.0).unwrap();

        assert_eq!(out.len(), 8);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[7], 0.0);
        assert!(out.iter().all(|s| s.abs() <= 0.5));

        // Inner samples follow sin of the accumulated phase at full envelope
        let inc = std::f64::consts::TAU * 440.0 / 8.0;
        let mut phase = 0.0_f64;
        for (k, &s) in out.iter().enumerate() {
            phase = (phase + inc) % std::f64::consts::TAU;
            if (1..7).contains(&k) {
                let expected = (phase.sin() * 0.5) as f32;
                assert!((s - expected).abs() < 1e-6, "sample {k}: {s} vs {expected}");
            }
        }
    }

    #[test]
    fn empty_inputs_render_silence() {
        let engine = engine(1000);
        engine.set_active_voice("char_002").unwrap();
        assert_eq!(engine.render_track(&[], &[], 0.0, 0.5).unwrap(), vec![0.0; 500]);
        assert!(engine.render_track(&[], &[], 2.0, 1.0).unwrap().is_empty());
    }

    #[test]
    fn config_flows_into_oscillator() {
        let config = EngineConfig {
            sample_rate: 1000,
            oscillator_gain: 0.25,
            ..EngineConfig::default()
        };
        let engine = SynthEngine::new(config).unwrap();
        let voice = engine.set_active_voice("char_002").unwrap();
        match &voice.renderer {
            VoiceRenderer::Oscillator(osc) => {
                assert_eq!(osc.waveform, WaveformKind::Square);
                assert_eq!(osc.gain, 0.25);
            }
            other => panic!("expected oscillator, got {other:?}"),
        }
    }

    #[test]
    fn concat_voice_from_bank() {
        let engine = engine(1000);
        let bank = PhonemeBank::new().with_sample("a", SampleBuffer::new(vec![1.0; 10], 1000));
        engine.set_concat_voice(VoiceProfile::sample_concat("c", "C", "unused"), bank);

        let notes = [NoteEvent::new(60, 0.1, 0.1, 127).with_phonemes(["a"])];
        let out = engine.render_track(&notes, &[], 0.0, 0.3).unwrap();
        assert_eq!(out.len(), 300);
        assert!(out[..100].iter().all(|&s| s == 0.0));
        assert!(out[100..200].iter().all(|&s| (s - 1.0).abs() < 1e-6));
        assert!(out[200..].iter().all(|&s| s == 0.0));
    }

    #[cfg(feature = "wav")]
    #[test]
    fn concat_voice_loaded_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 1000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(dir.path().join("a.wav"), spec).unwrap();
        for _ in 0..50 {
            writer.write_sample(i16::MAX / 2).unwrap();
        }
        writer.finalize().unwrap();

        let mut engine = engine(1000);
        engine.register_profile(VoiceProfile::sample_concat("bank", "Bank", dir.path()));
        let voice = engine.set_active_voice("bank").unwrap();
        assert!(voice.profile.is_sample_concat());

        let notes = [NoteEvent::new(60, 0.0, 0.2, 127).with_phonemes(["a"])];
        let out = engine.render_track(&notes, &[], 0.0, 0.2).unwrap();
        assert_eq!(out.len(), 200);
        assert!(out.iter().all(|&s| (s - 0.5).abs() < 1e-3));
    }

    #[test]
    fn external_backend() {
        struct Constant;
        impl NoteRenderer for Constant {
            fn render_range(&self, _job: &NoteJob<'_>, _range: Range<usize>, _carry: &mut RenderCarry, out: &mut [f32]) {
                out.fill(0.125);
            }
        }

        let engine = engine(100);
        engine.set_custom_voice(VoiceProfile::oscillator("ext", "External", WaveformKind::Sine), Arc::new(Constant));
        let notes = [NoteEvent::new(60, 0.5, 0.2, 127)];
        let out = engine.render_track(&notes, &[], 0.0, 1.0).unwrap();
        assert_eq!(out.iter().filter(|&&s| s == 0.125).count(), 20);
    }

    #[test]
    fn replaced_snapshot_is_freed_by_switcher() {
        let engine = engine(8000);
        engine.set_active_voice("char_001").unwrap();

        // A reader (the stream driver) still holds the old snapshot
        let held = engine.active_voice().unwrap();
        let weak = Arc::downgrade(&held);
        engine.set_active_voice("char_002").unwrap();

        // The reader letting go must not free it
        drop(held);
        assert!(weak.upgrade().is_some());

        // The next switch, on this thread, does
        engine.set_active_voice("sine").unwrap();
        assert!(weak.upgrade().is_none());
        assert_eq!(engine.collect_retired(), 0);
    }

    #[test]
    fn unheld_snapshot_is_freed_immediately() {
        let engine = engine(8000);
        let weak = Arc::downgrade(&engine.set_active_voice("char_001").unwrap());
        engine.clear_active_voice();
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn full_request_renders_past_last_note() {
        let engine = engine(1000);
        engine.set_active_voice("sine").unwrap();
        let request = SynthesisRequest {
            notes: vec![NoteEvent::new(69, 0.2, 0.5, 100), NoteEvent::new(72, 0.0, 0.3, 100)],
            pitch_events: Vec::new(),
            start_time: 0.0,
            end_time: 0.1,
        };
        let out = engine.render_request_full(&request).unwrap();
        assert_eq!(out.len(), 1200);
        assert!(out[1000..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn held_snapshot_survives_switch() {
        let engine = engine(8000);
        let before = engine.set_active_voice("char_001").unwrap();
        engine.set_active_voice("char_002").unwrap();
        assert_eq!(before.profile.id, "char_001");
        assert_eq!(engine.active_voice().unwrap().profile.id, "char_002");

        engine.clear_active_voice();
        assert!(engine.active_voice().is_none());
    }

    #[test]
    fn cancelled_render() {
        let engine = engine(8000);
        engine.set_active_voice("sine").unwrap();
        let cancel = AtomicBool::new(false);
        let notes = [NoteEvent::new(69, 0.0, 0.5, 100)];
        assert_eq!(
            engine.render_track_cancellable(&notes, &[], 0.0, 0.5, &cancel).unwrap(),
            engine.render_track(&notes, &[], 0.0, 0.5).unwrap()
        );

        cancel.store(true, Ordering::Relaxed);
        let err = engine.render_track_cancellable(&notes, &[], 0.0, 0.5, &cancel).unwrap_err();
        assert!(matches!(err, VoseError::Cancelled));
    }

    #[test]
    fn request_and_wav() {
        let engine = engine(8000);
        engine.set_active_voice("sine").unwrap();
        let request = SynthesisRequest {
            notes: vec![NoteEvent::new(69, 0.0, 0.25, 100)],
            pitch_events: vec![PitchEvent::new(0.1, 4000)],
            start_time: 0.0,
            end_time: 0.25,
        };
        let samples = engine.render_request(&request).unwrap();
        assert_eq!(samples.len(), 2000);

        let wav = engine
            .render_track_wav(&request.notes, &request.pitch_events, 0.0, 0.25)
            .unwrap();
        assert_eq!(wav.len(), 44 + 2000 * 2);
    }
}
