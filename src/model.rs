//! Score data handed to the engine: notes, pitch-bend points, render windows.
//!
//! Field names on the wire match the project file / clipboard format used by
//! the editor (`pitch`, `start`, `duration`, `velocity`, `lyrics`).

use serde::{Deserialize, Serialize};

/// Convert a time in seconds to a sample index on the engine grid.
///
/// This is the only place a time becomes a sample count, so adjoining
/// windows never gap or overlap by a sample.
pub fn seconds_to_samples(seconds: f64, sample_rate: f64) -> i64 {
    (seconds * sample_rate).round() as i64
}

// ── Notes ───────────────────────────────────────────────────

/// A single sung note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// MIDI note number (69 = A4).
    #[serde(rename = "pitch", alias = "note_number")]
    pub note_number: u8,
    /// Start time in seconds.
    #[serde(rename = "start", alias = "start_time")]
    pub start_time: f64,
    /// Length in seconds.
    pub duration: f64,
    /// MIDI velocity (0-127).
    pub velocity: u8,
    #[serde(default, rename = "lyrics", alias = "lyric")]
    pub lyric: String,
    /// Phoneme labels, in order. Only the sample-concatenation voice reads these.
    #[serde(default)]
    pub phonemes: Vec<String>,
    /// Editor selection state. Ignored by the engine.
    #[serde(skip)]
    pub is_selected: bool,
    /// Editor playback highlight. Ignored by the engine.
    #[serde(skip)]
    pub is_playing: bool,
}

impl NoteEvent {
    pub fn new(note_number: u8, start_time: f64, duration: f64, velocity: u8) -> Self {
        NoteEvent {
            note_number,
            start_time,
            duration,
            velocity,
            lyric: String::new(),
            phonemes: Vec::new(),
            is_selected: false,
            is_playing: false,
        }
    }

    pub fn with_lyric(mut self, lyric: impl Into<String>) -> Self {
        self.lyric = lyric.into();
        self
    }

    pub fn with_phonemes<I, S>(mut self, phonemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phonemes = phonemes.into_iter().map(Into::into).collect();
        self
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Velocity as a linear gain in [0, 1].
    pub fn gain(&self) -> f64 {
        self.velocity as f64 / 127.0
    }

    /// Absolute samples this note occupies.
    pub fn span(&self, sample_rate: f64) -> SampleSpan {
        let len = seconds_to_samples(self.duration, sample_rate).max(0) as usize;
        SampleSpan::new(seconds_to_samples(self.start_time, sample_rate), len)
    }
}

// ── Pitch Bend ──────────────────────────────────────────────

/// A pitch-bend point. The curve holds this value until the next point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchEvent {
    /// Time in seconds.
    pub time: f64,
    /// Bend in [-8192, 8191]; the extremes are ±2 semitones.
    pub value: i32,
}

impl PitchEvent {
    pub const MIN: i32 = -8192;
    pub const MAX: i32 = 8191;

    pub fn new(time: f64, value: i32) -> Self {
        PitchEvent { time, value }
    }
}

// ── Windows & Spans ─────────────────────────────────────────

/// The absolute time range a render should cover.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderWindow {
    pub start: f64,
    pub end: f64,
}

impl RenderWindow {
    pub fn new(start: f64, end: f64) -> Self {
        RenderWindow { start, end }
    }

    /// A window with `end <= start` renders nothing.
    pub fn is_empty(&self) -> bool {
        !(self.end > self.start)
    }

    /// Output samples for this window: starts at `round(start * sr)` and is
    /// exactly `round((end - start) * sr)` samples long.
    pub fn span(&self, sample_rate: f64) -> SampleSpan {
        if self.is_empty() {
            return SampleSpan::new(seconds_to_samples(self.start, sample_rate), 0);
        }
        let len = seconds_to_samples(self.end - self.start, sample_rate).max(0) as usize;
        SampleSpan::new(seconds_to_samples(self.start, sample_rate), len)
    }
}

/// A half-open range of absolute sample indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSpan {
    pub start: i64,
    pub len: usize,
}

impl SampleSpan {
    pub fn new(start: i64, len: usize) -> Self {
        SampleSpan { start, len }
    }

    pub fn end(&self) -> i64 {
        self.start + self.len as i64
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The samples both spans cover, if any.
    pub fn intersect(&self, other: &SampleSpan) -> Option<SampleSpan> {
        let start = self.start.max(other.start);
        let end = self.end().min(other.end());
        if start < end {
            Some(SampleSpan::new(start, (end - start) as usize))
        } else {
            None
        }
    }
}

// ── Synthesis Request ───────────────────────────────────────

/// One offline render job, as sent over the WASM / JSON boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub notes: Vec<NoteEvent>,
    #[serde(default, alias = "pitch_data")]
    pub pitch_events: Vec<PitchEvent>,
    pub start_time: f64,
    pub end_time: f64,
}

impl SynthesisRequest {
    /// Silence appended after the last note by [`full_extent`](Self::full_extent).
    pub const TAIL_SECONDS: f64 = 0.5;

    pub fn window(&self) -> RenderWindow {
        RenderWindow::new(self.start_time, self.end_time)
    }

    /// The window covering the whole track: from zero to the end of the
    /// last-ending note plus [`TAIL_SECONDS`](Self::TAIL_SECONDS).
    pub fn full_extent(&self) -> RenderWindow {
        let last_end = self.notes.iter().map(NoteEvent::end_time).fold(0.0, f64::max);
        RenderWindow::new(0.0, last_end + Self::TAIL_SECONDS)
    }
}
