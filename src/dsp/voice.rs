//! Per-note rendering seam shared by the mixer and the stream driver.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::model::{NoteEvent, PitchEvent, RenderWindow};
use crate::profile::VoiceProfile;

use super::oscillator::OscillatorVoice;
use super::pitch::PitchCurve;
use super::sampler::ConcatVoice;

/// Everything a renderer needs to know about the note being rendered.
#[derive(Debug, Clone, Copy)]
pub struct NoteJob<'a> {
    pub note: &'a NoteEvent,
    pub curve: &'a PitchCurve,
    pub sample_rate: f64,
}

/// State carried from one rendered range of a note into the next.
///
/// Only the oscillator uses it (for phase continuity); other renderers
/// ignore it. A fresh carry always produces the same samples as a continued
/// one, just slower.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderCarry {
    /// Note-local index of the next sample the carry is positioned at.
    pub next_index: usize,
    pub phase: f64,
}

/// Renders samples `range` (note-local indices) of one note into `out`.
///
/// Implementations overwrite `out`, must not allocate per call beyond small
/// bounded scratch, and must give identical samples whether a note is
/// rendered whole or in consecutive pieces.
pub trait NoteRenderer: Send + Sync {
    fn render_range(&self, job: &NoteJob<'_>, range: Range<usize>, carry: &mut RenderCarry, out: &mut [f32]);

    /// Log assets `notes` need but this renderer lacks. Called off the
    /// audio thread, before rendering starts.
    fn report_missing(&self, _notes: &[NoteEvent]) {}
}

/// The synthesis strategy of the active voice profile.
#[derive(Clone)]
pub enum VoiceRenderer {
    Oscillator(OscillatorVoice),
    Concat(ConcatVoice),
    /// Any other backend honoring the same contract.
    External(Arc<dyn NoteRenderer>),
}

impl fmt::Debug for VoiceRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceRenderer::Oscillator(v) => f.debug_tuple("Oscillator").field(v).finish(),
            VoiceRenderer::Concat(v) => f.debug_tuple("Concat").field(v).finish(),
            VoiceRenderer::External(_) => f.write_str("External(..)"),
        }
    }
}

impl NoteRenderer for VoiceRenderer {
    fn render_range(&self, job: &NoteJob<'_>, range: Range<usize>, carry: &mut RenderCarry, out: &mut [f32]) {
        match self {
            VoiceRenderer::Oscillator(v) => v.render_range(job, range, carry, out),
            VoiceRenderer::Concat(v) => v.render_range(job, range, carry, out),
            VoiceRenderer::External(v) => v.render_range(job, range, carry, out),
        }
    }

    fn report_missing(&self, notes: &[NoteEvent]) {
        match self {
            VoiceRenderer::Oscillator(v) => v.report_missing(notes),
            VoiceRenderer::Concat(v) => v.report_missing(notes),
            VoiceRenderer::External(v) => v.report_missing(notes),
        }
    }
}

impl VoiceRenderer {
    /// Whether this renderer interprets [`RenderCarry`] itself. Built-in
    /// renderers share the oscillator phase carry; external ones get their own.
    pub fn is_external(&self) -> bool {
        matches!(self, VoiceRenderer::External(_))
    }
}

/// An immutable snapshot of the selected voice: its descriptor plus the
/// ready-to-use renderer (including any loaded phoneme bank).
#[derive(Debug, Clone)]
pub struct ActiveVoice {
    pub profile: VoiceProfile,
    pub renderer: VoiceRenderer,
}

impl ActiveVoice {
    pub fn new(profile: VoiceProfile, renderer: VoiceRenderer) -> Self {
        ActiveVoice { profile, renderer }
    }
}

/// Render the part of `note` that falls inside `[window_start, window_end)`.
///
/// Returns an empty buffer when the window misses the note.
pub fn render_note<R: NoteRenderer + ?Sized>(
    renderer: &R,
    note: &NoteEvent,
    pitch_events: &[PitchEvent],
    window_start: f64,
    window_end: f64,
    sample_rate: f64,
) -> Vec<f32> {
    let note_span = note.span(sample_rate);
    let window = RenderWindow::new(window_start, window_end).span(sample_rate);
    let Some(hit) = note_span.intersect(&window) else {
        return Vec::new();
    };

    let local_start = (hit.start - note_span.start) as usize;
    let curve = PitchCurve::new(pitch_events);
    let job = NoteJob {
        note,
        curve: &curve,
        sample_rate,
    };
    let mut out = vec![0.0; hit.len];
    renderer.render_range(&job, local_start..local_start + hit.len, &mut RenderCarry::default(), &mut out);
    out
}
