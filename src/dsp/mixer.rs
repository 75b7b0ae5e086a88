//! Track mixer: sums per-note renders into one buffer.
//!
//! Mixing is plain addition with no gain stage or clipping: overlapping
//! notes stack, and the result does not depend on note order.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Result, VoseError};
use crate::model::{NoteEvent, PitchEvent, RenderWindow, SampleSpan};

use super::pitch::PitchCurve;
use super::voice::{NoteJob, NoteRenderer, RenderCarry};

/// Add `src` into `dst` starting at `offset`, dropping whatever falls past the end.
pub fn accumulate(dst: &mut [f32], offset: usize, src: &[f32]) {
    if offset >= dst.len() {
        return;
    }
    let n = src.len().min(dst.len() - offset);
    for (d, &s) in dst[offset..offset + n].iter_mut().zip(&src[..n]) {
        *d += s;
    }
}

/// A summing accumulation buffer.
#[derive(Debug, Clone, Default)]
pub struct Mixer {
    buffer: Vec<f32>,
}

impl Mixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare a buffer of `num_samples` filled with zeros.
    pub fn clear(&mut self, num_samples: usize) {
        self.buffer.clear();
        self.buffer.resize(num_samples, 0.0);
    }

    /// Add a block of samples starting at `offset`.
    pub fn add(&mut self, offset: usize, samples: &[f32]) {
        accumulate(&mut self.buffer, offset, samples);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn into_output(self) -> Vec<f32> {
        self.buffer
    }
}

/// Render every note overlapping `window` and mix them into one buffer of
/// exactly `round((end - start) * sample_rate)` samples.
pub fn render_track<R: NoteRenderer + ?Sized>(
    renderer: &R,
    notes: &[NoteEvent],
    pitch_events: &[PitchEvent],
    window: RenderWindow,
    sample_rate: f64,
) -> Vec<f32> {
    let mut track = TrackMix::new(renderer, notes, pitch_events, window, sample_rate);
    for note in notes {
        track.mix(note);
    }
    track.finish(notes.len())
}

/// [`render_track`] with a cancellation flag checked between notes.
pub fn render_track_cancellable<R: NoteRenderer + ?Sized>(
    renderer: &R,
    notes: &[NoteEvent],
    pitch_events: &[PitchEvent],
    window: RenderWindow,
    sample_rate: f64,
    cancel: Option<&AtomicBool>,
) -> Result<Vec<f32>> {
    let mut track = TrackMix::new(renderer, notes, pitch_events, window, sample_rate);
    for note in notes {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Err(VoseError::Cancelled);
        }
        track.mix(note);
    }
    Ok(track.finish(notes.len()))
}

/// One offline render in progress.
struct TrackMix<'r, R: ?Sized> {
    renderer: &'r R,
    curve: PitchCurve,
    span: SampleSpan,
    sample_rate: f64,
    mixer: Mixer,
    scratch: Vec<f32>,
    rendered: usize,
}

impl<'r, R: NoteRenderer + ?Sized> TrackMix<'r, R> {
    fn new(renderer: &'r R, notes: &[NoteEvent], pitch_events: &[PitchEvent], window: RenderWindow, sample_rate: f64) -> Self {
        let span = window.span(sample_rate);
        let mut mixer = Mixer::new();
        mixer.clear(span.len);
        if !span.is_empty() {
            renderer.report_missing(notes);
        }
        TrackMix {
            renderer,
            curve: PitchCurve::new(pitch_events),
            span,
            sample_rate,
            mixer,
            scratch: Vec::new(),
            rendered: 0,
        }
    }

    /// Render the part of `note` inside the window and add it at its offset.
    fn mix(&mut self, note: &NoteEvent) {
        let note_span = note.span(self.sample_rate);
        let Some(hit) = note_span.intersect(&self.span) else {
            return;
        };

        let local_start = (hit.start - note_span.start) as usize;
        let job = NoteJob {
            note,
            curve: &self.curve,
            sample_rate: self.sample_rate,
        };
        self.scratch.clear();
        self.scratch.resize(hit.len, 0.0);
        self.renderer.render_range(
            &job,
            local_start..local_start + hit.len,
            &mut RenderCarry::default(),
            &mut self.scratch,
        );
        self.mixer.add((hit.start - self.span.start) as usize, &self.scratch);
        self.rendered += 1;
    }

    fn finish(self, notes: usize) -> Vec<f32> {
        tracing::debug!(
            notes,
            rendered = self.rendered,
            samples = self.mixer.len(),
            "rendered track window"
        );
        self.mixer.into_output()
    }
}
