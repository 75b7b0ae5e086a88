//! Phase-accumulating oscillator voice.
//!
//! Each sample advances the phase by `2π·f/sr` where `f` is the note's
//! frequency with the pitch bend in effect at that sample. Accumulating
//! (rather than computing phase from absolute time) keeps bend changes
//! click-free.

use std::f64::consts::TAU;
use std::ops::Range;

use crate::model::NoteEvent;
use crate::profile::WaveformKind;

use super::envelope::NoteEnvelope;
use super::pitch::{apply_pitch_bend, value_to_hz, PitchCurve};
use super::voice::{NoteJob, NoteRenderer, RenderCarry};

impl WaveformKind {
    /// Waveform value at `phase` (radians).
    pub fn sample(&self, phase: f64) -> f64 {
        match self {
            WaveformKind::Sine => phase.sin(),
            WaveformKind::Square => {
                let s = phase.sin();
                if s > 0.0 {
                    1.0
                } else if s < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            }
            WaveformKind::Sawtooth => 2.0 * ((phase / TAU).rem_euclid(1.0) - 0.5),
        }
    }
}

/// Oscillator synthesis for one voice profile.
#[derive(Debug, Clone)]
pub struct OscillatorVoice {
    pub waveform: WaveformKind,
    /// Fade-in / fade-out time per note, in seconds.
    pub fade_seconds: f64,
    /// Fixed output gain before velocity.
    pub gain: f64,
}

impl OscillatorVoice {
    pub fn new(waveform: WaveformKind) -> Self {
        OscillatorVoice {
            waveform,
            fade_seconds: 0.01,
            gain: 0.5,
        }
    }
}

/// Phase increment for sample `k` of `note`.
fn phase_inc(note: &NoteEvent, curve: &PitchCurve, base_hz: f64, k: usize, sample_rate: f64) -> f64 {
    let time = note.start_time + k as f64 / sample_rate;
    let hz = apply_pitch_bend(base_hz, curve.resolve(time));
    TAU * hz / sample_rate
}

/// Move `carry` to note-local index `target`, accumulating phase on the way.
///
/// The phase depends only on the note's pitch and the bend curve, never on
/// the waveform, so a carry advanced here is valid for any oscillator
/// voice. A carry already past `target` is re-seeded from the note start.
pub fn advance_phase(job: &NoteJob<'_>, carry: &mut RenderCarry, target: usize) {
    if carry.next_index > target {
        *carry = RenderCarry::default();
    }
    if carry.next_index == target {
        return;
    }
    let base_hz = value_to_hz(job.note.note_number);
    while carry.next_index < target {
        carry.phase = (carry.phase + phase_inc(job.note, job.curve, base_hz, carry.next_index, job.sample_rate)) % TAU;
        carry.next_index += 1;
    }
}

impl NoteRenderer for OscillatorVoice {
    fn render_range(&self, job: &NoteJob<'_>, range: Range<usize>, carry: &mut RenderCarry, out: &mut [f32]) {
        let NoteJob {
            note,
            curve,
            sample_rate,
        } = *job;
        debug_assert_eq!(out.len(), range.len());

        let base_hz = value_to_hz(note.note_number);
        let len = note.span(sample_rate).len;
        let envelope = NoteEnvelope::new(note.duration, len, self.fade_seconds, sample_rate);
        let amp = self.gain * note.gain();

        advance_phase(job, carry, range.start);

        for (slot, k) in out.iter_mut().zip(range) {
            carry.phase = (carry.phase + phase_inc(note, curve, base_hz, k, sample_rate)) % TAU;
            carry.next_index = k + 1;
            let value = self.waveform.sample(carry.phase) * envelope.gain_at(k) * amp;
            *slot = value as f32;
        }
    }
}
