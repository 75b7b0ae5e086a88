//! Pitch conversion and the step-function pitch-bend curve.

use crate::model::PitchEvent;

/// Bend value that corresponds to the full bend range.
pub const BEND_SCALE: f64 = 8192.0;
/// Full bend range in cents (±2 semitones).
pub const BEND_RANGE_CENTS: f64 = 200.0;

/// Convert a MIDI note number to frequency at A4 = 440 Hz.
pub fn value_to_hz(note_number: u8) -> f64 {
    440.0 * (2.0_f64).powf((note_number as f64 - 69.0) / 12.0)
}

/// Apply a bend value in [-8192, 8191] to a frequency.
pub fn apply_pitch_bend(base_hz: f64, bend: i32) -> f64 {
    let cents = (bend as f64 / BEND_SCALE) * BEND_RANGE_CENTS;
    base_hz * (2.0_f64).powf(cents / 1200.0)
}

/// The bend in effect at `time`: the value of the latest event at or before
/// it, or 0 before the first event. Events may be in any order; among events
/// at the same time the later one in the slice wins.
pub fn resolve_bend(events: &[PitchEvent], time: f64) -> i32 {
    let mut best: Option<&PitchEvent> = None;
    for event in events {
        if event.time <= time && best.is_none_or(|b| event.time >= b.time) {
            best = Some(event);
        }
    }
    best.map_or(0, |e| e.value)
}

/// A sorted copy of a pitch-event list for repeated lookups.
///
/// Gives the same answers as [`resolve_bend`] in O(log n).
#[derive(Debug, Clone, Default)]
pub struct PitchCurve {
    events: Vec<PitchEvent>,
}

impl PitchCurve {
    pub fn new(events: &[PitchEvent]) -> Self {
        let mut events: Vec<PitchEvent> = events.iter().copied().filter(|e| !e.time.is_nan()).collect();
        // Stable, so equal times keep input order
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        PitchCurve { events }
    }

    pub fn resolve(&self, time: f64) -> i32 {
        let idx = self.events.partition_point(|e| e.time <= time);
        if idx == 0 { 0 } else { self.events[idx - 1].value }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
