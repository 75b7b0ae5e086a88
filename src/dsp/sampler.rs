//! Sample-concatenation synthesis.
//!
//! A note's samples are divided evenly between its phonemes. Each phoneme's
//! recording is time-stretched to its slot, consecutive slots overlap by a
//! short linear crossfade, and the result is scaled by velocity. Pitch bend
//! is not applied in this mode.

use std::ops::Range;
use std::sync::Arc;

use crate::model::NoteEvent;
use crate::profile::PhonemeBank;

use super::voice::{NoteJob, NoteRenderer, RenderCarry};

/// Where each phoneme of a note lands, in note-local samples.
///
/// With `spp = total / count` and `fade = min(crossfade, spp)`, phoneme `p`
/// starts at `p * (spp - fade)` and overlaps its predecessor by `fade`
/// samples. Every phoneme but the last is `spp` long; the last one runs to
/// the end of the note and absorbs the rounding slack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhonemeLayout {
    total: usize,
    count: usize,
    per_phoneme: usize,
    fade: usize,
}

impl PhonemeLayout {
    pub fn plan(total: usize, count: usize, crossfade: usize) -> Self {
        let per_phoneme = if count == 0 { 0 } else { total / count };
        let fade = if count > 1 { crossfade.min(per_phoneme) } else { 0 };
        PhonemeLayout {
            total,
            count,
            per_phoneme,
            fade,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn samples_per_phoneme(&self) -> usize {
        self.per_phoneme
    }

    /// Crossfade length into phoneme `p`.
    pub fn fade_in(&self, p: usize) -> usize {
        if p == 0 { 0 } else { self.fade }
    }

    /// Note-local sample range phoneme `p` writes.
    pub fn segment(&self, p: usize) -> Range<usize> {
        let start = p * (self.per_phoneme - self.fade);
        let end = if p + 1 == self.count {
            self.total
        } else {
            start + self.per_phoneme
        };
        start..end
    }
}

/// Phoneme-stitching voice backed by a shared, immutable phoneme bank.
#[derive(Debug, Clone)]
pub struct ConcatVoice {
    bank: Arc<PhonemeBank>,
    /// Crossfade between consecutive phonemes, in seconds.
    pub crossfade_seconds: f64,
}

impl ConcatVoice {
    pub fn new(bank: Arc<PhonemeBank>) -> Self {
        ConcatVoice {
            bank,
            crossfade_seconds: 0.005,
        }
    }

    pub fn bank(&self) -> &PhonemeBank {
        &self.bank
    }

    fn crossfade_samples(&self, sample_rate: f64) -> usize {
        (self.crossfade_seconds * sample_rate) as usize
    }

    /// Phonemes referenced by `notes` that the bank has no recording for,
    /// sorted and without duplicates.
    pub fn missing_phonemes<'a>(&self, notes: &'a [NoteEvent]) -> Vec<&'a str> {
        let mut missing: Vec<&str> = notes
            .iter()
            .flat_map(|note| note.phonemes.iter())
            .map(String::as_str)
            .filter(|phoneme| self.bank.get(phoneme).is_none())
            .collect();
        missing.sort_unstable();
        missing.dedup();
        missing
    }
}

impl NoteRenderer for ConcatVoice {
    fn report_missing(&self, notes: &[NoteEvent]) {
        for phoneme in self.missing_phonemes(notes) {
            tracing::warn!(phoneme, "missing phoneme sample, its slot will be silent");
        }
    }

    fn render_range(&self, job: &NoteJob<'_>, range: Range<usize>, _carry: &mut RenderCarry, out: &mut [f32]) {
        debug_assert_eq!(out.len(), range.len());
        out.fill(0.0);

        let note = job.note;
        if note.phonemes.is_empty() {
            return;
        }

        let total = note.span(job.sample_rate).len;
        let layout = PhonemeLayout::plan(total, note.phonemes.len(), self.crossfade_samples(job.sample_rate));

        // Phonemes are written in order; inside a crossfade the previous
        // content fades out as the new phoneme fades in.
        for (p, phoneme) in note.phonemes.iter().enumerate() {
            let segment = layout.segment(p);
            let lo = segment.start.max(range.start);
            let hi = segment.end.min(range.end);
            if lo >= hi {
                continue;
            }

            // A phoneme with no recording leaves its slot untouched
            let Some(source) = self.bank.get(phoneme) else {
                continue;
            };

            let seg_len = segment.len();
            let fade = layout.fade_in(p);
            for k in lo..hi {
                let i = k - segment.start;
                let value = source.stretched(i, seg_len);
                let slot = &mut out[k - range.start];
                if i < fade {
                    let w = i as f32 / fade as f32;
                    *slot = *slot * (1.0 - w) + value * w;
                } else {
                    *slot = value;
                }
            }
        }

        let gain = note.gain() as f32;
        for s in out.iter_mut() {
            *s *= gain;
        }
    }
}
