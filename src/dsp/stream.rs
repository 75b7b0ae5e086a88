//! Pull-based streaming driver for a real-time audio callback.
//!
//! Each pull renders the next `frames` samples of the track starting at the
//! playback cursor. The cursor is an absolute sample index on the same grid
//! the offline renderer uses, and every note keeps its own [`RenderCarry`],
//! so the concatenated pulls are sample-for-sample identical to one offline
//! render of the same range.
//!
//! A pull never blocks, never fails and never allocates: note spans, the
//! pitch curve and per-note carries are prepared by [`StreamDriver::begin_playback`],
//! and rendering goes through a scratch buffer sized at construction.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::model::{NoteEvent, PitchEvent, SampleSpan, seconds_to_samples};

use super::mixer::accumulate;
use super::oscillator::advance_phase;
use super::pitch::PitchCurve;
use super::voice::{ActiveVoice, NoteJob, NoteRenderer, RenderCarry};

/// Note data for one playback session.
#[derive(Debug)]
struct Playback {
    notes: Vec<NoteEvent>,
    spans: Vec<SampleSpan>,
    /// Oscillator phase per note, kept at the cursor whatever voice is active.
    carries: Vec<RenderCarry>,
    /// Carries handed to an external backend, reset when it changes.
    external_carries: Vec<RenderCarry>,
    curve: PitchCurve,
}

/// Fills fixed-size output buffers on demand.
pub struct StreamDriver {
    voice: Arc<ArcSwapOption<ActiveVoice>>,
    sample_rate: f64,
    /// Absolute sample index of the next frame to produce.
    cursor: i64,
    session: Option<Playback>,
    /// Identity of the snapshot the external carries belong to.
    rendered_with: Option<usize>,
    scratch: Vec<f32>,
}

impl StreamDriver {
    /// A driver reading the voice from `voice` on every pull.
    ///
    /// The driver never holds a snapshot between pulls. Whoever swaps `voice`
    /// should keep replaced snapshots alive (as `SynthEngine` does) so the
    /// audio thread is never the one to free them.
    pub fn new(voice: Arc<ArcSwapOption<ActiveVoice>>, sample_rate: u32, block_frames: usize) -> Self {
        StreamDriver {
            voice,
            sample_rate: sample_rate as f64,
            cursor: 0,
            session: None,
            rendered_with: None,
            scratch: vec![0.0; block_frames.max(1)],
        }
    }

    /// Start playing `notes` from `start_time` seconds.
    ///
    /// Notes already sounding at `start_time` have their phase advanced to
    /// the cursor here, so the first pull costs no more than any other.
    pub fn begin_playback(&mut self, notes: Vec<NoteEvent>, pitch_events: &[PitchEvent], start_time: f64) {
        let cursor = seconds_to_samples(start_time, self.sample_rate);
        let curve = PitchCurve::new(pitch_events);
        let spans: Vec<SampleSpan> = notes.iter().map(|n| n.span(self.sample_rate)).collect();

        let carries = notes
            .iter()
            .zip(&spans)
            .map(|(note, span)| {
                let mut carry = RenderCarry::default();
                if cursor > span.start && cursor < span.end() {
                    let job = NoteJob {
                        note,
                        curve: &curve,
                        sample_rate: self.sample_rate,
                    };
                    advance_phase(&job, &mut carry, (cursor - span.start) as usize);
                }
                carry
            })
            .collect();

        if let Some(active) = self.voice.load_full() {
            active.renderer.report_missing(&notes);
        }

        tracing::debug!(notes = notes.len(), start_time, "playback started");
        self.session = Some(Playback {
            external_carries: vec![RenderCarry::default(); notes.len()],
            notes,
            spans,
            carries,
            curve,
        });
        self.rendered_with = None;
        self.cursor = cursor;
    }

    /// Drop the note data. Later pulls return silence but keep advancing time.
    pub fn stop_playback(&mut self) {
        if self.session.take().is_some() {
            tracing::debug!(time = self.playback_time(), "playback stopped");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_some()
    }

    /// Cursor position in seconds.
    pub fn playback_time(&self) -> f64 {
        self.cursor as f64 / self.sample_rate
    }

    /// Render the next `out.len()` frames into `out` and advance the cursor.
    ///
    /// `out` is always fully written; with no playback session or no
    /// active voice it is silence. The work done is proportional to
    /// `out.len()` and the number of sounding notes.
    pub fn fill(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        let chunk = SampleSpan::new(self.cursor, out.len());
        self.cursor += out.len() as i64;

        let StreamDriver {
            voice,
            sample_rate,
            session,
            rendered_with,
            scratch,
            ..
        } = self;

        let Some(session) = session.as_mut() else {
            return;
        };
        let current = voice.load_full();
        let Some(active) = current.as_ref() else {
            return;
        };

        let external = active.renderer.is_external();
        let identity = Arc::as_ptr(active) as usize;
        if external && *rendered_with != Some(identity) {
            session.external_carries.fill(RenderCarry::default());
        }
        *rendered_with = Some(identity);

        let Playback {
            notes,
            spans,
            carries,
            external_carries,
            curve,
        } = session;

        for (i, (note, span)) in notes.iter().zip(spans.iter()).enumerate() {
            let Some(hit) = span.intersect(&chunk) else {
                continue;
            };
            let job = NoteJob {
                note,
                curve: &*curve,
                sample_rate: *sample_rate,
            };

            let local_start = (hit.start - span.start) as usize;
            let out_start = (hit.start - chunk.start) as usize;
            let mut done = 0;
            while done < hit.len {
                let n = (hit.len - done).min(scratch.len());
                let piece = &mut scratch[..n];
                let from = local_start + done;
                let carry = if external { &mut external_carries[i] } else { &mut carries[i] };
                active.renderer.render_range(&job, from..from + n, carry, piece);
                // Keep the phase at the cursor while a non-oscillator voice plays
                advance_phase(&job, &mut carries[i], from + n);
                accumulate(out, out_start + done, piece);
                done += n;
            }
        }
    }

    /// Allocate and fill a buffer of `frames` samples.
    pub fn request(&mut self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        self.fill(&mut out);
        out
    }
}
