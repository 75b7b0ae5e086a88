//! Per-note fade envelope.

/// Linear fade-in / fade-out over a note of known length.
///
/// The gain of sample `k` depends only on `k`, so any slice of a note can
/// be rendered on its own and still match the full render.
#[derive(Debug, Clone, Copy)]
pub struct NoteEnvelope {
    /// Fade length in samples (at least one).
    fade: f64,
    /// Note length in samples.
    len: usize,
}

impl NoteEnvelope {
    /// Fade over `fade_seconds`, or half the note if the note is shorter.
    pub fn new(duration: f64, len: usize, fade_seconds: f64, sample_rate: f64) -> Self {
        let fade = (fade_seconds.min(duration / 2.0) * sample_rate).max(1.0);
        NoteEnvelope { fade, len }
    }

    /// Gain in [0, 1] at sample `k` of the note.
    pub fn gain_at(&self, k: usize) -> f64 {
        if k >= self.len {
            return 0.0;
        }
        let rise = k as f64 / self.fade;
        let fall = (self.len - 1 - k) as f64 / self.fade;
        rise.min(fall).clamp(0.0, 1.0)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
