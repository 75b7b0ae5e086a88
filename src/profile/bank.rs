//! Decoded phoneme recordings.

use std::collections::HashMap;
use std::sync::Arc;

/// A single mono recording loaded into memory.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    pub data: Arc<[f32]>,
    /// Native sample rate of the recording.
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(data: Vec<f32>, sample_rate: u32) -> Self {
        SampleBuffer {
            data: data.into(),
            sample_rate,
        }
    }

    /// Create from 16-bit signed PCM data.
    pub fn from_i16(pcm: &[i16], sample_rate: u32) -> Self {
        let data: Vec<f32> = pcm.iter().map(|&s| s as f32 / 32768.0).collect();
        SampleBuffer::new(data, sample_rate)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read a sample with linear interpolation at a fractional position.
    /// Positions past the last sample hold the last value.
    pub fn read_interpolated(&self, position: f64) -> f32 {
        if self.data.is_empty() || position < 0.0 {
            return 0.0;
        }

        let idx = position as usize;
        if idx >= self.data.len() - 1 {
            return self.data[self.data.len() - 1];
        }

        let frac = (position - idx as f64) as f32;
        self.data[idx] * (1.0 - frac) + self.data[idx + 1] * frac
    }

    /// Sample `index` of this recording time-stretched to `target_len` samples.
    ///
    /// Target index `i` maps to source position `i * len / target_len`, so the
    /// stretched waveform covers the recording exactly once.
    pub fn stretched(&self, index: usize, target_len: usize) -> f32 {
        if target_len == 0 {
            return 0.0;
        }
        let position = index as f64 * self.data.len() as f64 / target_len as f64;
        self.read_interpolated(position)
    }
}

/// Phoneme name → recording. Built once at load time and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct PhonemeBank {
    samples: HashMap<String, SampleBuffer>,
}

impl PhonemeBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, phoneme: impl Into<String>, buffer: SampleBuffer) {
        self.samples.insert(phoneme.into(), buffer);
    }

    pub fn with_sample(mut self, phoneme: impl Into<String>, buffer: SampleBuffer) -> Self {
        self.insert(phoneme, buffer);
        self
    }

    pub fn get(&self, phoneme: &str) -> Option<&SampleBuffer> {
        self.samples.get(phoneme)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Phoneme names, sorted.
    pub fn phonemes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.samples.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
