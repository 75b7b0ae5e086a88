//! Synthesis DSP: per-note voices, the track mixer and the streaming driver.
//!
//! Offline renders and streaming pulls share the same per-note renderers and
//! the same sample grid, so both paths produce identical output for the same
//! absolute time range.

pub mod engine;
pub mod envelope;
pub mod mixer;
pub mod oscillator;
pub mod pitch;
pub mod renderer;
pub mod sampler;
pub mod stream;
pub mod voice;
