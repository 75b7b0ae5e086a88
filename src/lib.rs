pub mod config;
pub mod dsp;
pub mod error;
pub mod model;
pub mod profile;

use crate::config::EngineConfig;
use crate::dsp::engine::SynthEngine;
use crate::error::VoseError;
use crate::model::SynthesisRequest;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the vose-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Parse a JSON render request (`notes`, `pitch_events`, `start_time`, `end_time`).
pub fn parse_request(json: &str) -> Result<SynthesisRequest, VoseError> {
    Ok(serde_json::from_str(json)?)
}

/// Render a request with one of the built-in voice profiles.
pub fn render_request(
    request: &SynthesisRequest,
    voice_id: &str,
    sample_rate: u32,
) -> Result<Vec<f32>, VoseError> {
    let engine = SynthEngine::new(EngineConfig::with_sample_rate(sample_rate))?;
    engine.set_active_voice(voice_id)?;
    engine.render_request(request)
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

/// WASM-exposed: render a request object to mono f32 samples.
/// Returns the raw audio buffer for AudioWorklet playback.
#[wasm_bindgen]
pub fn render_track_samples(request: JsValue, voice_id: &str, sample_rate: u32) -> Result<Vec<f32>, JsValue> {
    let request: SynthesisRequest = serde_wasm_bindgen::from_value(request).map_err(js_error)?;
    render_request(&request, voice_id, sample_rate).map_err(js_error)
}

/// WASM-exposed: render a request object to a WAV byte array.
#[wasm_bindgen]
pub fn render_track_wav(request: JsValue, voice_id: &str, sample_rate: u32) -> Result<Vec<u8>, JsValue> {
    let request: SynthesisRequest = serde_wasm_bindgen::from_value(request).map_err(js_error)?;
    let samples = render_request(&request, voice_id, sample_rate).map_err(js_error)?;
    Ok(dsp::renderer::render_wav(&samples, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_editor_request() {
        let json = r#"{
            "notes": [
                {"pitch": 69, "start": 0.0, "duration": 0.5, "velocity": 100, "lyrics": "あ"},
                {"note_number": 72, "start_time": 0.5, "duration": 0.5, "velocity": 80}
            ],
            "pitch_data": [{"time": 0.25, "value": 4096}],
            "start_time": 0.0,
            "end_time": 1.0
        }"#;
        let request = parse_request(json).unwrap();
        assert_eq!(request.notes.len(), 2);
        assert_eq!(request.notes[0].lyric, "あ");
        assert_eq!(request.notes[1].note_number, 72);
        assert_eq!(request.pitch_events[0].value, 4096);
    }

    #[test]
    fn bad_request_is_json_error() {
        assert!(matches!(parse_request("{\"notes\": 3}"), Err(VoseError::Json(_))));
    }

    #[test]
    fn render_with_builtin_voice() {
        let request = SynthesisRequest {
            notes: vec![crate::model::NoteEvent::new(69, 0.0, 0.5, 100)],
            pitch_events: Vec::new(),
            start_time: 0.0,
            end_time: 0.5,
        };
        let samples = render_request(&request, "char_001", 8000).unwrap();
        assert_eq!(samples.len(), 4000);
        assert!(samples.iter().any(|&s| s != 0.0));

        let err = render_request(&request, "missing", 8000).unwrap_err();
        assert!(matches!(err, VoseError::UnknownProfile(_)));
    }
}
