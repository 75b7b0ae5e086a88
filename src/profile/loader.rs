//! Phoneme bank loading from a directory of WAV recordings.
//!
//! Each `<phoneme>.wav` file in the directory becomes one bank entry named
//! after the file stem:
//!
//! ```text
//! audio/aoi/
//!   a.wav
//!   i.wav
//!   k.wav
//! ```
//!
//! Recordings are decoded to mono `f32`. No resampling happens here: a file
//! whose rate differs from the engine's is logged and kept as-is, and the
//! renderer stretches every phoneme to its slot anyway.

use std::path::Path;

use crate::error::{Result, VoseError};

use super::bank::{PhonemeBank, SampleBuffer};

/// Decode every WAV file in `dir` into a [`PhonemeBank`].
///
/// Fails if the directory is missing or no file could be decoded.
pub fn load_phoneme_dir(dir: &Path, engine_sample_rate: u32) -> Result<PhonemeBank> {
    if !dir.is_dir() {
        return Err(VoseError::MissingSampleDir(dir.to_path_buf()));
    }

    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
        })
        .collect();
    paths.sort();

    let mut bank = PhonemeBank::new();
    for path in &paths {
        let Some(phoneme) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match load_wav_mono(path) {
            Ok(buffer) => {
                if buffer.sample_rate != engine_sample_rate {
                    tracing::warn!(
                        phoneme,
                        file_rate = buffer.sample_rate,
                        engine_rate = engine_sample_rate,
                        "phoneme sample rate differs from engine rate; using it unconverted"
                    );
                }
                bank.insert(phoneme, buffer);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping undecodable phoneme sample");
            }
        }
    }

    if bank.is_empty() {
        return Err(VoseError::NoPhonemes(dir.to_path_buf()));
    }

    tracing::info!(dir = %dir.display(), phonemes = bank.len(), "loaded phoneme bank");
    Ok(bank)
}

/// Decode a WAV file, averaging interleaved channels down to mono.
pub fn load_wav_mono(path: &Path) -> Result<SampleBuffer> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let raw: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let mono = if channels == 1 {
        raw
    } else {
        raw.chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    Ok(SampleBuffer::new(mono, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn loads_every_wav_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(&dir.path().join("a.wav"), 1, 44100, &[0, 16384, -16384]);
        write_wav(&dir.path().join("ka.wav"), 1, 44100, &[100; 32]);
        std::fs::write(dir.path().join("notes.txt"), "not audio").unwrap();

        let bank = load_phoneme_dir(dir.path(), 44100).unwrap();
        assert_eq!(bank.phonemes(), vec!["a", "ka"]);
        let a = bank.get("a").unwrap();
        assert_eq!(a.len(), 3);
        assert!((a.data[1] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn stereo_is_downmixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("o.wav");
        write_wav(&path, 2, 44100, &[16384, 0, 16384, 0]);

        let buf = load_wav_mono(&path).unwrap();
        assert_eq!(buf.len(), 2);
        assert!((buf.data[0] - 0.25).abs() < 1e-4);
    }

    #[test]
    fn rate_mismatch_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(&dir.path().join("u.wav"), 1, 22050, &[0; 16]);

        let bank = load_phoneme_dir(dir.path(), 44100).unwrap();
        assert_eq!(bank.get("u").unwrap().sample_rate, 22050);
    }

    #[test]
    fn corrupt_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(&dir.path().join("a.wav"), 1, 44100, &[1, 2, 3]);
        std::fs::write(dir.path().join("broken.wav"), b"RIFF????").unwrap();

        let bank = load_phoneme_dir(dir.path(), 44100).unwrap();
        assert_eq!(bank.phonemes(), vec!["a"]);
    }

    #[test]
    fn missing_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_phoneme_dir(&dir.path().join("nope"), 44100).unwrap_err();
        assert!(matches!(err, VoseError::MissingSampleDir(_)));
    }

    #[test]
    fn empty_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_phoneme_dir(dir.path(), 44100).unwrap_err();
        assert!(matches!(err, VoseError::NoPhonemes(_)));
    }
}
