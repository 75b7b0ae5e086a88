//! WAV export of a rendered buffer.

/// Encode mono `f32` samples as a 16-bit PCM WAV file.
///
/// Samples are clamped to [-1, 1] before conversion.
pub fn render_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let pcm: Vec<i16> = samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect();
    encode_wav(&pcm, sample_rate, 1)
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_at(wav: &[u8], i: usize) -> i16 {
        let at = 44 + i * 2;
        i16::from_le_bytes([wav[at], wav[at + 1]])
    }

    #[test]
    fn header_describes_mono_16_bit() {
        let wav = render_wav(&[0.0; 10], 22050);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");

        let channels = u16::from_le_bytes([wav[22], wav[23]]);
        let sr = u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]);
        let byte_rate = u32::from_le_bytes([wav[28], wav[29], wav[30], wav[31]]);
        let bits = u16::from_le_bytes([wav[34], wav[35]]);
        assert_eq!(channels, 1);
        assert_eq!(sr, 22050);
        assert_eq!(byte_rate, 44100);
        assert_eq!(bits, 16);
    }

    #[test]
    fn sizes_match_sample_count() {
        let wav = render_wav(&[0.1; 300], 8000);
        let riff_size = u32::from_le_bytes([wav[4], wav[5], wav[6], wav[7]]);
        let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_size, 600);
        assert_eq!(riff_size, 36 + 600);
        assert_eq!(wav.len(), 44 + 600);
    }

    #[test]
    fn samples_are_clamped() {
        let wav = render_wav(&[0.0, 1.0, -1.0, 2.5, -7.0, 0.5], 8000);
        assert_eq!(sample_at(&wav, 0), 0);
        assert_eq!(sample_at(&wav, 1), i16::MAX);
        assert_eq!(sample_at(&wav, 2), -i16::MAX);
        assert_eq!(sample_at(&wav, 3), i16::MAX);
        assert_eq!(sample_at(&wav, 4), -i16::MAX);
        assert_eq!(sample_at(&wav, 5), 16383);
    }

    #[test]
    fn empty_buffer_is_header_only() {
        let wav = render_wav(&[], 44100);
        assert_eq!(wav.len(), 44);
    }
}
