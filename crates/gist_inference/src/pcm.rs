use gist_core::SpeechClip;

/// Decode raw little-endian PCM16 (the TTS inline payload format) into
/// normalized f32 samples. A trailing odd byte is dropped.
pub fn decode_pcm16(data: &[u8], sample_rate: u32, channels: u16) -> SpeechClip {
    let samples = data
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();
    SpeechClip::new(samples, sample_rate, channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_samples() {
        // 0, i16::MAX, i16::MIN as little-endian pairs
        let data = [0x00, 0x00, 0xff, 0x7f, 0x00, 0x80];
        let clip = decode_pcm16(&data, 24_000, 1);
        assert_eq!(clip.samples.len(), 3);
        assert_eq!(clip.samples[0], 0.0);
        assert!((clip.samples[1] - 32767.0 / 32768.0).abs() < f32::EPSILON);
        assert_eq!(clip.samples[2], -1.0);
    }

    #[test]
    fn drops_trailing_odd_byte() {
        let clip = decode_pcm16(&[0x01, 0x00, 0xab], 24_000, 1);
        assert_eq!(clip.samples.len(), 1);
    }

    #[test]
    fn empty_payload_gives_empty_clip() {
        let clip = decode_pcm16(&[], 24_000, 1);
        assert!(clip.is_empty());
    }
}
