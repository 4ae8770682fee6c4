//! PCM decoder
//!
//! The TTS provider returns raw signed 16-bit little-endian PCM with no
//! container. Decoding is a straight conversion to normalized f32 samples.

use crate::audio::types::VerseAudio;
use crate::error::{Error, Result};

/// Decode raw PCM16-LE bytes into a normalized sample buffer.
///
/// An odd trailing byte is truncated rather than rejected; providers have
/// been observed emitting one on stream boundaries. An empty payload is an
/// error since a verse with no audio cannot be sequenced.
pub fn decode_pcm16(bytes: &[u8], sample_rate: u32, channels: u16) -> Result<VerseAudio> {
    if channels == 0 {
        return Err(Error::Decode("zero channel count".to_string()));
    }
    if sample_rate == 0 {
        return Err(Error::Decode("zero sample rate".to_string()));
    }

    let usable = bytes.len() - (bytes.len() % 2);
    if usable == 0 {
        return Err(Error::Decode("empty PCM payload".to_string()));
    }
    if usable != bytes.len() {
        tracing::debug!(
            dropped = bytes.len() - usable,
            "truncating partial trailing sample"
        );
    }

    let mut samples = Vec::with_capacity(usable / 2);
    for pair in bytes[..usable].chunks_exact(2) {
        let value = i16::from_le_bytes([pair[0], pair[1]]);
        samples.push(value as f32 / 32768.0);
    }

    Ok(VerseAudio::new(samples, sample_rate, channels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::types::{CHANNELS, SAMPLE_RATE};

    #[test]
    fn test_decode_known_values() {
        // 0, i16::MAX, i16::MIN, 16384
        let bytes = [0x00, 0x00, 0xFF, 0x7F, 0x00, 0x80, 0x00, 0x40];
        let audio = decode_pcm16(&bytes, SAMPLE_RATE, CHANNELS).unwrap();
        assert_eq!(audio.samples.len(), 4);
        assert_eq!(audio.samples[0], 0.0);
        assert!((audio.samples[1] - 0.99996948).abs() < 1e-6);
        assert_eq!(audio.samples[2], -1.0);
        assert_eq!(audio.samples[3], 0.5);
    }

    #[test]
    fn test_odd_trailing_byte_truncated() {
        let bytes = [0x00, 0x40, 0x7F];
        let audio = decode_pcm16(&bytes, SAMPLE_RATE, CHANNELS).unwrap();
        assert_eq!(audio.samples.len(), 1);
        assert_eq!(audio.samples[0], 0.5);
    }

    #[test]
    fn test_empty_payload_rejected() {
        assert!(decode_pcm16(&[], SAMPLE_RATE, CHANNELS).is_err());
        // A single byte truncates down to nothing
        assert!(decode_pcm16(&[0x7F], SAMPLE_RATE, CHANNELS).is_err());
    }

    #[test]
    fn test_invalid_format_rejected() {
        let bytes = [0x00, 0x00];
        assert!(decode_pcm16(&bytes, SAMPLE_RATE, 0).is_err());
        assert!(decode_pcm16(&bytes, 0, CHANNELS).is_err());
    }

    #[test]
    fn test_all_samples_in_range() {
        let bytes: Vec<u8> = (0..=255u8).collect();
        let audio = decode_pcm16(&bytes, SAMPLE_RATE, CHANNELS).unwrap();
        for s in audio.samples.iter() {
            assert!(*s >= -1.0 && *s < 1.0);
        }
    }
}
