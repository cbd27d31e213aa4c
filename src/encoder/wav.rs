use super::float_to_i16;
use crate::core::SampleBuffer;
use crate::error::AudioResult;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;

/// Bits per encoded sample
pub const BITS_PER_SAMPLE: u16 = 16;

/// WAV audio encoder producing canonical 16-bit PCM
///
/// The container is a 44-byte RIFF header followed by interleaved
/// little-endian samples.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavEncoder;

impl WavEncoder {
    /// Create a new WAV encoder
    pub fn new() -> Self {
        WavEncoder
    }

    fn spec(buffer: &SampleBuffer) -> WavSpec {
        WavSpec {
            channels: buffer.channel_count() as u16,
            sample_rate: buffer.sample_rate(),
            bits_per_sample: BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        }
    }
}

impl super::Encoder for WavEncoder {
    fn encode(&mut self, buffer: &SampleBuffer) -> AudioResult<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::with_capacity(
            44 + buffer.len() * buffer.channel_count() * 2,
        ));
        {
            let mut writer = WavWriter::new(&mut cursor, Self::spec(buffer))?;
            for frame in 0..buffer.len() {
                for channel in buffer.planar() {
                    writer.write_sample(float_to_i16(channel[frame]))?;
                }
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;
    use hound::WavReader;

    fn stereo() -> SampleBuffer {
        SampleBuffer::new(
            vec![vec![0.0, 0.25, -0.25, 1.0], vec![0.5, -0.5, -1.0, 0.1]],
            44100,
        )
        .unwrap()
    }

    #[test]
    fn test_canonical_header() {
        let bytes = WavEncoder::new().encode(&stereo()).unwrap();
        assert_eq!(bytes.len(), 44 + 4 * 2 * 2);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(&bytes[36..40], b"data");
        // PCM, 2 channels, 44100 Hz
        assert_eq!(u16::from_le_bytes([bytes[20], bytes[21]]), 1);
        assert_eq!(u16::from_le_bytes([bytes[22], bytes[23]]), 2);
        assert_eq!(
            u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]),
            44100
        );
        assert_eq!(
            u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]),
            16
        );
    }

    #[test]
    fn test_round_trip_within_one_lsb() {
        let buffer = stereo();
        let bytes = WavEncoder::new().encode(&buffer).unwrap();
        let mut reader = WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 44100);
        assert_eq!(reader.duration(), 4);

        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        for (got, original) in decoded.iter().zip(buffer.interleaved()) {
            let expected = (original * 32767.0).round() as i32;
            assert!((*got as i32 - expected).abs() <= 1, "{} vs {}", got, expected);
        }
    }

    #[test]
    fn test_interleaves_left_right() {
        let bytes = WavEncoder::new().encode(&stereo()).unwrap();
        let mut reader = WavReader::new(Cursor::new(bytes)).unwrap();
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(&decoded[..4], &[0, 16383, 8191, -16384]);
    }

    #[test]
    fn test_write_file() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let buffer = SampleBuffer::new(vec![vec![0.1; 100]], 22050).unwrap();
        WavEncoder::new().write_file(&buffer, temp_file.path()).unwrap();

        let reader = WavReader::open(temp_file.path()).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, 22050);
        assert_eq!(reader.len(), 100);
    }
}
