use crate::core::{AudioMetadata, Channels, SampleBuffer};
use crate::error::{AudioError, AudioResult};
use log::{debug, warn};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer as SymphoniaSampleBuffer;
use symphonia::core::codecs::{CodecParameters, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Symphonia-based audio decoder
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    /// Create a decoder using the default codec and format registries
    pub fn new() -> Self {
        SymphoniaDecoder
    }

    fn open(&self, bytes: Vec<u8>, hint: Option<&str>) -> AudioResult<Box<dyn FormatReader>> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let mut probe_hint = Hint::new();
        if let Some(ext) = hint {
            probe_hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &probe_hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioError::DecodeFailure(e.to_string()))?;
        Ok(probed.format)
    }

    /// Find the first decodable track
    fn audio_track(reader: &dyn FormatReader) -> AudioResult<(u32, CodecParameters)> {
        reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .map(|t| (t.id, t.codec_params.clone()))
            .ok_or_else(|| AudioError::InvalidMetadata("No audio track found".to_string()))
    }
}

fn codec_name(params: &CodecParameters) -> String {
    symphonia::default::get_codecs()
        .get_codec(params.codec)
        .map(|descriptor| descriptor.short_name.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

impl super::Decoder for SymphoniaDecoder {
    fn decode_bytes(&self, bytes: Vec<u8>, hint: Option<&str>) -> AudioResult<SampleBuffer> {
        let mut reader = self.open(bytes, hint)?;
        let (track_id, params) = Self::audio_track(reader.as_ref())?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| AudioError::DecodeFailure(e.to_string()))?;

        let mut sample_rate = params.sample_rate;
        let mut channel_count = params.channels.map(|c| c.count());
        let mut interleaved: Vec<f32> = Vec::new();
        let mut skipped = 0usize;

        loop {
            let packet = match reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(e.into()),
            };

            // Only process packets from our audio track
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    skipped += 1;
                    debug!("Skipping corrupt packet: {}", e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let spec = *decoded.spec();
            sample_rate.get_or_insert(spec.rate);
            channel_count.get_or_insert(spec.channels.count());

            let mut samples = SymphoniaSampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            samples.copy_interleaved_ref(decoded);
            interleaved.extend_from_slice(samples.samples());
        }

        if skipped > 0 {
            warn!("Skipped {} undecodable packets", skipped);
        }

        let sample_rate = sample_rate
            .ok_or_else(|| AudioError::InvalidMetadata("Unknown sample rate".to_string()))?;
        let channels = channel_count
            .ok_or_else(|| AudioError::InvalidMetadata("Unknown channel count".to_string()))?;
        let channels = Channels::from_count(channels as u32)?;
        if interleaved.is_empty() {
            return Err(AudioError::DecodeFailure("No audio samples decoded".to_string()));
        }

        let buffer = SampleBuffer::from_interleaved(&interleaved, channels, sample_rate)?;
        debug!(
            "Decoded {} ({}, {} Hz, {:.2}s)",
            codec_name(&params),
            channels.name(),
            sample_rate,
            buffer.duration().as_secs_f64()
        );
        Ok(buffer)
    }

    fn probe_bytes(&self, bytes: Vec<u8>, hint: Option<&str>) -> AudioResult<AudioMetadata> {
        let reader = self.open(bytes, hint)?;
        let (_, params) = Self::audio_track(reader.as_ref())?;

        let sample_rate = params
            .sample_rate
            .ok_or_else(|| AudioError::InvalidMetadata("Unknown sample rate".to_string()))?;
        let channels = params
            .channels
            .ok_or_else(|| AudioError::InvalidMetadata("Unknown channel count".to_string()))?;

        let mut metadata = AudioMetadata::new(
            sample_rate,
            Channels::from_count(channels.count() as u32)?,
            codec_name(&params),
        )?;
        if let Some(frames) = params.n_frames {
            metadata = metadata.with_frames(frames);
        }
        if let Some(bits) = params.bits_per_sample {
            metadata = metadata.with_bits_per_sample(bits);
        }
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Decoder;
    use crate::encoder::{Encoder, WavEncoder};
    use std::path::Path;

    fn wav_bytes() -> Vec<u8> {
        let left: Vec<f32> = (0..4410).map(|i| (i as f32 / 4410.0) - 0.5).collect();
        let right: Vec<f32> = left.iter().map(|s| -s).collect();
        let buffer = SampleBuffer::new(vec![left, right], 44100).unwrap();
        WavEncoder::new().encode(&buffer).unwrap()
    }

    #[test]
    fn test_invalid_file() {
        let result = SymphoniaDecoder::new().decode_file(Path::new("/nonexistent/file.mp3"));
        assert!(matches!(result, Err(AudioError::Io(_))));
    }

    #[test]
    fn test_garbage_bytes_fail() {
        let decoder = SymphoniaDecoder::new();
        let result = decoder.decode_bytes(vec![0x42; 512], None);
        assert!(matches!(result, Err(AudioError::DecodeFailure(_))));
        let result = decoder.probe_bytes(vec![0x42; 512], None);
        assert!(matches!(result, Err(AudioError::DecodeFailure(_))));
    }

    #[test]
    fn test_truncated_wav_fails() {
        let mut bytes = wav_bytes();
        bytes.truncate(30);
        let result = SymphoniaDecoder::new().decode_bytes(bytes, Some("wav"));
        assert!(matches!(result, Err(AudioError::DecodeFailure(_))));
    }

    #[test]
    fn test_decode_wav_bytes() {
        let buffer = SymphoniaDecoder::new().decode_bytes(wav_bytes(), Some("wav")).unwrap();
        assert_eq!(buffer.sample_rate(), 44100);
        assert_eq!(buffer.channels(), Channels::Stereo);
        assert_eq!(buffer.len(), 4410);
        assert!((buffer.channel(0)[0] + 0.5).abs() < 1e-3);
        assert!((buffer.channel(1)[0] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_probe_wav_bytes() {
        let metadata = SymphoniaDecoder::new().probe_bytes(wav_bytes(), None).unwrap();
        assert_eq!(metadata.sample_rate, 44100);
        assert_eq!(metadata.channels, Channels::Stereo);
        assert_eq!(metadata.frames, Some(4410));
        assert_eq!(metadata.bits_per_sample, Some(16));
        assert!((metadata.duration_secs().unwrap_or_default() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_decode_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        std::fs::write(&path, wav_bytes()).unwrap();
        let buffer = crate::decoder::from_file(&path).unwrap();
        assert_eq!(buffer.len(), 4410);
    }
}
