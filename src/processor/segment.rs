use crate::core::{duration_from_secs, Region, SampleBuffer};
use crate::error::{AudioError, AudioResult};
use log::debug;
use std::time::Duration;

/// Audio segmentation - split audio into fixed-duration chunks
#[derive(Debug, Clone)]
pub struct Segment {
    /// Segment duration
    duration: Duration,
    /// Chunks shorter than this are dropped
    min_length: Duration,
    /// Fade applied at both edges of every chunk
    fade: Duration,
}

impl Segment {
    /// Create a new segmenter
    pub fn new(duration: Duration) -> AudioResult<Self> {
        if duration.is_zero() {
            return Err(AudioError::ConfigError(
                "Segment duration must be positive".to_string(),
            ));
        }

        Ok(Segment {
            duration,
            min_length: Duration::from_millis(100),
            fade: Duration::from_millis(10),
        })
    }

    /// Create a segmenter from fractional seconds
    pub fn from_secs(seconds: f64) -> AudioResult<Self> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(AudioError::ConfigError(format!(
                "Segment duration must be positive, got {}",
                seconds
            )));
        }
        Self::new(duration_from_secs(seconds)?)
    }

    /// Override the edge fade
    pub fn with_fade(mut self, fade: Duration) -> Self {
        self.fade = fade;
        self
    }

    /// Segment duration
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Calculate the number of samples per segment (floored)
    pub fn samples_per_segment(&self, sample_rate: u32) -> usize {
        (self.duration.as_secs_f64() * sample_rate as f64).floor() as usize
    }

    /// Split a buffer into consecutive chunks with click-safe edges
    pub fn split(&self, buffer: &SampleBuffer) -> AudioResult<Vec<SampleBuffer>> {
        let samples_per_segment = self.samples_per_segment(buffer.sample_rate());
        if samples_per_segment == 0 {
            return Err(AudioError::SegmentationError(format!(
                "Segment of {:?} is shorter than one sample",
                self.duration
            )));
        }

        let min_samples = buffer.frames_for(self.min_length);
        let fade = buffer.frames_for(self.fade);
        let mut segments = Vec::new();

        for start in (0..buffer.len()).step_by(samples_per_segment) {
            let end = (start + samples_per_segment).min(buffer.len());
            if end - start < min_samples {
                debug!("Dropping {}-sample tail", end - start);
                continue;
            }

            let mut chunk = buffer.slice(Region { start, end })?;
            chunk.apply_fade_in(fade);
            chunk.apply_fade_out(fade);
            segments.push(chunk);
        }

        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Channels;

    #[test]
    fn test_segment_creation() {
        let segment = Segment::new(Duration::from_secs(1)).unwrap();
        assert_eq!(segment.samples_per_segment(44100), 44100);
        assert!(Segment::new(Duration::ZERO).is_err());
        assert!(Segment::from_secs(-1.0).is_err());
        assert!(Segment::from_secs(f64::NAN).is_err());
    }

    #[test]
    fn test_oversized_duration_is_config_error() {
        assert!(matches!(Segment::from_secs(1e20), Err(AudioError::ConfigError(_))));
        assert!(matches!(
            Segment::from_secs(f64::INFINITY),
            Err(AudioError::ConfigError(_))
        ));
    }

    #[test]
    fn test_split_three_seconds() {
        let buffer = SampleBuffer::new(vec![vec![0.5; 132300]; 2], 44100).unwrap();
        let segments = Segment::new(Duration::from_secs(1)).unwrap().split(&buffer).unwrap();

        assert_eq!(segments.len(), 3);
        for segment in &segments {
            assert_eq!(segment.len(), 44100);
            assert_eq!(segment.channels(), Channels::Stereo);
            for channel in 0..2 {
                let data = segment.channel(channel);
                assert_eq!(data[0], 0.0);
                assert_eq!(data[44099], 0.0);
                // 10ms fade is 441 samples
                assert_eq!(data[441], 0.5);
                assert_eq!(data[44100 - 442], 0.5);
                assert!(data[440] < 0.5);
            }
        }
    }

    #[test]
    fn test_split_preserves_total_length() {
        // 2.5s plus a 50ms remainder that gets dropped
        let len = 44100 * 5 / 2 + 2205;
        let buffer = SampleBuffer::new(vec![vec![0.1; len]], 44100).unwrap();
        let segments = Segment::from_secs(0.5).unwrap().split(&buffer).unwrap();

        let total: usize = segments.iter().map(SampleBuffer::len).sum();
        assert_eq!(segments.len(), 5);
        assert_eq!(total, len - 2205);

        let joined = SampleBuffer::concat(&segments).unwrap();
        assert_eq!(joined.len(), total);
    }

    #[test]
    fn test_short_final_chunk_is_kept() {
        let buffer = SampleBuffer::new(vec![vec![0.1; 44100 + 8820]], 44100).unwrap();
        let segments = Segment::new(Duration::from_secs(1)).unwrap().split(&buffer).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].len(), 8820);
    }
}
