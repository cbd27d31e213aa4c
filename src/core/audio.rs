use crate::error::{AudioError, AudioResult};
use std::time::Duration;

/// Channel configuration for audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    /// Mono (1 channel)
    Mono = 1,
    /// Stereo (2 channels)
    Stereo = 2,
}

impl Channels {
    /// Create Channels from channel count
    pub fn from_count(count: u32) -> AudioResult<Self> {
        match count {
            1 => Ok(Channels::Mono),
            2 => Ok(Channels::Stereo),
            n => Err(AudioError::InvalidChannels {
                expected: 2,
                got: n,
            }),
        }
    }

    /// Get the number of channels
    pub fn count(&self) -> u32 {
        *self as u32
    }

    /// Get channel layout name
    pub fn name(&self) -> &'static str {
        match self {
            Channels::Mono => "Mono",
            Channels::Stereo => "Stereo",
        }
    }
}

/// Audio metadata reported by probing an encoded source
#[derive(Debug, Clone)]
pub struct AudioMetadata {
    /// Total duration of the audio
    pub duration: Option<Duration>,
    /// Total samples per channel, if the container reports it
    pub frames: Option<u64>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: Channels,
    /// Codec name (e.g., "mp3", "flac", "pcm_s16le")
    pub codec: String,
    /// Bits per coded sample if known
    pub bits_per_sample: Option<u32>,
}

impl AudioMetadata {
    /// Create new metadata
    pub fn new(sample_rate: u32, channels: Channels, codec: String) -> AudioResult<Self> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidSampleRate { rate: sample_rate });
        }

        Ok(AudioMetadata {
            duration: None,
            frames: None,
            sample_rate,
            channels,
            codec,
            bits_per_sample: None,
        })
    }

    /// Set the frame count, deriving the duration from it
    pub fn with_frames(mut self, frames: u64) -> Self {
        self.frames = Some(frames);
        self.duration = Some(Duration::from_secs_f64(
            frames as f64 / self.sample_rate as f64,
        ));
        self
    }

    /// Set bits per sample
    pub fn with_bits_per_sample(mut self, bits: u32) -> Self {
        self.bits_per_sample = Some(bits);
        self
    }

    /// Get duration in seconds
    pub fn duration_secs(&self) -> Option<f64> {
        self.duration.map(|d| d.as_secs_f64())
    }
}

/// Convert user-supplied seconds into a [`Duration`]
///
/// Negative, NaN, infinite and out-of-range values are rejected with
/// [`AudioError::ConfigError`].
pub fn duration_from_secs(seconds: f64) -> AudioResult<Duration> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| AudioError::ConfigError(format!("Invalid duration {}s: {}", seconds, e)))
}
