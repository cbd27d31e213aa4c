//! Audio encoder implementations

pub mod mp3;
pub mod wav;

pub use mp3::{Mp3Backend, Mp3Encoder, MP3_BLOCK_SIZE};
pub use wav::WavEncoder;

use crate::core::SampleBuffer;
use crate::error::{AudioError, AudioResult};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Trait for audio encoders
pub trait Encoder {
    /// Encode a whole buffer into one container
    fn encode(&mut self, buffer: &SampleBuffer) -> AudioResult<Vec<u8>>;

    /// Encode `buffer` and write the container to `path`
    fn write_file(&mut self, buffer: &SampleBuffer, path: &Path) -> AudioResult<()> {
        let bytes = self.encode(buffer)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// Convert a float sample to 16-bit PCM
///
/// Clamps to [-1, 1]; negative values scale by 32768 and positive values by
/// 32767 so both extremes are reachable.
pub fn float_to_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Output container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// 16-bit PCM WAV
    #[default]
    Wav,
    /// MPEG layer III
    Mp3,
}

impl ExportFormat {
    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Wav => "wav",
            ExportFormat::Mp3 => "mp3",
        }
    }

    /// Guess the format from a path's extension
    pub fn from_path(path: &Path) -> AudioResult<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                AudioError::ConfigError(format!("No extension on {}", path.display()))
            })?
            .parse()
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wav" => Ok(ExportFormat::Wav),
            "mp3" => Ok(ExportFormat::Mp3),
            other => Err(AudioError::UnsupportedFormat(format!(
                "Cannot export to '{}'",
                other
            ))),
        }
    }
}
