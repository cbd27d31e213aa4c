//! Audio decoder implementations

pub mod symphonia;

pub use symphonia::SymphoniaDecoder;

use crate::core::{AudioMetadata, SampleBuffer};
use crate::error::AudioResult;
use std::path::Path;

/// Trait for audio decoders
///
/// A decoder turns a complete encoded file into one planar buffer. The
/// optional hint is a file extension such as `"mp3"`.
pub trait Decoder: Send + Sync {
    /// Decode every sample of the first audio track
    fn decode_bytes(&self, bytes: Vec<u8>, hint: Option<&str>) -> AudioResult<SampleBuffer>;

    /// Read container and codec parameters without decoding samples
    fn probe_bytes(&self, bytes: Vec<u8>, hint: Option<&str>) -> AudioResult<AudioMetadata>;

    /// Decode a file, hinting the format from its extension
    fn decode_file(&self, path: &Path) -> AudioResult<SampleBuffer> {
        let bytes = std::fs::read(path)?;
        self.decode_bytes(bytes, extension(path))
    }

    /// Probe a file, hinting the format from its extension
    fn probe_file(&self, path: &Path) -> AudioResult<AudioMetadata> {
        let bytes = std::fs::read(path)?;
        self.probe_bytes(bytes, extension(path))
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

/// Decode a file with the default decoder
pub fn from_file<P: AsRef<Path>>(path: P) -> AudioResult<SampleBuffer> {
    SymphoniaDecoder::new().decode_file(path.as_ref())
}
