use super::float_to_i16;
use crate::core::SampleBuffer;
use crate::error::{AudioError, AudioResult};
use log::debug;

/// Samples per channel handed to the backend per call
pub const MP3_BLOCK_SIZE: usize = 1152;

/// An MP3 encoding engine
///
/// The backend is configured once per stream and then fed planar 16-bit
/// blocks of at most [`MP3_BLOCK_SIZE`] samples per channel. Each call may
/// return any number of encoded bytes.
pub trait Mp3Backend: Send {
    /// Prepare a new stream
    fn begin(&mut self, channels: usize, sample_rate: u32, kbps: u32) -> AudioResult<()>;

    /// Encode one block; `block[c]` holds channel `c`
    fn encode_block(&mut self, block: &[&[i16]]) -> AudioResult<Vec<u8>>;

    /// Emit whatever the backend still buffers
    fn flush(&mut self) -> AudioResult<Vec<u8>>;
}

/// Drives an [`Mp3Backend`] over a whole buffer
pub struct Mp3Encoder {
    backend: Option<Box<dyn Mp3Backend>>,
    kbps: u32,
}

impl Mp3Encoder {
    /// Default bitrate
    pub const DEFAULT_KBPS: u32 = 128;

    /// Encoder backed by `backend`
    pub fn with_backend<B: Mp3Backend + 'static>(backend: B) -> Self {
        Mp3Encoder {
            backend: Some(Box::new(backend)),
            kbps: Self::DEFAULT_KBPS,
        }
    }

    /// Encoder without a backend; every encode fails with
    /// [`AudioError::EncoderUnavailable`]
    pub fn unavailable() -> Self {
        Mp3Encoder {
            backend: None,
            kbps: Self::DEFAULT_KBPS,
        }
    }

    /// Set the bitrate in kbps
    pub fn with_bitrate(mut self, kbps: u32) -> Self {
        self.kbps = kbps;
        self
    }

    /// Whether a backend is installed
    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }
}

impl super::Encoder for Mp3Encoder {
    fn encode(&mut self, buffer: &SampleBuffer) -> AudioResult<Vec<u8>> {
        let backend = self.backend.as_mut().ok_or_else(|| {
            AudioError::EncoderUnavailable("no MP3 encoder backend installed".to_string())
        })?;

        let pcm: Vec<Vec<i16>> = buffer
            .planar()
            .iter()
            .map(|channel| channel.iter().map(|&s| float_to_i16(s)).collect())
            .collect();

        backend.begin(pcm.len(), buffer.sample_rate(), self.kbps)?;
        let mut out = Vec::new();
        let mut blocks = 0usize;
        for start in (0..buffer.len()).step_by(MP3_BLOCK_SIZE) {
            let end = (start + MP3_BLOCK_SIZE).min(buffer.len());
            let block: Vec<&[i16]> = pcm.iter().map(|channel| &channel[start..end]).collect();
            out.extend(backend.encode_block(&block)?);
            blocks += 1;
        }
        out.extend(backend.flush()?);

        debug!("MP3: {} blocks, {} bytes at {} kbps", blocks, out.len(), self.kbps);
        Ok(out)
    }
}
