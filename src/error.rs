use std::io;
use thiserror::Error;

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;

/// Error types for decoding, analysis, rendering and export
#[derive(Error, Debug)]
pub enum AudioError {
    /// IO error (file operations, disk access)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Input bytes are malformed or could not be decoded
    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    /// Unsupported audio format
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Invalid audio metadata
    #[error("Invalid audio metadata: {0}")]
    InvalidMetadata(String),

    /// Encoding failed
    #[error("Encode error: {0}")]
    EncodeError(String),

    /// An optional encoder backend is not available
    #[error("Encoder unavailable: {0}")]
    EncoderUnavailable(String),

    /// Invalid channel configuration
    #[error("Invalid channel configuration: expected {expected}, got {got}")]
    InvalidChannels {
        /// Expected number of channels
        expected: u32,
        /// Got number of channels
        got: u32,
    },

    /// Invalid sample rate
    #[error("Invalid sample rate: {rate}")]
    InvalidSampleRate {
        /// The invalid sample rate
        rate: u32,
    },

    /// Buffer-related error
    #[error("Buffer error: {0}")]
    BufferError(String),

    /// Region does not fit the buffer it indexes
    #[error("Invalid region {start}..{end} for buffer of {len} samples")]
    InvalidRegion {
        /// Region start (inclusive)
        start: usize,
        /// Region end (exclusive)
        end: usize,
        /// Samples per channel in the buffer
        len: usize,
    },

    /// Segmentation operation failed
    #[error("Segmentation error: {0}")]
    SegmentationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Stage graph wiring error
    #[error("Graph error: {0}")]
    GraphError(String),

    /// The realtime context has been closed
    #[error("Realtime context is closed")]
    ContextClosed,
}

impl From<symphonia::core::errors::Error> for AudioError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        AudioError::DecodeFailure(err.to_string())
    }
}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => AudioError::Io(e),
            e => AudioError::EncodeError(e.to_string()),
        }
    }
}
