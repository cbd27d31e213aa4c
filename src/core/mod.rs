//! Core audio types and structures

/// Channel layout and metadata types
pub mod audio;
/// Planar sample buffer
pub mod buffer;
/// Sample-index regions
pub mod region;

pub use audio::{duration_from_secs, AudioMetadata, Channels};
pub use buffer::SampleBuffer;
pub use region::Region;
