#![warn(missing_docs)]

//! # audio-master: voice trimming, slicing and mastering
//!
//! A pure Rust audio toolkit built around a planar [`SampleBuffer`].
//!
//! ## Features
//!
//! - **Decode** - MP3, FLAC, WAV, OGG, AAC through Symphonia
//! - **Trim** - Crop leading and trailing silence with short fades
//! - **Silence removal** - Split speech regions with a hysteresis detector
//! - **Slice** - Fixed-length chunks with click-free boundaries
//! - **Master** - Preset-driven EQ, de-noise, de-esser, compression and reverb
//! - **Preview** - Realtime playback through the same chain with an analyser tap
//! - **Encode** - 16-bit PCM WAV, MP3 through a pluggable backend
//!
//! ## Quick Start
//!
//! ```ignore
//! use audio_master::decoder::{self, Decoder};
//! use audio_master::encoder::{Encoder, WavEncoder};
//! use audio_master::mastering::{master_offline, MasteringOptions, Preset};
//!
//! let buffer = decoder::from_file("interview.mp3")?;
//! let options = MasteringOptions::new(Preset::Podcast)
//!     .with_enhance(0.5)
//!     .with_denoise(0.3);
//! let mastered = master_offline(&buffer, &options)?;
//! WavEncoder::new().write_file(&mastered, "interview.wav".as_ref())?;
//! ```

/// Core audio types and structures
pub mod core;
/// Error types for audio operations
pub mod error;
/// Audio decoder implementations
pub mod decoder;
/// Audio encoder implementations
pub mod encoder;
/// DSP stages
pub mod filter;
/// Stage graph and analyser tap
pub mod graph;
/// Mastering chain
pub mod mastering;
/// Analysis and slicing pipelines
pub mod processor;
/// Offline and realtime render contexts
pub mod render;

pub use core::{AudioMetadata, Channels, Region, SampleBuffer};
pub use error::{AudioError, AudioResult};
pub use mastering::{MasteringOptions, Preset};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
