//! Software DSP stages for the stage graph

pub mod biquad;
pub mod compressor;
pub mod convolver;
pub mod gain;

pub use biquad::{Biquad, BiquadKind, BiquadParams};
pub use compressor::{Compressor, CompressorParams};
pub use convolver::Convolver;
pub use gain::Gain;

use crate::error::AudioResult;

/// Trait for audio filters
///
/// A filter transforms one block of planar audio in place. Blocks arrive in
/// stream order; filters keep whatever per-channel state they need between
/// calls.
pub trait Filter: Send {
    /// Process one planar block in place
    fn process(&mut self, block: &mut [Vec<f32>]) -> AudioResult<()>;

    /// Clear internal state, as if no audio had been processed
    fn reset(&mut self) {}

    /// Short label used in logs
    fn name(&self) -> &'static str;
}
