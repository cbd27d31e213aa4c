use crate::core::SampleBuffer;
use crate::error::AudioResult;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Shape of the synthetic room
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbShape {
    /// Length of the impulse response
    pub duration: Duration,
    /// Exponent of the `(1 - t)^decay` envelope
    pub decay: f32,
    /// Noise seed; a fixed seed keeps renders reproducible
    pub seed: u64,
}

impl Default for ReverbShape {
    fn default() -> Self {
        ReverbShape {
            duration: Duration::from_millis(2000),
            decay: 2.0,
            seed: 0x5eed_2e7e_5b,
        }
    }
}

/// Stereo white noise under a decaying envelope
pub fn impulse_response(sample_rate: u32, shape: &ReverbShape) -> AudioResult<SampleBuffer> {
    let len = ((shape.duration.as_secs_f64() * sample_rate as f64) as usize).max(1);
    let mut rng = StdRng::seed_from_u64(shape.seed);

    let mut channels = vec![Vec::with_capacity(len), Vec::with_capacity(len)];
    for i in 0..len {
        let envelope = (1.0 - i as f32 / len as f32).powf(shape.decay);
        for channel in channels.iter_mut() {
            channel.push(rng.random_range(-1.0f32..=1.0) * envelope);
        }
    }
    SampleBuffer::new(channels, sample_rate)
}
