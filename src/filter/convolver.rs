use crate::core::SampleBuffer;
use crate::error::{AudioError, AudioResult};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::collections::VecDeque;
use std::sync::Arc;

const GAIN_CALIBRATION: f32 = 0.00125;
const GAIN_CALIBRATION_SAMPLE_RATE: f32 = 44100.0;
const MIN_POWER: f32 = 0.000125;

/// Equal-power scale applied to an impulse response before convolution
///
/// Matches the calibration browsers apply to normalized convolution nodes, so
/// a noise-burst impulse response lands at a usable wet level.
pub fn normalization_scale(impulse: &SampleBuffer) -> f32 {
    let len = impulse.len();
    if len == 0 {
        return 1.0;
    }
    let sum_squares: f32 = impulse
        .planar()
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|s| s * s)
        .sum();
    let power = (sum_squares / (impulse.channel_count() * len) as f32)
        .sqrt()
        .max(MIN_POWER);

    GAIN_CALIBRATION / power * (GAIN_CALIBRATION_SAMPLE_RATE / impulse.sample_rate() as f32)
}

/// Per-channel overlap-save state
struct ChannelState {
    /// previous block followed by the current block
    window: Vec<f32>,
    /// spectra of past input windows, newest first
    history: VecDeque<Vec<Complex<f32>>>,
}

/// Uniformly partitioned FFT convolution
///
/// The impulse response is split into partitions of `block_size` samples.
/// Every input block must be exactly `block_size` long except the final one
/// of a stream, which is zero padded.
pub struct Convolver {
    block_size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    /// [impulse channel][partition] spectra
    partitions: Vec<Vec<Vec<Complex<f32>>>>,
    states: Vec<ChannelState>,
}

impl Convolver {
    /// Prepare a convolver for `impulse`
    pub fn new(impulse: &SampleBuffer, block_size: usize, normalize: bool) -> AudioResult<Self> {
        if block_size == 0 {
            return Err(AudioError::ConfigError(
                "Convolution block size must be positive".to_string(),
            ));
        }
        if impulse.is_empty() {
            return Err(AudioError::BufferError("Impulse response is empty".to_string()));
        }

        let fft_size = block_size * 2;
        let mut planner = FftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);

        let scale = if normalize { normalization_scale(impulse) } else { 1.0 };
        let partitions = impulse
            .planar()
            .iter()
            .map(|channel| {
                channel
                    .chunks(block_size)
                    .map(|chunk| {
                        let mut spectrum = vec![Complex::new(0.0, 0.0); fft_size];
                        for (bin, &sample) in spectrum.iter_mut().zip(chunk) {
                            bin.re = sample * scale;
                        }
                        forward.process(&mut spectrum);
                        spectrum
                    })
                    .collect()
            })
            .collect();

        Ok(Convolver {
            block_size,
            forward,
            inverse,
            partitions,
            states: Vec::new(),
        })
    }

    /// Partition length in samples
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    fn ensure_channels(&mut self, channels: usize) {
        let fft_size = self.block_size * 2;
        let depth = self.partitions[0].len();
        while self.states.len() < channels {
            self.states.push(ChannelState {
                window: vec![0.0; fft_size],
                history: (0..depth)
                    .map(|_| vec![Complex::new(0.0, 0.0); fft_size])
                    .collect(),
            });
        }
    }
}

impl super::Filter for Convolver {
    fn process(&mut self, block: &mut [Vec<f32>]) -> AudioResult<()> {
        self.ensure_channels(block.len());
        let b = self.block_size;
        let fft_size = b * 2;
        let norm = 1.0 / fft_size as f32;

        for (index, samples) in block.iter_mut().enumerate() {
            if samples.len() > b {
                return Err(AudioError::BufferError(format!(
                    "Block of {} frames exceeds convolution block size {}",
                    samples.len(),
                    b
                )));
            }
            let partitions = &self.partitions[index % self.partitions.len()];
            let state = &mut self.states[index];

            state.window.copy_within(b.., 0);
            state.window[b..].fill(0.0);
            state.window[b..b + samples.len()].copy_from_slice(samples);

            let mut spectrum = state.history.pop_back().unwrap_or_default();
            spectrum.clear();
            spectrum.extend(state.window.iter().map(|&s| Complex::new(s, 0.0)));
            self.forward.process(&mut spectrum);
            state.history.push_front(spectrum);

            let mut acc = vec![Complex::new(0.0, 0.0); fft_size];
            for (input, partition) in state.history.iter().zip(partitions) {
                for ((out, x), h) in acc.iter_mut().zip(input).zip(partition) {
                    *out += x * h;
                }
            }
            self.inverse.process(&mut acc);

            for (sample, value) in samples.iter_mut().zip(&acc[b..]) {
                *sample = value.re * norm;
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.states.clear();
    }

    fn name(&self) -> &'static str {
        "convolver"
    }
}
