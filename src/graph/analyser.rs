use crate::error::{AudioError, AudioResult};
use parking_lot::Mutex;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Floor for reported magnitudes
pub const MIN_DECIBELS: f32 = -100.0;

/// Default blend of the previous spectrum into the next one
pub const DEFAULT_SMOOTHING: f32 = 0.8;

struct AnalyserState {
    fft_size: usize,
    /// ring of the most recent mono samples
    ring: Vec<f32>,
    write_pos: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    smoothing: f32,
    smoothed: Vec<f32>,
}

/// Shared read side of an analyser tap, safe to poll from another thread
#[derive(Clone)]
pub struct AnalyserHandle {
    state: Arc<Mutex<AnalyserState>>,
}

impl AnalyserHandle {
    /// Create a tap holding `fft_size` samples (power of two, 32..=32768)
    pub fn new(fft_size: usize) -> AudioResult<Self> {
        if !fft_size.is_power_of_two() || !(32..=32768).contains(&fft_size) {
            return Err(AudioError::ConfigError(format!(
                "FFT size must be a power of two between 32 and 32768, got {}",
                fft_size
            )));
        }

        // Hann window
        let window = (0..fft_size)
            .map(|i| {
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (fft_size - 1) as f32).cos())
            })
            .collect();

        let state = AnalyserState {
            fft_size,
            ring: vec![0.0; fft_size],
            write_pos: 0,
            window,
            fft: FftPlanner::new().plan_fft_forward(fft_size),
            smoothing: DEFAULT_SMOOTHING,
            smoothed: vec![0.0; fft_size / 2],
        };
        Ok(AnalyserHandle {
            state: Arc::new(Mutex::new(state)),
        })
    }

    /// Number of samples analysed per snapshot
    pub fn fft_size(&self) -> usize {
        self.state.lock().fft_size
    }

    /// Number of frequency bins reported
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size() / 2
    }

    /// Most recent `fft_size` samples, oldest first
    pub fn time_domain_data(&self) -> Vec<f32> {
        let state = self.state.lock();
        let (newer, older) = state.ring.split_at(state.write_pos);
        older.iter().chain(newer).copied().collect()
    }

    /// Smoothed magnitude spectrum in dB, one value per bin
    pub fn frequency_data(&self) -> Vec<f32> {
        let mut state = self.state.lock();
        let fft_size = state.fft_size;
        let (newer, older) = state.ring.split_at(state.write_pos);
        let mut spectrum: Vec<Complex<f32>> = older
            .iter()
            .chain(newer)
            .zip(&state.window)
            .map(|(&s, &w)| Complex::new(s * w, 0.0))
            .collect();
        state.fft.process(&mut spectrum);

        let smoothing = state.smoothing;
        state
            .smoothed
            .iter_mut()
            .zip(&spectrum)
            .map(|(previous, bin)| {
                let magnitude = bin.norm() / fft_size as f32;
                *previous = smoothing * *previous + (1.0 - smoothing) * magnitude;
                if *previous > 0.0 {
                    (20.0 * previous.log10()).max(MIN_DECIBELS)
                } else {
                    MIN_DECIBELS
                }
            })
            .collect()
    }

    /// Peak absolute level over the held samples
    pub fn peak(&self) -> f32 {
        self.state.lock().ring.iter().fold(0.0f32, |a, s| a.max(s.abs()))
    }

    fn push(&self, block: &[Vec<f32>]) {
        let frames = block.first().map(Vec::len).unwrap_or(0);
        let scale = 1.0 / block.len().max(1) as f32;
        let mut state = self.state.lock();
        for i in 0..frames {
            let mono = block.iter().map(|channel| channel[i]).sum::<f32>() * scale;
            let pos = state.write_pos;
            state.ring[pos] = mono;
            state.write_pos = (pos + 1) % state.fft_size;
        }
    }
}

/// Pass-through stage that records what flows through it
pub struct Analyser {
    handle: AnalyserHandle,
}

impl Analyser {
    /// Create a tap stage and the handle that reads it
    pub fn new(fft_size: usize) -> AudioResult<(Self, AnalyserHandle)> {
        let handle = AnalyserHandle::new(fft_size)?;
        Ok((
            Analyser {
                handle: handle.clone(),
            },
            handle,
        ))
    }
}

impl crate::filter::Filter for Analyser {
    fn process(&mut self, block: &mut [Vec<f32>]) -> AudioResult<()> {
        self.handle.push(block);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "analyser"
    }
}
