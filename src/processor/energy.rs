//! Windowed energy analysis shared by the silence detector and the trimmer

use std::time::Duration;

/// Standard analysis granularity
pub const ANALYSIS_WINDOW: Duration = Duration::from_millis(50);

/// How a window of samples is reduced to one energy value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnergyMetric {
    /// Arithmetic mean of |sample|
    MeanAbsolute,
    /// Square root of the mean of sample²; reacts more to peaks
    #[default]
    Rms,
}

impl EnergyMetric {
    /// Energy of one window, divided by the window's true length
    pub fn measure(&self, window: &[f32]) -> f32 {
        if window.is_empty() {
            return 0.0;
        }
        match self {
            EnergyMetric::MeanAbsolute => {
                window.iter().map(|s| s.abs()).sum::<f32>() / window.len() as f32
            }
            EnergyMetric::Rms => {
                let sum_squares: f64 = window.iter().map(|&s| (s as f64) * (s as f64)).sum();
                (sum_squares / window.len() as f64).sqrt() as f32
            }
        }
    }
}

/// Window length in samples for `duration` at `sample_rate`, floored, never zero
pub fn window_size(sample_rate: u32, duration: Duration) -> usize {
    ((sample_rate as f64 * duration.as_secs_f64()).floor() as usize).max(1)
}

/// Lazily yield one energy value per non-overlapping window
///
/// The final partial window is measured over its own length.
pub fn window_energies(
    samples: &[f32],
    window: usize,
    metric: EnergyMetric,
) -> impl Iterator<Item = f32> + '_ {
    samples
        .chunks(window.max(1))
        .map(move |chunk| metric.measure(chunk))
}
