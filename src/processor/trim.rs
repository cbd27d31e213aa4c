use super::energy::{self, ANALYSIS_WINDOW};
use crate::core::{Region, SampleBuffer};
use crate::error::AudioResult;
use log::{debug, info};
use std::time::Duration;

/// Configuration for leading/trailing silence trimming
#[derive(Debug, Clone, PartialEq)]
pub struct TrimConfig {
    /// Joint mean-absolute level a window must exceed to count as signal
    pub threshold: f32,
    /// Analysis window; also the margin kept on each side
    pub window: Duration,
    /// Linear fade applied at both new edges
    pub fade: Duration,
}

impl Default for TrimConfig {
    fn default() -> Self {
        TrimConfig {
            threshold: 0.015,
            window: ANALYSIS_WINDOW,
            fade: Duration::from_millis(20),
        }
    }
}

impl TrimConfig {
    /// Set the threshold
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }
}

/// Locate the span between the first and last loud windows, with one window of margin
///
/// Returns `None` when no window exceeds the threshold.
pub fn find_edges(buffer: &SampleBuffer, config: &TrimConfig) -> Option<Region> {
    let len = buffer.len();
    let window = energy::window_size(buffer.sample_rate(), config.window);

    let first = (0..len)
        .step_by(window)
        .find(|&pos| buffer.joint_mean_abs(pos, pos + window) > config.threshold)?;
    let start = first.saturating_sub(window);

    let last_end = (1..=len.div_ceil(window))
        .map(|k| len.saturating_sub((k - 1) * window))
        .find(|&end| buffer.joint_mean_abs(end.saturating_sub(window), end) > config.threshold)?;
    let end = (last_end + window).min(len);

    if start >= end {
        return None;
    }
    Some(Region { start, end })
}

/// Remove leading and trailing near-silence in one pass
///
/// Interior silence is left alone. The cut edges get a short linear fade to
/// avoid clicks. A buffer that never rises above the threshold is returned
/// unchanged.
pub fn trim_silence(buffer: &SampleBuffer, config: &TrimConfig) -> AudioResult<SampleBuffer> {
    let Some(region) = find_edges(buffer, config) else {
        debug!("Buffer below trim threshold throughout; returning it unchanged");
        return Ok(buffer.clone());
    };

    let mut trimmed = buffer.slice(region)?;
    let fade = trimmed.frames_for(config.fade);
    trimmed.apply_fade_in(fade);
    trimmed.apply_fade_out(fade);

    info!(
        "Trimmed {} leading and {} trailing samples",
        region.start,
        buffer.len() - region.end
    );
    Ok(trimmed)
}
