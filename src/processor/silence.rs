//! Silence removal driven by a two-state voice-activity detector
//!
//! The detector scans windowed energy of a mono mix of the buffer. A window
//! above the threshold opens a region, backtracked by the configured pre-roll
//! so attacks and breaths survive. Sub-threshold windows accumulate a silence
//! duration; once it exceeds `min_silence` the region closes where that
//! silence began, extended by the release trail. Detection may run on a
//! band-passed copy of the mix, but regions are always cut from the original
//! buffer.

use super::energy::{self, EnergyMetric, ANALYSIS_WINDOW};
use crate::core::{Region, SampleBuffer};
use crate::error::AudioResult;
use crate::filter::biquad::DEFAULT_Q;
use crate::filter::{Biquad, BiquadParams};
use log::{debug, info};
use std::time::Duration;

/// How far before the first loud window a region starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreRoll {
    /// Back off exactly one analysis window
    Window,
    /// Back off a fixed duration
    Fixed(Duration),
}

/// Band-pass applied to the analysis signal only
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPass {
    /// High-pass corner in Hz
    pub low_cut: f32,
    /// Low-pass corner in Hz
    pub high_cut: f32,
}

impl Default for BandPass {
    fn default() -> Self {
        BandPass {
            low_cut: 200.0,
            high_cut: 3500.0,
        }
    }
}

/// Configuration for silence detection
#[derive(Debug, Clone, PartialEq)]
pub struct SilenceConfig {
    /// Energy a window must exceed to count as signal
    pub threshold: f32,
    /// Silence longer than this splits regions
    pub min_silence: Duration,
    /// Regions shorter than this are dropped as noise
    pub min_region: Duration,
    /// Analysis window length
    pub window: Duration,
    /// Window energy metric
    pub metric: EnergyMetric,
    /// Backtrack applied when a region opens
    pub pre_roll: PreRoll,
    /// Extension applied when a region closes
    pub release_trail: Duration,
    /// Optional band-pass before analysis
    pub band_pass: Option<BandPass>,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self::voice()
    }
}

impl SilenceConfig {
    /// Band-passed RMS detection with generous pre-roll and release trail
    pub fn voice() -> Self {
        SilenceConfig {
            threshold: 0.02,
            min_silence: Duration::from_millis(400),
            min_region: Duration::from_millis(100),
            window: ANALYSIS_WINDOW,
            metric: EnergyMetric::Rms,
            pre_roll: PreRoll::Fixed(Duration::from_millis(250)),
            release_trail: Duration::from_millis(200),
            band_pass: Some(BandPass::default()),
        }
    }

    /// Mean-absolute detection on the unfiltered signal, one-window backtrack
    pub fn raw() -> Self {
        SilenceConfig {
            metric: EnergyMetric::MeanAbsolute,
            pre_roll: PreRoll::Window,
            release_trail: Duration::ZERO,
            band_pass: None,
            ..Self::voice()
        }
    }

    /// Set the energy threshold
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the minimum silence that splits regions
    pub fn with_min_silence(mut self, min_silence: Duration) -> Self {
        self.min_silence = min_silence;
        self
    }

    /// Set the energy metric
    pub fn with_metric(mut self, metric: EnergyMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Set or clear the analysis band-pass
    pub fn with_band_pass(mut self, band_pass: Option<BandPass>) -> Self {
        self.band_pass = band_pass;
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum State {
    Silent,
    Speaking {
        start: usize,
        silence_start: Option<usize>,
        silent_frames: usize,
    },
}

/// Detect the regions of `buffer` worth keeping
pub fn detect_regions(buffer: &SampleBuffer, config: &SilenceConfig) -> Vec<Region> {
    let len = buffer.len();
    let sample_rate = buffer.sample_rate();
    let window = energy::window_size(sample_rate, config.window);
    let pre_roll = match config.pre_roll {
        PreRoll::Window => window,
        PreRoll::Fixed(duration) => buffer.frames_for(duration),
    };
    let trail = buffer.frames_for(config.release_trail);
    let min_silence = buffer.frames_for(config.min_silence);

    let mut analysis = buffer.to_mono();
    if let Some(band) = config.band_pass {
        analysis = Biquad::new(BiquadParams::highpass(band.low_cut, DEFAULT_Q), sample_rate)
            .filter(&analysis);
        analysis = Biquad::new(BiquadParams::lowpass(band.high_cut, DEFAULT_Q), sample_rate)
            .filter(&analysis);
    }

    let mut raw: Vec<(usize, usize)> = Vec::new();
    let mut state = State::Silent;

    for (index, energy) in energy::window_energies(&analysis, window, config.metric).enumerate() {
        let position = index * window;
        let frames = window.min(len - position);
        let loud = energy > config.threshold;

        state = match state {
            State::Silent if loud => State::Speaking {
                start: position.saturating_sub(pre_roll),
                silence_start: None,
                silent_frames: 0,
            },
            State::Silent => State::Silent,
            State::Speaking { start, .. } if loud => State::Speaking {
                start,
                silence_start: None,
                silent_frames: 0,
            },
            State::Speaking {
                start,
                silence_start,
                silent_frames,
            } => {
                let silence_start = silence_start.unwrap_or(position);
                let silent_frames = silent_frames + frames;
                if silent_frames > min_silence {
                    raw.push((start, (silence_start + trail).min(len)));
                    State::Silent
                } else {
                    State::Speaking {
                        start,
                        silence_start: Some(silence_start),
                        silent_frames,
                    }
                }
            }
        };
    }

    if let State::Speaking { start, .. } = state {
        raw.push((start, len));
    }

    let min_region = buffer.frames_for(config.min_region);
    let mut regions = Vec::with_capacity(raw.len());
    let mut last_end = 0;
    for (start, end) in raw {
        let start = start.max(last_end);
        if end <= start || end - start < min_region {
            debug!("Dropping short region {}..{}", start, end);
            continue;
        }
        regions.push(Region { start, end });
        last_end = end;
    }

    debug!(
        "Detected {} regions with window {} samples, pre-roll {}, trail {}",
        regions.len(),
        window,
        pre_roll,
        trail
    );
    regions
}

/// Split `buffer` into independent copies of every kept region
///
/// When nothing survives detection the whole buffer is returned as the only
/// element, so the result is never empty.
pub fn remove_silence(
    buffer: &SampleBuffer,
    config: &SilenceConfig,
) -> AudioResult<Vec<SampleBuffer>> {
    let regions = detect_regions(buffer, config);
    if regions.is_empty() {
        info!("No regions above threshold; keeping the whole buffer");
        return Ok(vec![buffer.clone()]);
    }

    let kept: usize = regions.iter().map(Region::len).sum();
    info!(
        "Keeping {} regions ({:.2}s of {:.2}s)",
        regions.len(),
        kept as f64 / buffer.sample_rate() as f64,
        buffer.duration().as_secs_f64()
    );

    regions.into_iter().map(|region| buffer.slice(region)).collect()
}

/// Remove silence and concatenate the kept regions into one buffer
pub fn remove_silence_joined(
    buffer: &SampleBuffer,
    config: &SilenceConfig,
) -> AudioResult<SampleBuffer> {
    let pieces = remove_silence(buffer, config)?;
    SampleBuffer::concat(&pieces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Channels;

    const RATE: u32 = 8000;

    fn tone(seconds: f32, amplitude: f32) -> Vec<f32> {
        let len = (seconds * RATE as f32) as usize;
        (0..len)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * 1000.0 * i as f32 / RATE as f32;
                amplitude * phase.sin()
            })
            .collect()
    }

    fn silence(seconds: f32) -> Vec<f32> {
        vec![0.0; (seconds * RATE as f32) as usize]
    }

    fn stereo(parts: &[Vec<f32>]) -> SampleBuffer {
        let data: Vec<f32> = parts.concat();
        SampleBuffer::new(vec![data.clone(), data], RATE).unwrap()
    }

    #[test]
    fn test_splits_on_long_silence() {
        let buffer = stereo(&[
            silence(0.5),
            tone(1.0, 0.5),
            silence(1.0),
            tone(1.0, 0.5),
            silence(0.5),
        ]);
        let regions = detect_regions(&buffer, &SilenceConfig::raw());

        assert_eq!(regions.len(), 2);
        // one 50ms window (400 samples) of backtrack
        assert_eq!(regions[0].start, 4000 - 400);
        assert_eq!(regions[0].end, 12000);
        assert_eq!(regions[1].start, 20000 - 400);
        assert_eq!(regions[1].end, 28000);
    }

    #[test]
    fn test_short_pause_does_not_split() {
        let buffer = stereo(&[tone(1.0, 0.5), silence(0.3), tone(1.0, 0.5)]);
        let regions = detect_regions(&buffer, &SilenceConfig::raw());
        assert_eq!(regions, vec![Region { start: 0, end: buffer.len() }]);
    }

    #[test]
    fn test_voice_preset_adds_pre_roll_and_trail() {
        let buffer = stereo(&[silence(1.0), tone(1.0, 0.5), silence(1.0)]);
        let regions = detect_regions(&buffer, &SilenceConfig::voice());

        assert_eq!(regions.len(), 1);
        let region = regions[0];
        // 250ms pre-roll from the first loud window
        assert!(region.start <= 8000 - 2000 && region.start >= 8000 - 2400);
        // region closes where silence began plus the 200ms trail
        assert!(region.end >= 16000 + 1600 && region.end <= 16000 + 2400);
    }

    #[test]
    fn test_drops_noise_spikes() {
        let buffer = stereo(&[silence(1.0), tone(0.05, 0.8), silence(1.0)]);
        let config = SilenceConfig {
            pre_roll: PreRoll::Fixed(Duration::ZERO),
            ..SilenceConfig::raw()
        };
        assert!(detect_regions(&buffer, &config).is_empty());
    }

    #[test]
    fn test_open_region_closes_at_buffer_end() {
        let buffer = stereo(&[silence(0.5), tone(1.0, 0.5), silence(0.2)]);
        let regions = detect_regions(&buffer, &SilenceConfig::raw());
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].end, buffer.len());
    }

    #[test]
    fn test_digital_silence_returns_whole_buffer() {
        let buffer = SampleBuffer::silent(Channels::Stereo, RATE as usize * 2, RATE).unwrap();
        let pieces = remove_silence(&buffer, &SilenceConfig::default()).unwrap();
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0], buffer);
    }

    #[test]
    fn test_slices_come_from_original_buffer() {
        let buffer = stereo(&[silence(0.5), tone(1.0, 0.5), silence(1.0)]);
        let pieces = remove_silence(&buffer, &SilenceConfig::voice()).unwrap();
        assert_eq!(pieces.len(), 1);

        let regions = detect_regions(&buffer, &SilenceConfig::voice());
        let start = regions[0].start;
        assert_eq!(pieces[0].channel(0), &buffer.channel(0)[start..regions[0].end]);
        assert_eq!(pieces[0].sample_rate(), RATE);
    }

    #[test]
    fn test_regions_never_overlap() {
        let config = SilenceConfig {
            min_silence: Duration::from_millis(100),
            pre_roll: PreRoll::Fixed(Duration::from_millis(400)),
            release_trail: Duration::from_millis(400),
            ..SilenceConfig::raw()
        };
        let buffer = stereo(&[
            tone(0.5, 0.5),
            silence(0.2),
            tone(0.5, 0.5),
            silence(0.2),
            tone(0.5, 0.5),
        ]);
        let regions = detect_regions(&buffer, &config);
        assert!(regions.len() >= 2);
        for pair in regions.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn test_joined_output_is_shorter() {
        let buffer = stereo(&[tone(1.0, 0.5), silence(2.0), tone(1.0, 0.5)]);
        let joined = remove_silence_joined(&buffer, &SilenceConfig::raw()).unwrap();
        assert!(joined.len() < buffer.len());
        assert!(joined.len() >= 2 * RATE as usize);
    }
}
