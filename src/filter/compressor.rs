use crate::error::AudioResult;

/// Dynamics compressor settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorParams {
    /// Level in dBFS above which gain reduction starts
    pub threshold_db: f32,
    /// Width in dB of the soft transition around the threshold
    pub knee_db: f32,
    /// Input/output slope above the knee
    pub ratio: f32,
    /// Seconds to reach ~63% of a deeper gain reduction
    pub attack: f32,
    /// Seconds to recover ~63% towards unity gain
    pub release: f32,
}

const MIN_LEVEL_DB: f32 = -120.0;

/// Feed-forward, stereo-linked compressor with a soft knee
///
/// The detector follows the loudest channel so both channels get the same
/// gain and the stereo image does not shift.
#[derive(Debug, Clone)]
pub struct Compressor {
    params: CompressorParams,
    attack_coeff: f32,
    release_coeff: f32,
    envelope_db: f32,
}

impl Compressor {
    /// Create a compressor for the given rate
    pub fn new(params: CompressorParams, sample_rate: u32) -> Self {
        let coeff = |seconds: f32| {
            if seconds <= 0.0 {
                0.0
            } else {
                (-1.0 / (seconds * sample_rate as f32)).exp()
            }
        };
        Compressor {
            params,
            attack_coeff: coeff(params.attack),
            release_coeff: coeff(params.release),
            envelope_db: 0.0,
        }
    }

    /// Settings this stage was built with
    pub fn params(&self) -> &CompressorParams {
        &self.params
    }

    /// Current gain reduction in dB (zero or negative)
    pub fn reduction_db(&self) -> f32 {
        self.envelope_db
    }

    /// Static output level for an input level, both in dB
    pub fn static_curve(&self, level_db: f32) -> f32 {
        let CompressorParams { threshold_db, knee_db, ratio, .. } = self.params;
        let over = level_db - threshold_db;
        let slope = 1.0 / ratio.max(1.0) - 1.0;

        if 2.0 * over < -knee_db {
            level_db
        } else if knee_db > 0.0 && 2.0 * over.abs() <= knee_db {
            level_db + slope * (over + knee_db / 2.0).powi(2) / (2.0 * knee_db)
        } else {
            threshold_db + over / ratio.max(1.0)
        }
    }
}

impl super::Filter for Compressor {
    fn process(&mut self, block: &mut [Vec<f32>]) -> AudioResult<()> {
        let frames = block.first().map(Vec::len).unwrap_or(0);

        for i in 0..frames {
            let peak = block.iter().map(|channel| channel[i].abs()).fold(0.0f32, f32::max);
            let level_db = if peak > 0.0 {
                (20.0 * peak.log10()).max(MIN_LEVEL_DB)
            } else {
                MIN_LEVEL_DB
            };

            let target = self.static_curve(level_db) - level_db;
            let coeff = if target < self.envelope_db {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.envelope_db = coeff * self.envelope_db + (1.0 - coeff) * target;

            let gain = 10.0_f32.powf(self.envelope_db / 20.0);
            for channel in block.iter_mut() {
                channel[i] *= gain;
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.envelope_db = 0.0;
    }

    fn name(&self) -> &'static str {
        "compressor"
    }
}
