use crate::error::AudioResult;
use std::f64::consts::PI;

/// Filter response shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiquadKind {
    /// Second-order low-pass
    Lowpass,
    /// Second-order high-pass
    Highpass,
    /// Shelf boosting or cutting below the corner frequency
    Lowshelf,
    /// Shelf boosting or cutting above the corner frequency
    Highshelf,
    /// Bell around the center frequency
    Peaking,
}

/// Parameters of one biquad stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadParams {
    /// Response shape
    pub kind: BiquadKind,
    /// Corner or center frequency in Hz
    pub frequency: f32,
    /// Quality factor; unused by shelves (fixed slope of 1)
    pub q: f32,
    /// Gain in dB; unused by low-pass and high-pass
    pub gain_db: f32,
}

/// Butterworth Q
pub const DEFAULT_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

impl BiquadParams {
    /// Low-pass at `frequency`
    pub fn lowpass(frequency: f32, q: f32) -> Self {
        BiquadParams { kind: BiquadKind::Lowpass, frequency, q, gain_db: 0.0 }
    }

    /// High-pass at `frequency`
    pub fn highpass(frequency: f32, q: f32) -> Self {
        BiquadParams { kind: BiquadKind::Highpass, frequency, q, gain_db: 0.0 }
    }

    /// Low shelf at `frequency`
    pub fn low_shelf(frequency: f32, gain_db: f32) -> Self {
        BiquadParams { kind: BiquadKind::Lowshelf, frequency, q: DEFAULT_Q, gain_db }
    }

    /// High shelf at `frequency`
    pub fn high_shelf(frequency: f32, gain_db: f32) -> Self {
        BiquadParams { kind: BiquadKind::Highshelf, frequency, q: DEFAULT_Q, gain_db }
    }

    /// Peaking bell at `frequency`
    pub fn peaking(frequency: f32, q: f32, gain_db: f32) -> Self {
        BiquadParams { kind: BiquadKind::Peaking, frequency, q, gain_db }
    }
}

/// Normalized coefficients (a0 = 1)
#[derive(Debug, Clone, Copy)]
struct Coefficients {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Coefficients {
    /// Audio EQ Cookbook formulas
    fn design(params: &BiquadParams, sample_rate: u32) -> Self {
        let nyquist = sample_rate as f64 / 2.0;
        let frequency = (params.frequency as f64).clamp(1.0, nyquist * 0.999);
        let q = (params.q as f64).max(1e-4);
        let w0 = 2.0 * PI * frequency / sample_rate as f64;
        let (sin_w, cos_w) = w0.sin_cos();
        let a = 10.0_f64.powf(params.gain_db as f64 / 40.0);

        let (b0, b1, b2, a0, a1, a2) = match params.kind {
            BiquadKind::Lowpass => {
                let alpha = sin_w / (2.0 * q);
                (
                    (1.0 - cos_w) / 2.0,
                    1.0 - cos_w,
                    (1.0 - cos_w) / 2.0,
                    1.0 + alpha,
                    -2.0 * cos_w,
                    1.0 - alpha,
                )
            }
            BiquadKind::Highpass => {
                let alpha = sin_w / (2.0 * q);
                (
                    (1.0 + cos_w) / 2.0,
                    -(1.0 + cos_w),
                    (1.0 + cos_w) / 2.0,
                    1.0 + alpha,
                    -2.0 * cos_w,
                    1.0 - alpha,
                )
            }
            BiquadKind::Peaking => {
                let alpha = sin_w / (2.0 * q);
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w,
                    1.0 - alpha / a,
                )
            }
            BiquadKind::Lowshelf => {
                let two_sqrt_a_alpha = sin_w * a.sqrt() * std::f64::consts::SQRT_2;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w),
                    a * ((a + 1.0) - (a - 1.0) * cos_w - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_w + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w),
                    (a + 1.0) + (a - 1.0) * cos_w - two_sqrt_a_alpha,
                )
            }
            BiquadKind::Highshelf => {
                let two_sqrt_a_alpha = sin_w * a.sqrt() * std::f64::consts::SQRT_2;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w),
                    a * ((a + 1.0) + (a - 1.0) * cos_w - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_w + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w),
                    (a + 1.0) - (a - 1.0) * cos_w - two_sqrt_a_alpha,
                )
            }
        };

        Coefficients {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Direct-form-I history for one channel
#[derive(Debug, Clone, Copy, Default)]
struct History {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

/// Second-order IIR filter stage
#[derive(Debug, Clone)]
pub struct Biquad {
    params: BiquadParams,
    sample_rate: u32,
    coeffs: Coefficients,
    history: Vec<History>,
}

impl Biquad {
    /// Design a filter for the given rate
    pub fn new(params: BiquadParams, sample_rate: u32) -> Self {
        Biquad {
            params,
            sample_rate,
            coeffs: Coefficients::design(&params, sample_rate),
            history: Vec::new(),
        }
    }

    /// Filter parameters
    pub fn params(&self) -> &BiquadParams {
        &self.params
    }

    /// Filter a whole mono signal into a new vector
    pub fn filter(&mut self, samples: &[f32]) -> Vec<f32> {
        self.ensure_channels(1);
        samples.iter().map(|&x| self.tick(0, x)).collect()
    }

    /// Magnitude response in dB at `frequency`
    pub fn magnitude_db(&self, frequency: f32) -> f32 {
        let w = 2.0 * PI * frequency as f64 / self.sample_rate as f64;
        let c = &self.coeffs;
        // |b0 + b1 z^-1 + b2 z^-2| / |1 + a1 z^-1 + a2 z^-2| at z = e^{jw}
        let (num_re, num_im) = (
            c.b0 + c.b1 * w.cos() + c.b2 * (2.0 * w).cos(),
            -(c.b1 * w.sin() + c.b2 * (2.0 * w).sin()),
        );
        let (den_re, den_im) = (
            1.0 + c.a1 * w.cos() + c.a2 * (2.0 * w).cos(),
            -(c.a1 * w.sin() + c.a2 * (2.0 * w).sin()),
        );
        let magnitude = (num_re.hypot(num_im)) / (den_re.hypot(den_im));
        (20.0 * magnitude.max(1e-12).log10()) as f32
    }

    fn ensure_channels(&mut self, channels: usize) {
        if self.history.len() < channels {
            self.history.resize(channels, History::default());
        }
    }

    #[inline]
    fn tick(&mut self, channel: usize, x: f32) -> f32 {
        let c = self.coeffs;
        let h = &mut self.history[channel];
        let x = x as f64;
        let y = c.b0 * x + c.b1 * h.x1 + c.b2 * h.x2 - c.a1 * h.y1 - c.a2 * h.y2;
        h.x2 = h.x1;
        h.x1 = x;
        h.y2 = h.y1;
        h.y1 = y;
        y as f32
    }
}

impl super::Filter for Biquad {
    fn process(&mut self, block: &mut [Vec<f32>]) -> AudioResult<()> {
        self.ensure_channels(block.len());
        for (channel, samples) in block.iter_mut().enumerate() {
            for sample in samples.iter_mut() {
                *sample = self.tick(channel, *sample);
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.history.clear();
    }

    fn name(&self) -> &'static str {
        match self.params.kind {
            BiquadKind::Lowpass => "lowpass",
            BiquadKind::Highpass => "highpass",
            BiquadKind::Lowshelf => "lowshelf",
            BiquadKind::Highshelf => "highshelf",
            BiquadKind::Peaking => "peaking",
        }
    }
}
