use crate::error::AudioResult;

/// Linear gain stage; also used as a summing point in the stage graph
#[derive(Clone, Debug)]
pub struct Gain {
    gain: f32,
}

impl Gain {
    /// Create a gain stage
    pub fn new(gain: f32) -> Self {
        Gain { gain }
    }

    /// Create a gain stage from decibels
    pub fn from_db(db: f32) -> Self {
        Gain::new(10.0_f32.powf(db / 20.0))
    }

    /// Linear gain
    pub fn gain(&self) -> f32 {
        self.gain
    }
}

impl super::Filter for Gain {
    fn process(&mut self, block: &mut [Vec<f32>]) -> AudioResult<()> {
        if self.gain == 1.0 {
            return Ok(());
        }
        for channel in block.iter_mut() {
            for sample in channel.iter_mut() {
                *sample *= self.gain;
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "gain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;

    #[test]
    fn test_gain_scales_all_channels() {
        let mut gain = Gain::new(1.3);
        let mut block = vec![vec![0.5, -0.5], vec![0.1, 0.0]];
        gain.process(&mut block).unwrap();
        assert!((block[0][0] - 0.65).abs() < 1e-6);
        assert!((block[0][1] + 0.65).abs() < 1e-6);
        assert!((block[1][0] - 0.13).abs() < 1e-6);
    }

    #[test]
    fn test_gain_from_db() {
        assert!((Gain::from_db(6.0).gain() - 1.9953).abs() < 1e-3);
        assert_eq!(Gain::from_db(0.0).gain(), 1.0);
    }
}
