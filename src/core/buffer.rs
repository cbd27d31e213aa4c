use super::audio::Channels;
use super::region::Region;
use crate::error::{AudioError, AudioResult};
use std::time::Duration;

/// Decoded, planar audio: one `Vec<f32>` per channel, all of equal length
///
/// Amplitudes are conventionally in `[-1.0, 1.0]` but are not clamped.
/// Every transform in this crate reads a `SampleBuffer` and returns a new one;
/// the only in-place writes are the fade helpers, applied to freshly copied
/// output.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    data: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Create a buffer from planar channel data
    pub fn new(data: Vec<Vec<f32>>, sample_rate: u32) -> AudioResult<Self> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidSampleRate { rate: sample_rate });
        }
        Channels::from_count(data.len() as u32)?;

        let len = data[0].len();
        if data.iter().any(|channel| channel.len() != len) {
            return Err(AudioError::BufferError(
                "All channels must have the same length".to_string(),
            ));
        }

        Ok(SampleBuffer { data, sample_rate })
    }

    /// Create a zero-filled buffer
    pub fn silent(channels: Channels, len: usize, sample_rate: u32) -> AudioResult<Self> {
        Self::new(vec![vec![0.0; len]; channels.count() as usize], sample_rate)
    }

    /// Build a planar buffer from interleaved samples
    pub fn from_interleaved(
        samples: &[f32],
        channels: Channels,
        sample_rate: u32,
    ) -> AudioResult<Self> {
        let count = channels.count() as usize;
        if samples.len() % count != 0 {
            return Err(AudioError::BufferError(
                "Sample count not divisible by channel count".to_string(),
            ));
        }

        let mut data = vec![Vec::with_capacity(samples.len() / count); count];
        for frame in samples.chunks_exact(count) {
            for (channel, &sample) in data.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self::new(data, sample_rate)
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel configuration
    pub fn channels(&self) -> Channels {
        if self.data.len() == 1 {
            Channels::Mono
        } else {
            Channels::Stereo
        }
    }

    /// Number of channels as a count
    pub fn channel_count(&self) -> usize {
        self.data.len()
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.data[0].len()
    }

    /// Check if the buffer holds no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Playback duration
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.len() as f64 / self.sample_rate as f64)
    }

    /// Whole samples spanned by `duration` at this buffer's rate (floored)
    pub fn frames_for(&self, duration: Duration) -> usize {
        (duration.as_secs_f64() * self.sample_rate as f64).floor() as usize
    }

    /// Samples of one channel
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.data[index]
    }

    /// Mutable samples of one channel
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.data[index]
    }

    /// All channels as planar slices
    pub fn planar(&self) -> &[Vec<f32>] {
        &self.data
    }

    /// Consume the buffer, returning its planar data
    pub fn into_planar(self) -> Vec<Vec<f32>> {
        self.data
    }

    /// Samples interleaved frame by frame (`L R L R ...` for stereo)
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.len() * self.channel_count());
        for i in 0..self.len() {
            for channel in &self.data {
                out.push(channel[i]);
            }
        }
        out
    }

    /// Merge all channels into one by averaging
    pub fn to_mono(&self) -> Vec<f32> {
        if self.data.len() == 1 {
            return self.data[0].clone();
        }
        let scale = 1.0 / self.data.len() as f32;
        (0..self.len())
            .map(|i| self.data.iter().map(|channel| channel[i]).sum::<f32>() * scale)
            .collect()
    }

    /// Copy `[region.start, region.end)` of every channel into a new buffer
    pub fn slice(&self, region: Region) -> AudioResult<SampleBuffer> {
        region.check_bounds(self.len())?;
        let data = self
            .data
            .iter()
            .map(|channel| channel[region.start..region.end].to_vec())
            .collect();
        Self::new(data, self.sample_rate)
    }

    /// Copy up to `frames` samples per channel starting at `start`, zero padded
    pub(crate) fn block(&self, start: usize, frames: usize) -> Vec<Vec<f32>> {
        let end = (start + frames).min(self.len());
        self.data
            .iter()
            .map(|channel| {
                let mut block = Vec::with_capacity(frames);
                if start < end {
                    block.extend_from_slice(&channel[start..end]);
                }
                block.resize(frames, 0.0);
                block
            })
            .collect()
    }

    /// Concatenate buffers end to end
    ///
    /// All buffers must share channel count and sample rate.
    pub fn concat(buffers: &[SampleBuffer]) -> AudioResult<SampleBuffer> {
        let first = buffers
            .first()
            .ok_or_else(|| AudioError::BufferError("Nothing to concatenate".to_string()))?;

        let total: usize = buffers.iter().map(SampleBuffer::len).sum();
        let mut data = vec![Vec::with_capacity(total); first.channel_count()];
        for buffer in buffers {
            if buffer.sample_rate != first.sample_rate {
                return Err(AudioError::InvalidSampleRate {
                    rate: buffer.sample_rate,
                });
            }
            if buffer.channel_count() != first.channel_count() {
                return Err(AudioError::InvalidChannels {
                    expected: first.channel_count() as u32,
                    got: buffer.channel_count() as u32,
                });
            }
            for (out, channel) in data.iter_mut().zip(&buffer.data) {
                out.extend_from_slice(channel);
            }
        }
        Self::new(data, first.sample_rate)
    }

    /// Linear ramp from 0 up to the first `frames` samples of every channel
    pub fn apply_fade_in(&mut self, frames: usize) {
        let frames = frames.min(self.len());
        for channel in &mut self.data {
            for (i, sample) in channel.iter_mut().take(frames).enumerate() {
                *sample *= i as f32 / frames as f32;
            }
        }
    }

    /// Linear ramp down to 0 over the last `frames` samples of every channel
    pub fn apply_fade_out(&mut self, frames: usize) {
        let frames = frames.min(self.len());
        for channel in &mut self.data {
            for (i, sample) in channel.iter_mut().rev().take(frames).enumerate() {
                *sample *= i as f32 / frames as f32;
            }
        }
    }

    /// Mean absolute amplitude over `[start, end)` taken across all channels jointly
    pub fn joint_mean_abs(&self, start: usize, end: usize) -> f32 {
        let end = end.min(self.len());
        if start >= end {
            return 0.0;
        }
        let sum: f32 = self
            .data
            .iter()
            .map(|channel| channel[start..end].iter().map(|s| s.abs()).sum::<f32>())
            .sum();
        sum / ((end - start) * self.data.len()) as f32
    }
}
