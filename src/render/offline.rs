use crate::core::{Channels, SampleBuffer};
use crate::error::{AudioError, AudioResult};
use crate::graph::{AudioGraph, StageGraph};
use log::debug;
use std::time::Instant;

/// Isolated, non-realtime render context sized to one task
///
/// Build the stage graph through [`OfflineContext::graph_mut`], then consume
/// the context with [`OfflineContext::render`]. The output always has exactly
/// the configured channel count, length and rate.
pub struct OfflineContext {
    graph: StageGraph,
    channels: Channels,
    length: usize,
}

impl OfflineContext {
    /// Create a context rendering `length` samples per channel
    pub fn new(channels: Channels, length: usize, sample_rate: u32) -> AudioResult<Self> {
        Ok(OfflineContext {
            graph: StageGraph::new(channels.count() as usize, sample_rate)?,
            channels,
            length,
        })
    }

    /// Create a context matching `buffer` exactly
    pub fn for_buffer(buffer: &SampleBuffer) -> AudioResult<Self> {
        Self::new(buffer.channels(), buffer.len(), buffer.sample_rate())
    }

    /// Samples per channel that will be rendered
    pub fn length(&self) -> usize {
        self.length
    }

    /// Graph to wire stages into
    pub fn graph_mut(&mut self) -> &mut StageGraph {
        &mut self.graph
    }

    /// Render `source` through the graph from start to finish
    ///
    /// A shorter source is padded with silence; a longer one is cut at the
    /// context length.
    pub fn render(mut self, source: &SampleBuffer) -> AudioResult<SampleBuffer> {
        if source.sample_rate() != self.graph.sample_rate() {
            return Err(AudioError::InvalidSampleRate {
                rate: source.sample_rate(),
            });
        }
        if source.channels() != self.channels {
            return Err(AudioError::InvalidChannels {
                expected: self.channels.count(),
                got: source.channels().count(),
            });
        }

        let started = Instant::now();
        let block_size = self.graph.block_size();
        let mut rendered = vec![Vec::with_capacity(self.length); self.graph.channels()];

        let mut position = 0;
        while position < self.length {
            let frames = block_size.min(self.length - position);
            let block = source.block(position, frames);
            let output = self.graph.process_block(&block)?;
            for (out, channel) in rendered.iter_mut().zip(output) {
                out.extend(channel);
            }
            position += frames;
        }

        debug!(
            "Offline render of {} frames through {} nodes took {:?}",
            self.length,
            self.graph.node_count(),
            started.elapsed()
        );
        SampleBuffer::new(rendered, self.graph.sample_rate())
    }
}
