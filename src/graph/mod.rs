//! Stage graph: the capability interface the mastering chain is wired against,
//! plus a software engine that executes it block by block.

pub mod analyser;

pub use analyser::{Analyser, AnalyserHandle};

use crate::core::SampleBuffer;
use crate::error::{AudioError, AudioResult};
use crate::filter::{
    Biquad, BiquadParams, Compressor, CompressorParams, Convolver, Filter, Gain,
};
use log::debug;
use std::collections::VecDeque;

/// Frames processed per block
pub const RENDER_QUANTUM: usize = 1024;

/// Handle to a node inside one graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Capabilities a mastering chain needs from its host
///
/// Stages are constructed through the graph and connected into an arbitrary
/// directed acyclic graph between `source()` and `destination()`. A node
/// with several inputs sums them.
pub trait AudioGraph {
    /// Rate the graph runs at
    fn sample_rate(&self) -> u32;

    /// Node that emits the input signal
    fn source(&self) -> NodeId;

    /// Node whose summed input is the graph output
    fn destination(&self) -> NodeId;

    /// Linear gain stage
    fn create_gain_stage(&mut self, gain: f32) -> NodeId;

    /// Biquad filter stage
    fn create_filter_stage(&mut self, params: BiquadParams) -> NodeId;

    /// Dynamics compressor stage
    fn create_dynamics_stage(&mut self, params: CompressorParams) -> NodeId;

    /// Convolution stage with a normalized impulse response
    fn create_convolution_stage(&mut self, impulse: &SampleBuffer) -> AudioResult<NodeId>;

    /// Pass-through monitoring tap
    fn create_analyser_stage(&mut self, fft_size: usize) -> AudioResult<(NodeId, AnalyserHandle)>;

    /// Route the output of `from` into `to`
    fn connect(&mut self, from: NodeId, to: NodeId) -> AudioResult<()>;
}

struct Node {
    stage: Option<Box<dyn Filter>>,
    inputs: Vec<usize>,
    output: Vec<Vec<f32>>,
}

const SOURCE: usize = 0;
const DESTINATION: usize = 1;

/// Software implementation of [`AudioGraph`]
pub struct StageGraph {
    sample_rate: u32,
    channels: usize,
    block_size: usize,
    nodes: Vec<Node>,
    order: Option<Vec<usize>>,
}

impl StageGraph {
    /// Create an empty graph (source and destination only)
    pub fn new(channels: usize, sample_rate: u32) -> AudioResult<Self> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidSampleRate { rate: 0 });
        }
        if channels == 0 {
            return Err(AudioError::InvalidChannels {
                expected: 1,
                got: 0,
            });
        }
        let endpoint = || Node {
            stage: None,
            inputs: Vec::new(),
            output: Vec::new(),
        };
        Ok(StageGraph {
            sample_rate,
            channels,
            block_size: RENDER_QUANTUM,
            nodes: vec![endpoint(), endpoint()],
            order: None,
        })
    }

    /// Channels carried on every edge
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames per processing block
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of nodes, source and destination included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Add an arbitrary stage
    pub fn add_stage(&mut self, stage: Box<dyn Filter>) -> NodeId {
        debug!("Graph node {}: {}", self.nodes.len(), stage.name());
        self.nodes.push(Node {
            stage: Some(stage),
            inputs: Vec::new(),
            output: Vec::new(),
        });
        self.order = None;
        NodeId(self.nodes.len() - 1)
    }

    /// Clear every stage's state and cached output
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            if let Some(stage) = node.stage.as_mut() {
                stage.reset();
            }
            node.output.clear();
        }
    }

    /// Run one block (at most `block_size` frames per channel) through the graph
    pub fn process_block(&mut self, input: &[Vec<f32>]) -> AudioResult<Vec<Vec<f32>>> {
        if input.len() != self.channels {
            return Err(AudioError::InvalidChannels {
                expected: self.channels as u32,
                got: input.len() as u32,
            });
        }
        let frames = input.first().map(Vec::len).unwrap_or(0);
        if frames > self.block_size {
            return Err(AudioError::BufferError(format!(
                "Block of {} frames exceeds block size {}",
                frames, self.block_size
            )));
        }

        let order = self.ensure_order()?;
        for index in order {
            let mut mixed = if index == SOURCE {
                input.to_vec()
            } else {
                let mut sum = vec![vec![0.0; frames]; self.channels];
                for &from in &self.nodes[index].inputs {
                    for (out, channel) in sum.iter_mut().zip(&self.nodes[from].output) {
                        for (o, s) in out.iter_mut().zip(channel) {
                            *o += s;
                        }
                    }
                }
                sum
            };

            let node = &mut self.nodes[index];
            if let Some(stage) = node.stage.as_mut() {
                stage.process(&mut mixed)?;
            }
            node.output = mixed;
        }

        Ok(std::mem::take(&mut self.nodes[DESTINATION].output))
    }

    /// Topological order over all nodes, cached until the graph changes
    fn ensure_order(&mut self) -> AudioResult<Vec<usize>> {
        if let Some(order) = &self.order {
            return Ok(order.clone());
        }

        let count = self.nodes.len();
        let mut pending: Vec<usize> = self.nodes.iter().map(|n| n.inputs.len()).collect();
        let mut outputs = vec![Vec::new(); count];
        for (index, node) in self.nodes.iter().enumerate() {
            for &from in &node.inputs {
                outputs[from].push(index);
            }
        }

        let mut ready: VecDeque<usize> = (0..count).filter(|&i| pending[i] == 0).collect();
        let mut order = Vec::with_capacity(count);
        while let Some(index) = ready.pop_front() {
            order.push(index);
            for &next in &outputs[index] {
                pending[next] -= 1;
                if pending[next] == 0 {
                    ready.push_back(next);
                }
            }
        }

        if order.len() != count {
            return Err(AudioError::GraphError("Stage graph contains a cycle".to_string()));
        }
        self.order = Some(order.clone());
        Ok(order)
    }

    fn check(&self, id: NodeId) -> AudioResult<usize> {
        if id.0 < self.nodes.len() {
            Ok(id.0)
        } else {
            Err(AudioError::GraphError(format!("Unknown node {}", id.0)))
        }
    }
}

impl AudioGraph for StageGraph {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn source(&self) -> NodeId {
        NodeId(SOURCE)
    }

    fn destination(&self) -> NodeId {
        NodeId(DESTINATION)
    }

    fn create_gain_stage(&mut self, gain: f32) -> NodeId {
        self.add_stage(Box::new(Gain::new(gain)))
    }

    fn create_filter_stage(&mut self, params: BiquadParams) -> NodeId {
        let sample_rate = self.sample_rate;
        self.add_stage(Box::new(Biquad::new(params, sample_rate)))
    }

    fn create_dynamics_stage(&mut self, params: CompressorParams) -> NodeId {
        let sample_rate = self.sample_rate;
        self.add_stage(Box::new(Compressor::new(params, sample_rate)))
    }

    fn create_convolution_stage(&mut self, impulse: &SampleBuffer) -> AudioResult<NodeId> {
        if impulse.sample_rate() != self.sample_rate {
            return Err(AudioError::InvalidSampleRate {
                rate: impulse.sample_rate(),
            });
        }
        let convolver = Convolver::new(impulse, self.block_size, true)?;
        Ok(self.add_stage(Box::new(convolver)))
    }

    fn create_analyser_stage(&mut self, fft_size: usize) -> AudioResult<(NodeId, AnalyserHandle)> {
        let (tap, handle) = Analyser::new(fft_size)?;
        Ok((self.add_stage(Box::new(tap)), handle))
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> AudioResult<()> {
        let from = self.check(from)?;
        let to = self.check(to)?;
        if from == DESTINATION || to == SOURCE || from == to {
            return Err(AudioError::GraphError(format!(
                "Cannot connect node {} to node {}",
                from, to
            )));
        }
        if !self.nodes[to].inputs.contains(&from) {
            self.nodes[to].inputs.push(from);
            self.order = None;
        }
        Ok(())
    }
}
