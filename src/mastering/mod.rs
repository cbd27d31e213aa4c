//! Mastering chain: preset mapping, stage planning and wiring onto an
//! [`AudioGraph`].

pub mod preset;
pub mod reverb;

pub use preset::{DynamicsProfile, Preset, ToneProfile};
pub use reverb::{impulse_response, ReverbShape};

use crate::core::SampleBuffer;
use crate::error::AudioResult;
use crate::filter::biquad::DEFAULT_Q;
use crate::filter::{BiquadParams, CompressorParams};
use crate::graph::{AudioGraph, NodeId};
use crate::render::OfflineContext;
use log::{debug, info};
use std::time::Instant;

/// Levels above this add the extra denoise low-pass and de-esser shelf
const SECONDARY_STAGE_LEVEL: f32 = 0.3;

/// Preset plus five intensity levels in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MasteringOptions {
    /// Target material
    pub preset: Preset,
    /// Tone boost, compression ratio and makeup gain
    pub enhance: f32,
    /// Rumble and hiss reduction
    pub denoise: f32,
    /// De-esser depth
    pub sibilance: f32,
    /// Boxiness and mud reduction
    pub room: f32,
    /// Reverb send
    pub reverb: f32,
}

fn clamp_level(level: f32) -> f32 {
    if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) }
}

impl MasteringOptions {
    /// All levels at zero for `preset`
    pub fn new(preset: Preset) -> Self {
        MasteringOptions {
            preset,
            ..Default::default()
        }
    }

    /// Set the enhance level
    pub fn with_enhance(mut self, level: f32) -> Self {
        self.enhance = clamp_level(level);
        self
    }

    /// Set the denoise level
    pub fn with_denoise(mut self, level: f32) -> Self {
        self.denoise = clamp_level(level);
        self
    }

    /// Set the de-esser level
    pub fn with_sibilance(mut self, level: f32) -> Self {
        self.sibilance = clamp_level(level);
        self
    }

    /// Set the room treatment level
    pub fn with_room(mut self, level: f32) -> Self {
        self.room = clamp_level(level);
        self
    }

    /// Set the reverb send level
    pub fn with_reverb(mut self, level: f32) -> Self {
        self.reverb = clamp_level(level);
        self
    }

    /// Same options with every level forced into [0, 1]
    pub fn clamped(self) -> Self {
        MasteringOptions {
            preset: self.preset,
            enhance: clamp_level(self.enhance),
            denoise: clamp_level(self.denoise),
            sibilance: clamp_level(self.sibilance),
            room: clamp_level(self.room),
            reverb: clamp_level(self.reverb),
        }
    }
}

/// One stage of a planned chain
#[derive(Debug, Clone, PartialEq)]
pub enum StageSpec {
    /// Biquad filter in the series path
    Filter(BiquadParams),
    /// Compressor in the series path
    Dynamics(CompressorParams),
    /// Linear gain in the series path
    Gain(f32),
}

/// Ordered stage list for one set of options
#[derive(Debug, Clone, PartialEq)]
pub struct MasteringPlan {
    /// Series stages, source side first
    pub stages: Vec<StageSpec>,
    /// Gain of the parallel reverb branch; `None` when reverb is off
    pub reverb_send: Option<f32>,
}

impl MasteringPlan {
    /// Number of biquad stages
    pub fn filter_count(&self) -> usize {
        self.stages
            .iter()
            .filter(|stage| matches!(stage, StageSpec::Filter(_)))
            .count()
    }
}

/// Map options onto the exact stage sequence
pub fn plan_chain(options: &MasteringOptions) -> MasteringPlan {
    let options = options.clamped();
    let mut stages = Vec::new();

    let denoise = options.denoise;
    if denoise > 0.0 {
        stages.push(StageSpec::Filter(BiquadParams::highpass(
            70.0 + 130.0 * denoise,
            0.6,
        )));
        stages.push(StageSpec::Filter(BiquadParams::high_shelf(
            5000.0,
            -(denoise.powf(0.7) * 18.0),
        )));
        if denoise > SECONDARY_STAGE_LEVEL {
            let progress = (denoise - SECONDARY_STAGE_LEVEL) / (1.0 - SECONDARY_STAGE_LEVEL);
            stages.push(StageSpec::Filter(BiquadParams::lowpass(
                18000.0 - progress * 14000.0,
                DEFAULT_Q,
            )));
        }
    }

    let room = options.room;
    if room > 0.0 {
        stages.push(StageSpec::Filter(BiquadParams::peaking(400.0, 1.2, -room * 12.0)));
        stages.push(StageSpec::Filter(BiquadParams::peaking(200.0, 1.0, -room * 6.0)));
    }

    let sibilance = options.sibilance;
    if sibilance > 0.0 {
        stages.push(StageSpec::Filter(BiquadParams::peaking(
            7500.0,
            2.5,
            -sibilance * 24.0,
        )));
        if sibilance > SECONDARY_STAGE_LEVEL {
            stages.push(StageSpec::Filter(BiquadParams::high_shelf(
                10000.0,
                -sibilance * 6.0,
            )));
        }
    }

    let boost = options.enhance * 6.0;
    let tone = options.preset.tone();
    stages.push(StageSpec::Filter(BiquadParams::low_shelf(
        tone.low_shelf_hz,
        boost * tone.low_shelf_factor,
    )));
    stages.push(StageSpec::Filter(BiquadParams::high_shelf(
        tone.high_shelf_hz,
        boost * tone.high_shelf_factor,
    )));
    stages.push(StageSpec::Filter(BiquadParams::peaking(
        tone.mid_hz,
        tone.mid_q,
        boost * tone.mid_factor,
    )));

    let dynamics = options.preset.dynamics();
    stages.push(StageSpec::Dynamics(CompressorParams {
        threshold_db: dynamics.threshold_db,
        knee_db: dynamics.knee_db,
        ratio: dynamics.base_ratio + options.enhance * dynamics.ratio_per_enhance,
        attack: dynamics.attack,
        release: dynamics.release,
    }));

    stages.push(StageSpec::Gain(1.0 + options.enhance * 0.6));

    let reverb_send = (options.reverb > 0.0).then(|| options.reverb * 0.6);
    MasteringPlan {
        stages,
        reverb_send,
    }
}

/// Entry and exit of a wired chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainHandle {
    /// Connect the signal to this node
    pub input: NodeId,
    /// Connect this node onward; it carries dry plus wet
    pub output: NodeId,
}

/// Wire the chain for `options` into `graph`
///
/// Nothing is connected to the graph's source or destination; the caller
/// routes into [`ChainHandle::input`] and out of [`ChainHandle::output`].
pub fn build_chain<G: AudioGraph + ?Sized>(
    graph: &mut G,
    options: &MasteringOptions,
) -> AudioResult<ChainHandle> {
    let plan = plan_chain(options);
    debug!(
        "Mastering chain for {}: {} stages, reverb {:?}",
        options.preset,
        plan.stages.len(),
        plan.reverb_send
    );

    let mut series = Vec::with_capacity(plan.stages.len());
    for stage in &plan.stages {
        series.push(match stage {
            StageSpec::Filter(params) => graph.create_filter_stage(*params),
            StageSpec::Dynamics(params) => graph.create_dynamics_stage(*params),
            StageSpec::Gain(gain) => graph.create_gain_stage(*gain),
        });
    }

    for pair in series.windows(2) {
        graph.connect(pair[0], pair[1])?;
    }

    let output = graph.create_gain_stage(1.0);
    let (input, last) = match (series.first(), series.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => (output, output),
    };
    if last != output {
        graph.connect(last, output)?;
    }

    if let Some(send) = plan.reverb_send {
        let impulse = impulse_response(graph.sample_rate(), &ReverbShape::default())?;
        let convolver = graph.create_convolution_stage(&impulse)?;
        let wet = graph.create_gain_stage(send);
        graph.connect(last, convolver)?;
        graph.connect(convolver, wet)?;
        graph.connect(wet, output)?;
    }

    Ok(ChainHandle { input, output })
}

/// Render `buffer` through the chain for `options` into a new buffer
pub fn master_offline(
    buffer: &SampleBuffer,
    options: &MasteringOptions,
) -> AudioResult<SampleBuffer> {
    let started = Instant::now();
    let mut context = OfflineContext::for_buffer(buffer)?;
    let graph = context.graph_mut();
    let chain = build_chain(graph, options)?;
    graph.connect(graph.source(), chain.input)?;
    graph.connect(chain.output, graph.destination())?;

    let rendered = context.render(buffer)?;
    info!(
        "Mastered {:.2}s with preset {} in {:?}",
        buffer.duration().as_secs_f64(),
        options.preset,
        started.elapsed()
    );
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::BiquadKind;

    fn filters(plan: &MasteringPlan) -> Vec<BiquadParams> {
        plan.stages
            .iter()
            .filter_map(|stage| match stage {
                StageSpec::Filter(params) => Some(*params),
                _ => None,
            })
            .collect()
    }

    fn sine(frequency: f32, amplitude: f32, len: usize, rate: u32) -> Vec<f32> {
        (0..len)
            .map(|i| {
                amplitude * (2.0 * std::f32::consts::PI * frequency * i as f32 / rate as f32).sin()
            })
            .collect()
    }

    #[test]
    fn test_dry_plan_has_tone_dynamics_and_makeup_only() {
        let plan = plan_chain(&MasteringOptions::new(Preset::Music));
        assert_eq!(plan.stages.len(), 5);
        assert_eq!(plan.filter_count(), 3);
        assert!(filters(&plan).iter().all(|f| f.gain_db == 0.0));
        assert_eq!(plan.stages[4], StageSpec::Gain(1.0));
        assert_eq!(plan.reverb_send, None);
    }

    #[test]
    fn test_denoise_mapping() {
        let plan = plan_chain(&MasteringOptions::new(Preset::Podcast).with_denoise(0.3));
        let f = filters(&plan);
        assert_eq!(f[0].kind, BiquadKind::Highpass);
        assert!((f[0].frequency - 109.0).abs() < 1e-3);
        assert_eq!(f[0].q, 0.6);
        assert_eq!(f[1].kind, BiquadKind::Highshelf);
        assert!((f[1].gain_db + 0.3f32.powf(0.7) * 18.0).abs() < 1e-4);
        // exactly 0.3 does not add the low-pass
        assert_eq!(f[2].kind, BiquadKind::Lowshelf);

        let full = filters(&plan_chain(&MasteringOptions::new(Preset::Podcast).with_denoise(1.0)));
        assert_eq!(full[2].kind, BiquadKind::Lowpass);
        assert!((full[2].frequency - 4000.0).abs() < 1e-2);

        let mid = filters(&plan_chain(&MasteringOptions::new(Preset::Podcast).with_denoise(0.65)));
        assert!((mid[2].frequency - 11000.0).abs() < 1e-1);
    }

    #[test]
    fn test_room_and_sibilance_mapping_order() {
        let options = MasteringOptions::new(Preset::Narration)
            .with_room(0.5)
            .with_sibilance(0.5);
        let f = filters(&plan_chain(&options));
        assert_eq!((f[0].frequency, f[0].q, f[0].gain_db), (400.0, 1.2, -6.0));
        assert_eq!((f[1].frequency, f[1].q, f[1].gain_db), (200.0, 1.0, -3.0));
        assert_eq!((f[2].frequency, f[2].q, f[2].gain_db), (7500.0, 2.5, -12.0));
        assert_eq!(f[3].kind, BiquadKind::Highshelf);
        assert_eq!((f[3].frequency, f[3].gain_db), (10000.0, -3.0));
        assert_eq!(f[4].kind, BiquadKind::Lowshelf);
    }

    #[test]
    fn test_tone_and_dynamics_per_preset() {
        let music = plan_chain(&MasteringOptions::new(Preset::Music).with_enhance(1.0));
        let f = filters(&music);
        assert_eq!((f[0].frequency, f[1].frequency), (60.0, 12000.0));
        assert!((f[0].gain_db - 3.6).abs() < 1e-5);
        assert!((f[1].gain_db - 3.6).abs() < 1e-5);
        assert_eq!(f[2].frequency, 300.0);
        assert!((f[2].gain_db + 1.2).abs() < 1e-5);
        match music.stages[3] {
            StageSpec::Dynamics(params) => {
                assert_eq!(params.threshold_db, -14.0);
                assert_eq!(params.ratio, 3.0);
                assert_eq!(params.attack, 0.05);
            }
            ref other => panic!("expected compressor, got {:?}", other),
        }
        match music.stages[4] {
            StageSpec::Gain(gain) => assert!((gain - 1.6).abs() < 1e-6),
            ref other => panic!("expected makeup gain, got {:?}", other),
        }

        let podcast = plan_chain(&MasteringOptions::new(Preset::Podcast).with_enhance(0.5));
        match podcast.stages[3] {
            StageSpec::Dynamics(params) => {
                assert_eq!(params.threshold_db, -18.0);
                assert_eq!(params.knee_db, 10.0);
                assert_eq!(params.ratio, 10.0);
                assert_eq!(params.release, 0.15);
            }
            ref other => panic!("expected compressor, got {:?}", other),
        }
    }

    #[test]
    fn test_levels_are_clamped() {
        let options = MasteringOptions::new(Preset::Music)
            .with_enhance(4.0)
            .with_reverb(-1.0)
            .with_denoise(f32::NAN);
        assert_eq!(options.enhance, 1.0);
        assert_eq!(options.reverb, 0.0);
        assert_eq!(options.denoise, 0.0);
        assert_eq!(plan_chain(&options).reverb_send, None);
    }

    #[test]
    fn test_reverb_send() {
        let plan = plan_chain(&MasteringOptions::new(Preset::Music).with_reverb(0.5));
        assert!((plan.reverb_send.unwrap_or_default() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_dry_chain_is_near_identity() {
        let rate = 44100;
        let samples = sine(440.0, 0.05, rate as usize / 2, rate);
        let buffer = SampleBuffer::new(vec![samples.clone(), samples], rate).unwrap();

        let output = master_offline(&buffer, &MasteringOptions::default()).unwrap();
        assert_eq!(output.len(), buffer.len());
        assert_eq!(output.channel_count(), 2);
        for (a, b) in output.channel(0).iter().zip(buffer.channel(0)) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_enhance_raises_level() {
        let rate = 44100;
        let buffer = SampleBuffer::new(vec![sine(1000.0, 0.05, 22050, rate)], rate).unwrap();
        let output =
            master_offline(&buffer, &MasteringOptions::new(Preset::Podcast).with_enhance(1.0))
                .unwrap();
        let before = buffer.joint_mean_abs(11025, 22050);
        let after = output.joint_mean_abs(11025, 22050);
        assert!(after > before * 1.3);
    }

    #[test]
    fn test_reverb_adds_tail_energy() {
        let rate = 8000;
        let mut samples = vec![0.0; 8000];
        samples[..400].iter_mut().for_each(|s| *s = 0.05);
        let buffer = SampleBuffer::new(vec![samples], rate).unwrap();

        let dry = master_offline(&buffer, &MasteringOptions::default()).unwrap();
        let wet = master_offline(&buffer, &MasteringOptions::default().with_reverb(1.0)).unwrap();
        assert!(wet.joint_mean_abs(2000, 6000) > dry.joint_mean_abs(2000, 6000));
    }

    #[test]
    fn test_build_chain_wires_every_planned_stage() {
        let options = MasteringOptions::new(Preset::Podcast)
            .with_denoise(1.0)
            .with_room(1.0)
            .with_sibilance(1.0)
            .with_reverb(0.2);
        let mut graph = crate::graph::StageGraph::new(2, 44100).unwrap();
        let before = graph.node_count();
        let chain = build_chain(&mut graph, &options).unwrap();

        let plan = plan_chain(&options);
        // series stages, summing output, convolver and wet gain
        assert_eq!(graph.node_count() - before, plan.stages.len() + 3);
        assert_ne!(chain.input, chain.output);
    }
}
