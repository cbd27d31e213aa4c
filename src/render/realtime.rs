use crate::core::SampleBuffer;
use crate::error::{AudioError, AudioResult};
use crate::graph::{AnalyserHandle, AudioGraph, StageGraph};
use crate::mastering::{build_chain, MasteringOptions};
use log::{debug, info, warn};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default analyser size for previews
pub const PREVIEW_FFT_SIZE: usize = 2048;

/// Lifecycle of a realtime context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Rendering whenever a session is active
    Running,
    /// Sessions are held in place until resumed
    Suspended,
    /// No further sessions can start
    Closed,
}

/// Output device abstraction fed by the realtime context
pub trait AudioSink: Send {
    /// Deliver one rendered planar block
    fn write(&mut self, block: &[Vec<f32>], sample_rate: u32) -> AudioResult<()>;

    /// Forget any clock state, called after a gap in the stream
    fn reset_clock(&mut self) {}
}

/// Sink that discards audio as fast as it arrives
#[derive(Debug, Default)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn write(&mut self, _block: &[Vec<f32>], _sample_rate: u32) -> AudioResult<()> {
        Ok(())
    }
}

/// Sink that discards audio at the pace a device would consume it
#[derive(Debug, Default)]
pub struct PacedSink {
    clock: Option<(Instant, u32)>,
    frames: u64,
}

impl PacedSink {
    /// Create a sink with an idle clock
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioSink for PacedSink {
    fn write(&mut self, block: &[Vec<f32>], sample_rate: u32) -> AudioResult<()> {
        let started = match self.clock {
            Some((started, rate)) if rate == sample_rate => started,
            _ => {
                let now = Instant::now();
                self.clock = Some((now, sample_rate));
                self.frames = 0;
                now
            }
        };

        self.frames += block.first().map(Vec::len).unwrap_or(0) as u64;
        let due = started + Duration::from_secs_f64(self.frames as f64 / sample_rate as f64);
        if let Some(wait) = due.checked_duration_since(Instant::now()) {
            thread::sleep(wait);
        }
        Ok(())
    }

    fn reset_clock(&mut self) {
        self.clock = None;
    }
}

const PLAYING: u8 = 0;
const ENDED: u8 = 1;
const STOPPED: u8 = 2;

struct Shared {
    state: Mutex<ContextState>,
    wake: Condvar,
}

struct Session {
    status: Arc<AtomicU8>,
    position: Arc<AtomicUsize>,
    sample_rate: u32,
    worker: Option<JoinHandle<()>>,
}

impl Session {
    fn stop(&mut self, shared: &Shared) {
        {
            let _state = shared.state.lock();
            let _ = self
                .status
                .compare_exchange(PLAYING, STOPPED, Ordering::SeqCst, Ordering::SeqCst);
        }
        shared.wake.notify_all();

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                debug!("Preview worker panicked before it could be stopped");
            }
        }
    }

    fn is_playing(&self) -> bool {
        self.status.load(Ordering::SeqCst) == PLAYING
    }
}

/// Long-lived context that previews buffers through a sink in real time
///
/// At most one playback session is active; starting another tears the
/// previous one down first and suppresses its completion callback.
pub struct RealtimeContext {
    shared: Arc<Shared>,
    sink: Arc<Mutex<Box<dyn AudioSink>>>,
    session: Option<Session>,
    fft_size: usize,
}

impl RealtimeContext {
    /// Create a running context writing into `sink`
    pub fn new<S: AudioSink + 'static>(sink: S) -> Self {
        RealtimeContext {
            shared: Arc::new(Shared {
                state: Mutex::new(ContextState::Running),
                wake: Condvar::new(),
            }),
            sink: Arc::new(Mutex::new(Box::new(sink))),
            session: None,
            fft_size: PREVIEW_FFT_SIZE,
        }
    }

    /// Use a different analyser size for subsequent previews
    pub fn with_fft_size(mut self, fft_size: usize) -> Self {
        self.fft_size = fft_size;
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> ContextState {
        *self.shared.state.lock()
    }

    /// Hold playback in place
    pub fn suspend(&self) -> AudioResult<()> {
        let mut state = self.shared.state.lock();
        match *state {
            ContextState::Closed => Err(AudioError::ContextClosed),
            _ => {
                *state = ContextState::Suspended;
                Ok(())
            }
        }
    }

    /// Continue playback after [`RealtimeContext::suspend`]
    pub fn resume(&self) -> AudioResult<()> {
        {
            let mut state = self.shared.state.lock();
            match *state {
                ContextState::Closed => return Err(AudioError::ContextClosed),
                ContextState::Suspended => {
                    debug!("Resuming realtime context");
                    *state = ContextState::Running;
                }
                ContextState::Running => {}
            }
        }
        self.shared.wake.notify_all();
        Ok(())
    }

    /// Stop any session and refuse new ones
    pub fn close(&mut self) {
        self.stop();
        *self.shared.state.lock() = ContextState::Closed;
        self.shared.wake.notify_all();
    }

    /// Whether a session is currently producing audio
    pub fn is_playing(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_playing)
    }

    /// Playback time of the current or last session
    pub fn position(&self) -> Option<Duration> {
        self.session.as_ref().map(|session| {
            let frames = session.position.load(Ordering::SeqCst);
            Duration::from_secs_f64(frames as f64 / session.sample_rate as f64)
        })
    }

    /// Play `buffer` from `offset`, through the mastering chain when
    /// `effects` is given or straight to the output otherwise
    ///
    /// `on_ended` runs once when playback reaches the end of the buffer. It
    /// does not run when the session is stopped or replaced.
    pub fn start_preview<F>(
        &mut self,
        buffer: Arc<SampleBuffer>,
        effects: Option<&MasteringOptions>,
        offset: Duration,
        on_ended: F,
    ) -> AudioResult<AnalyserHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        self.stop();
        match self.state() {
            ContextState::Closed => return Err(AudioError::ContextClosed),
            ContextState::Suspended => self.resume()?,
            ContextState::Running => {}
        }

        let sample_rate = buffer.sample_rate();
        let mut graph = StageGraph::new(buffer.channel_count(), sample_rate)?;
        let (tap, analyser) = graph.create_analyser_stage(self.fft_size)?;
        match effects {
            Some(options) => {
                let chain = build_chain(&mut graph, options)?;
                graph.connect(graph.source(), chain.input)?;
                graph.connect(chain.output, tap)?;
            }
            None => graph.connect(graph.source(), tap)?,
        }
        graph.connect(tap, graph.destination())?;

        let start = buffer.frames_for(offset).min(buffer.len());
        let status = Arc::new(AtomicU8::new(PLAYING));
        let position = Arc::new(AtomicUsize::new(start));
        info!(
            "Preview from {:.2}s of {:.2}s ({})",
            offset.as_secs_f64(),
            buffer.duration().as_secs_f64(),
            if effects.is_some() { "mastered" } else { "bypass" }
        );

        let playback = Playback {
            buffer,
            graph,
            sink: Arc::clone(&self.sink),
            shared: Arc::clone(&self.shared),
            status: Arc::clone(&status),
            position: Arc::clone(&position),
        };
        let worker = thread::Builder::new()
            .name("preview".to_string())
            .spawn(move || playback.run(start, on_ended))?;

        self.session = Some(Session {
            status,
            position,
            sample_rate,
            worker: Some(worker),
        });
        Ok(analyser)
    }

    /// Stop the active session; calling it again, or after playback ended, is a no-op
    pub fn stop(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.stop(&self.shared);
        }
    }
}

impl Drop for RealtimeContext {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Playback {
    buffer: Arc<SampleBuffer>,
    graph: StageGraph,
    sink: Arc<Mutex<Box<dyn AudioSink>>>,
    shared: Arc<Shared>,
    status: Arc<AtomicU8>,
    position: Arc<AtomicUsize>,
}

impl Playback {
    fn playing(&self) -> bool {
        self.status.load(Ordering::SeqCst) == PLAYING
    }

    /// Wait out a suspension; false when the session must end
    fn wait_running(&self) -> bool {
        let mut state = self.shared.state.lock();
        let mut waited = false;
        while *state == ContextState::Suspended && self.playing() {
            waited = true;
            self.shared.wake.wait(&mut state);
        }
        if *state == ContextState::Closed {
            let _ = self
                .status
                .compare_exchange(PLAYING, STOPPED, Ordering::SeqCst, Ordering::SeqCst);
        }
        drop(state);

        if waited {
            self.sink.lock().reset_clock();
        }
        self.playing()
    }

    fn run<F: FnOnce()>(mut self, start: usize, on_ended: F) {
        let len = self.buffer.len();
        let block_size = self.graph.block_size();
        let sample_rate = self.buffer.sample_rate();
        self.sink.lock().reset_clock();

        let mut position = start;
        while position < len {
            if !self.wait_running() {
                debug!("Preview stopped at frame {}", position);
                return;
            }

            let frames = block_size.min(len - position);
            let block = self.buffer.block(position, frames);
            let written = self
                .graph
                .process_block(&block)
                .and_then(|output| self.sink.lock().write(&output, sample_rate));
            if let Err(e) = written {
                warn!("Preview aborted at frame {}: {}", position, e);
                break;
            }

            position += frames;
            self.position.store(position, Ordering::SeqCst);
        }

        if self
            .status
            .compare_exchange(PLAYING, ENDED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            debug!("Preview reached the end of the buffer");
            on_ended();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RENDER_QUANTUM;
    use crate::mastering::Preset;
    use std::sync::mpsc;

    /// Counts frames delivered, optionally at device pace
    struct CountingSink {
        frames: Arc<AtomicUsize>,
        pace: Option<PacedSink>,
    }

    impl CountingSink {
        fn new(frames: &Arc<AtomicUsize>, paced: bool) -> Self {
            CountingSink {
                frames: Arc::clone(frames),
                pace: paced.then(PacedSink::new),
            }
        }
    }

    impl AudioSink for CountingSink {
        fn write(&mut self, block: &[Vec<f32>], sample_rate: u32) -> AudioResult<()> {
            self.frames.fetch_add(block[0].len(), Ordering::SeqCst);
            match self.pace.as_mut() {
                Some(pace) => pace.write(block, sample_rate),
                None => Ok(()),
            }
        }

        fn reset_clock(&mut self) {
            if let Some(pace) = self.pace.as_mut() {
                pace.reset_clock();
            }
        }
    }

    fn constant(value: f32, secs: f32, rate: u32) -> Arc<SampleBuffer> {
        let len = (secs * rate as f32) as usize;
        Arc::new(SampleBuffer::new(vec![vec![value; len]; 2], rate).unwrap())
    }

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_natural_end_fires_callback_once() {
        let mut context = RealtimeContext::new(NullSink);
        let (tx, rx) = mpsc::channel();
        let (count, bump) = counter();
        let analyser = context
            .start_preview(constant(0.5, 0.2, 8000), None, Duration::ZERO, move || {
                bump();
                let _ = tx.send(());
            })
            .unwrap();

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(!context.is_playing());

        // stopping a finished session is a no-op
        context.stop();
        context.stop();
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!context.is_playing());

        let position = context.position().unwrap_or_default();
        assert!((position.as_secs_f64() - 0.2).abs() < 1e-6);
        assert!((analyser.peak() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_offset_skips_audio() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let mut context = RealtimeContext::new(CountingSink::new(&delivered, false));
        let (tx, rx) = mpsc::channel();
        context
            .start_preview(
                constant(0.1, 1.0, 8000),
                None,
                Duration::from_millis(500),
                move || {
                    let _ = tx.send(());
                },
            )
            .unwrap();

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(delivered.load(Ordering::SeqCst), 4000);
    }

    #[test]
    fn test_offset_past_end_ends_immediately() {
        let mut context = RealtimeContext::new(NullSink);
        let (tx, rx) = mpsc::channel();
        context
            .start_preview(constant(0.1, 0.1, 8000), None, Duration::from_secs(3), move || {
                let _ = tx.send(());
            })
            .unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn test_stop_suppresses_callback_and_is_idempotent() {
        let mut context = RealtimeContext::new(PacedSink::new());
        let (ended, on_ended) = counter();
        context
            .start_preview(constant(0.1, 10.0, 8000), None, Duration::ZERO, on_ended)
            .unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(context.is_playing());

        context.stop();
        context.stop();
        assert!(!context.is_playing());
        assert_eq!(ended.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_new_preview_replaces_previous() {
        let mut context = RealtimeContext::new(PacedSink::new());
        let (first_ended, on_first) = counter();
        context
            .start_preview(constant(0.1, 10.0, 8000), None, Duration::ZERO, on_first)
            .unwrap();

        let (tx, rx) = mpsc::channel();
        let options = MasteringOptions::new(Preset::Podcast).with_enhance(0.5);
        context
            .start_preview(
                constant(0.1, 0.1, 8000),
                Some(&options),
                Duration::ZERO,
                move || {
                    let _ = tx.send(());
                },
            )
            .unwrap();

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first_ended.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_suspended_context_resumes_on_start() {
        let mut context = RealtimeContext::new(NullSink);
        context.suspend().unwrap();
        assert_eq!(context.state(), ContextState::Suspended);

        let (tx, rx) = mpsc::channel();
        context
            .start_preview(constant(0.1, 0.1, 8000), None, Duration::ZERO, move || {
                let _ = tx.send(());
            })
            .unwrap();
        assert_eq!(context.state(), ContextState::Running);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn test_suspend_holds_playback() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let mut context = RealtimeContext::new(CountingSink::new(&delivered, true));
        let (ended, on_ended) = counter();
        context
            .start_preview(constant(0.1, 60.0, 44100), None, Duration::ZERO, on_ended)
            .unwrap();
        thread::sleep(Duration::from_millis(30));
        context.suspend().unwrap();
        thread::sleep(Duration::from_millis(40));
        let held = delivered.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(60));
        // at most the block in flight when suspension took effect
        assert!(delivered.load(Ordering::SeqCst) - held <= RENDER_QUANTUM);
        assert!(context.is_playing());

        context.close();
        assert_eq!(context.state(), ContextState::Closed);
        assert!(!context.is_playing());
        assert_eq!(ended.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_closed_context_refuses_preview() {
        let mut context = RealtimeContext::new(NullSink);
        context.close();
        let result = context.start_preview(constant(0.1, 0.1, 8000), None, Duration::ZERO, || {});
        assert!(matches!(result, Err(AudioError::ContextClosed)));
        assert!(context.resume().is_err());
    }
}
