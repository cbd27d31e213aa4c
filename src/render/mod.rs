//! Render contexts that drive a [`StageGraph`](crate::graph::StageGraph)
//!
//! [`OfflineContext`] renders a whole buffer as fast as possible and returns
//! the result. [`RealtimeContext`] plays a buffer through an [`AudioSink`] at
//! device pace, one session at a time, with an analyser tap for monitoring.

pub mod offline;
pub mod realtime;

pub use offline::OfflineContext;
pub use realtime::{AudioSink, ContextState, NullSink, PacedSink, RealtimeContext};
