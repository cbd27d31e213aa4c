//! Analysis and slicing pipelines over whole buffers
//!
//! Every pipeline is a synchronous scan that reads its input buffer and
//! returns freshly allocated output.

pub mod energy;
pub mod segment;
pub mod silence;
pub mod trim;

pub use energy::EnergyMetric;
pub use segment::Segment;
pub use silence::{detect_regions, remove_silence, remove_silence_joined, SilenceConfig};
pub use trim::{find_edges, trim_silence, TrimConfig};
