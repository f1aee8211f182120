//! Digital Signal Processing
//!
//! Sample-level building blocks of the receiver. No I/O dependencies.

pub mod buffer;
pub mod carrier;
pub mod detector;
pub mod equalizer;
pub mod filter;
pub mod nco;
pub mod symsync;

// Re-export commonly used items
pub use buffer::SampleBuffer;
pub use carrier::CarrierTracker;
pub use detector::{shaped_preamble, Detection, PreambleDetector};
pub use equalizer::{DecisionSource, Equalized, Equalizer};
pub use filter::{Interpolator, PolyphaseBank};
pub use nco::Nco;
pub use symsync::TimingRecovery;
