//! Frame Synchronizer
//!
//! Recovers framed packets (preamble, header, payload) from a continuous
//! stream of complex baseband samples with unknown timing, carrier offset
//! and gain.
//!
//! ## Architecture (Hexagonal / Ports & Adapters)
//!
//! - `domain/` - Pure domain types, configuration and errors
//! - `ports/` - Trait definitions for collaborators (filter design, modems, FEC, CRC, frame callback)
//! - `dsp/` - Signal processing blocks (detector, NCO, timing recovery, equalizer)
//! - `modem/` - Protocol logic (header, packets, frame generator, frame synchronizer)
//! - `adapters/` - Default implementations of the collaborator ports
//!
//! ## Example
//!
//! ```no_run
//! use framesync_lib::domain::{Sample, SyncConfig};
//! use framesync_lib::modem::FrameSync;
//! use framesync_lib::ports::FrameCollector;
//!
//! # fn main() -> framesync_lib::domain::SyncResult<()> {
//! let mut sync = FrameSync::new(SyncConfig::default(), FrameCollector::new())?;
//! let samples: Vec<Sample> = Vec::new();
//! sync.push_block(&samples);
//! for frame in sync.handler_mut().take() {
//!     println!("payload valid: {}", frame.payload_valid);
//! }
//! # Ok(())
//! # }
//! ```

// Core domain (pure, no I/O)
pub mod domain;
pub mod dsp;
pub mod modem;
pub mod ports;

// Default collaborators
pub mod adapters;
