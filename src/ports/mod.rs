//! Port traits (interfaces)
//!
//! These traits define the boundaries between the synchronizer core and its
//! collaborators. Adapters implement them; the frame callback is a port the
//! caller implements.

pub mod fec;
pub mod filter;
pub mod handler;
pub mod integrity;
pub mod modulation;

pub use fec::*;
pub use filter::*;
pub use handler::*;
pub use integrity::*;
pub use modulation::*;
