//! Core domain types
//!
//! Pure types with no I/O dependencies beyond configuration persistence.
//! These represent the core concepts of the frame synchronizer.

pub mod config;
pub mod error;
pub mod types;

pub use config::*;
pub use error::*;
pub use types::*;
