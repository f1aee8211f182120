//! Modulation port trait

use crate::domain::{ModulationScheme, Sample};

/// Trait for a linear constellation mapper
pub trait Modem {
    fn scheme(&self) -> ModulationScheme;

    fn bits_per_symbol(&self) -> u32 {
        self.scheme().bits_per_symbol()
    }

    /// Map a symbol index to its constellation point
    fn modulate(&self, symbol: u32) -> Sample;

    /// Hard decision: index of the nearest constellation point
    fn demodulate(&self, sample: Sample) -> u32;
}
