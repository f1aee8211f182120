//! Filter design port trait

use crate::domain::{FilterType, SyncResult};

/// Trait for prototype filter design
pub trait FilterDesign {
    /// Design a pulse-shaping prototype
    ///
    /// Returns `2 * samples_per_symbol * semi_length + 1` coefficients.
    fn design(
        &self,
        kind: FilterType,
        samples_per_symbol: usize,
        semi_length: usize,
        excess_bandwidth: f32,
    ) -> SyncResult<Vec<f32>>;
}
