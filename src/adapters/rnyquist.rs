//! Root-Nyquist prototype filter design

use std::f32::consts::PI;

use crate::domain::{FilterType, SyncError, SyncResult};
use crate::ports::FilterDesign;

/// Square-root raised cosine taps, `2*k*m + 1` long, centered at `k*m`
///
/// Coefficients are left unnormalized: their energy is close to `k`, which
/// gives a transmitted signal of roughly unit power per sample.
pub fn design_rrc(k: usize, m: usize, beta: f32) -> Vec<f32> {
    let kf = k as f32;
    let mf = m as f32;

    (0..2 * k * m + 1)
        .map(|n| {
            // normalized time in symbol periods, centered at m
            let z = n as f32 / kf - mf;

            if z.abs() < 1e-5 {
                return 1.0 - beta + 4.0 * beta / PI;
            }

            let g = 1.0 - 16.0 * beta * beta * z * z;
            if g * g < 1e-5 {
                // 16*beta^2*z^2 == 1
                let g1 = 1.0 + 2.0 / PI;
                let g2 = (0.25 * PI / beta).sin();
                let g3 = 1.0 - 2.0 / PI;
                let g4 = (0.25 * PI / beta).cos();
                return beta / 2.0_f32.sqrt() * (g1 * g2 + g3 * g4);
            }

            let t1 = ((1.0 + beta) * PI * z).cos();
            let t2 = ((1.0 - beta) * PI * z).sin();
            let t3 = 1.0 / (4.0 * beta * z);
            let t4 = 4.0 * beta / (PI * g);
            t4 * (t1 + t2 * t3)
        })
        .collect()
}

/// Filter designer for the root-Nyquist family
#[derive(Debug, Default, Clone, Copy)]
pub struct RootNyquistDesigner;

impl FilterDesign for RootNyquistDesigner {
    fn design(
        &self,
        kind: FilterType,
        samples_per_symbol: usize,
        semi_length: usize,
        excess_bandwidth: f32,
    ) -> SyncResult<Vec<f32>> {
        if samples_per_symbol == 0 || semi_length == 0 {
            return Err(SyncError::Config(format!(
                "cannot design a filter with k={samples_per_symbol}, m={semi_length}"
            )));
        }
        if !(excess_bandwidth > 0.0 && excess_bandwidth <= 1.0) {
            return Err(SyncError::Config(format!(
                "excess bandwidth must be in (0, 1], got {excess_bandwidth}"
            )));
        }
        match kind {
            FilterType::RootRaisedCosine => {
                Ok(design_rrc(samples_per_symbol, semi_length, excess_bandwidth))
            }
        }
    }
}
