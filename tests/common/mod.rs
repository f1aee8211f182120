//! Shared channel model for the integration tests
//!
//! Everything is seeded so a failing case reproduces exactly.

#![allow(dead_code)]

use std::f32::consts::PI;

use framesync_lib::domain::Sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Install a test logger once; later calls are no-ops
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn zeros(n: usize) -> Vec<Sample> {
    vec![Sample::new(0.0, 0.0); n]
}

/// Surround a burst with silence
pub fn pad(signal: &[Sample], before: usize, after: usize) -> Vec<Sample> {
    let mut out = zeros(before);
    out.extend_from_slice(signal);
    out.extend(zeros(after));
    out
}

/// Seeded complex Gaussian source (Box-Muller)
pub struct Gaussian {
    rng: ChaCha8Rng,
}

impl Gaussian {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Complex sample with standard deviation `sigma` per component
    pub fn sample(&mut self, sigma: f32) -> Sample {
        let u1: f32 = self.rng.gen_range(f32::EPSILON..1.0);
        let u2: f32 = self.rng.gen();
        let r = (-2.0 * u1.ln()).sqrt() * sigma;
        Sample::from_polar(r, 2.0 * PI * u2)
    }

    pub fn index(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }

    pub fn bytes(&mut self, n: usize) -> Vec<u8> {
        (0..n).map(|_| self.rng.gen()).collect()
    }
}

/// Add white Gaussian noise at `snr_db` relative to unit signal power
pub fn awgn(signal: &[Sample], snr_db: f32, seed: u64) -> Vec<Sample> {
    let sigma = (10f32.powf(-snr_db / 10.0) / 2.0).sqrt();
    let mut noise = Gaussian::new(seed);
    signal.iter().map(|x| x + noise.sample(sigma)).collect()
}

/// Delay by a fraction of a sample: y[n] = x(n - tau)
///
/// Hann-windowed sinc interpolator with 32 taps each side.
pub fn fractional_delay(signal: &[Sample], tau: f32) -> Vec<Sample> {
    const TAPS: i64 = 32;
    let n_len = signal.len() as i64;
    (0..n_len)
        .map(|n| {
            let mut acc = Sample::new(0.0, 0.0);
            for j in -TAPS..=TAPS {
                let i = n - j;
                if !(0..n_len).contains(&i) {
                    continue;
                }
                let u = j as f32 - tau;
                let sinc = if u.abs() < 1e-6 { 1.0 } else { (PI * u).sin() / (PI * u) };
                let window = 0.5 + 0.5 * (PI * u / (TAPS + 1) as f32).cos();
                acc += signal[i as usize] * (sinc * window);
            }
            acc
        })
        .collect()
}

/// Apply gain and a carrier offset of `dphi` rad/sample starting at phase `phi`
pub fn carrier_offset(signal: &[Sample], dphi: f32, phi: f32, gain: f32) -> Vec<Sample> {
    signal
        .iter()
        .enumerate()
        .map(|(n, x)| x * Sample::from_polar(gain, phi + dphi * n as f32))
        .collect()
}
