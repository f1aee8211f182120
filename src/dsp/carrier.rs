//! Carrier offset removal
//!
//! Two oscillators are held fixed for the whole frame. The coarse one runs
//! at the sample rate from the detector's estimates; the fine one runs at
//! the symbol rate and is set once from the received preamble symbols.

use num_complex::Complex;

use super::nco::Nco;
use crate::domain::Sample;

/// Removes carrier frequency/phase offset and channel gain
#[derive(Debug, Clone)]
pub struct CarrierTracker {
    coarse: Nco,
    fine: Nco,
    /// Reciprocal of the estimated channel gain
    gain: f32,
    samples_per_symbol: usize,
}

impl CarrierTracker {
    pub fn new(samples_per_symbol: usize) -> Self {
        Self {
            coarse: Nco::default(),
            fine: Nco::default(),
            gain: 1.0,
            samples_per_symbol,
        }
    }

    /// Start a frame
    ///
    /// `dphi` is the offset in radians/sample, `phase` the carrier phase of
    /// the next sample passed to [`mix`](Self::mix) and `gamma` the channel gain.
    pub fn init(&mut self, dphi: f32, phase: f32, gamma: f32) {
        self.coarse.set_frequency(dphi as f64);
        self.coarse.set_phase(phase as f64);
        self.fine.reset();
        self.gain = if gamma > f32::EPSILON { 1.0 / gamma } else { 1.0 };
    }

    /// Remove the coarse offset from one sample-rate sample
    pub fn mix(&mut self, x: Sample) -> Sample {
        let y = self.coarse.mix_down(x) * self.gain;
        self.coarse.step();
        y
    }

    /// Remove the fine residual from one symbol
    pub fn mix_symbol(&mut self, x: Sample) -> Sample {
        let y = self.fine.mix_down(x);
        self.fine.step();
        y
    }

    /// Estimate the residual offset from received preamble symbols
    ///
    /// Sets the fine oscillator and corrects `received` in place, leaving
    /// the oscillator aligned with the first symbol after the preamble.
    pub fn refine(&mut self, received: &mut [Sample], reference: &[Sample]) {
        // per-symbol phase increment
        let mut dphi_metric = Complex::new(0.0f32, 0.0);
        let mut prev = Complex::new(0.0f32, 0.0);
        for (rx, known) in received.iter().zip(reference) {
            let r = rx * known.conj();
            dphi_metric += r * prev.conj();
            prev = r;
        }
        let dphi = dphi_metric.arg();

        // phase at the first preamble symbol
        let theta_metric: Sample = received
            .iter()
            .zip(reference)
            .enumerate()
            .map(|(i, (rx, known))| rx * known.conj() * Sample::from_polar(1.0, -dphi * i as f32))
            .sum();
        let theta = theta_metric.arg();

        log::debug!("fine carrier refinement: dphi={dphi:.6} rad/symbol, theta={theta:.4} rad");

        self.fine.set_frequency(dphi as f64);
        self.fine.set_phase(theta as f64);
        for sym in received.iter_mut() {
            *sym = self.mix_symbol(*sym);
        }
    }

    /// Total estimated carrier offset in radians/sample
    pub fn frequency_offset(&self) -> f32 {
        (self.coarse.frequency() + self.fine.frequency() / self.samples_per_symbol as f64) as f32
    }

    pub fn reset(&mut self) {
        self.coarse.reset();
        self.fine.reset();
        self.gain = 1.0;
    }
}
