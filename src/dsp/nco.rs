//! Numerically Controlled Oscillator

use std::f64::consts::PI;

use crate::domain::Sample;

/// Complex oscillator with an accumulating phase, in radians/sample
#[derive(Debug, Clone, Default)]
pub struct Nco {
    phase: f64,
    phase_increment: f64,
}

impl Nco {
    /// Create a new NCO at the given frequency (radians/sample)
    pub fn new(frequency: f64) -> Self {
        Self {
            phase: 0.0,
            phase_increment: frequency,
        }
    }

    /// Set the oscillator frequency
    pub fn set_frequency(&mut self, frequency: f64) {
        self.phase_increment = frequency;
    }

    /// Get the current frequency
    pub fn frequency(&self) -> f64 {
        self.phase_increment
    }

    pub fn set_phase(&mut self, phase: f64) {
        self.phase = phase;
        self.wrap_phase();
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Adjust phase by a delta
    pub fn adjust_phase(&mut self, delta: f64) {
        self.phase += delta;
        self.wrap_phase();
    }

    /// Advance the phase by one sample
    pub fn step(&mut self) {
        self.phase += self.phase_increment;
        self.wrap_phase();
    }

    /// Rotate `x` by the negative of the current phase
    pub fn mix_down(&self, x: Sample) -> Sample {
        x * Sample::from_polar(1.0, -self.phase as f32)
    }

    /// Rotate `x` by the current phase
    pub fn mix_up(&self, x: Sample) -> Sample {
        x * Sample::from_polar(1.0, self.phase as f32)
    }

    /// Reset phase and frequency to zero
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.phase_increment = 0.0;
    }

    fn wrap_phase(&mut self) {
        while self.phase >= PI {
            self.phase -= 2.0 * PI;
        }
        while self.phase < -PI {
            self.phase += 2.0 * PI;
        }
    }
}
