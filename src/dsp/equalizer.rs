//! Adaptive linear equalizer (normalized LMS)

use super::buffer::SampleBuffer;
use crate::domain::Sample;
use crate::ports::Modem;

/// Where the equalizer gets its reference symbol from
pub enum DecisionSource<'a> {
    /// Symbols known in advance, indexed by position in the sequence
    TrainingSequence(&'a [Sample]),
    /// Nearest constellation point of the equalized output
    HardDecision(&'a dyn Modem),
}

impl DecisionSource<'_> {
    pub fn decide(&self, index: usize, equalized: Sample) -> Sample {
        match self {
            // past the end of the training data there is nothing to learn from
            Self::TrainingSequence(symbols) => symbols.get(index).copied().unwrap_or(equalized),
            Self::HardDecision(modem) => modem.modulate(modem.demodulate(equalized)),
        }
    }
}

/// Output of one equalizer step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equalized {
    pub output: Sample,
    pub decision: Sample,
}

impl Equalized {
    /// Squared decision error
    pub fn error_power(&self) -> f32 {
        (self.output - self.decision).norm_sqr()
    }
}

/// FIR equalizer whose taps follow w -= mu * e * conj(x) / |x|^2
#[derive(Debug)]
pub struct Equalizer {
    taps: Vec<Sample>,
    step_size: f32,
    window: SampleBuffer,
}

impl Equalizer {
    pub fn new(length: usize, step_size: f32) -> Self {
        let length = length.max(1);
        let mut eq = Self {
            taps: vec![Sample::new(0.0, 0.0); length],
            step_size,
            window: SampleBuffer::new(length),
        };
        eq.reset();
        eq
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    pub fn taps(&self) -> &[Sample] {
        &self.taps
    }

    pub fn push(&mut self, x: Sample) {
        self.window.push(x);
    }

    /// Filter output for the current window
    pub fn execute(&self) -> Sample {
        self.window
            .iter()
            .rev()
            .zip(&self.taps)
            .map(|(x, w)| w * x)
            .sum()
    }

    /// Update taps from a decision and the output it was made on
    ///
    /// Skipped until the window is full.
    pub fn adapt(&mut self, decision: Sample, equalized: Sample) {
        if !self.window.is_full() {
            return;
        }
        let energy: f32 = self.window.iter().map(|x| x.norm_sqr()).sum();
        if energy <= f32::EPSILON {
            return;
        }
        let error = equalized - decision;
        let gain = error * (self.step_size / energy);
        for (w, x) in self.taps.iter_mut().zip(self.window.iter().rev()) {
            *w -= gain * x.conj();
        }
    }

    /// Push, filter, decide and adapt in one call
    pub fn step(&mut self, x: Sample, source: &DecisionSource<'_>, index: usize) -> Equalized {
        self.push(x);
        let output = self.execute();
        let decision = source.decide(index, output);
        self.adapt(decision, output);
        Equalized { output, decision }
    }

    /// Restore the pass-through taps and clear the window
    pub fn reset(&mut self) {
        self.taps.fill(Sample::new(0.0, 0.0));
        self.taps[0] = Sample::new(1.0, 0.0);
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::LinearModem;
    use crate::domain::ModulationScheme;

    #[test]
    fn test_fresh_equalizer_passes_input_through() {
        let mut eq = Equalizer::new(5, 0.1);
        for i in 0..10 {
            let x = Sample::new(i as f32, -(i as f32));
            eq.push(x);
            assert_eq!(eq.execute(), x);
        }
    }

    #[test]
    fn test_training_removes_fixed_rotation() {
        let mut eq = Equalizer::new(3, 0.2);
        let rotation = Sample::from_polar(1.0, 0.6);
        let training: Vec<Sample> = (0..400)
            .map(|i| Sample::new(if (i * 13) % 7 < 3 { 1.0 } else { -1.0 }, 0.0))
            .collect();
        let source = DecisionSource::TrainingSequence(&training);
        let mut last = Equalized { output: Sample::new(0.0, 0.0), decision: Sample::new(0.0, 0.0) };
        for (i, s) in training.iter().enumerate() {
            last = eq.step(s * rotation, &source, i);
        }
        assert!(last.error_power() < 1e-3, "residual error {}", last.error_power());
    }

    #[test]
    fn test_hard_decision_uses_nearest_point() {
        let modem = LinearModem::new(ModulationScheme::Qpsk);
        let source = DecisionSource::HardDecision(&modem);
        let d = source.decide(0, Sample::new(0.9, -0.2));
        let a = std::f32::consts::FRAC_1_SQRT_2;
        assert!((d - Sample::new(a, -a)).norm() < 1e-6);
    }

    #[test]
    fn test_training_past_end_leaves_taps_alone() {
        let mut eq = Equalizer::new(2, 0.5);
        let source = DecisionSource::TrainingSequence(&[]);
        for _ in 0..10 {
            eq.step(Sample::new(0.3, 0.1), &source, 5);
        }
        assert_eq!(eq.taps()[0], Sample::new(1.0, 0.0));
        assert_eq!(eq.taps()[1], Sample::new(0.0, 0.0));
    }

    #[test]
    fn test_reset_restores_identity() {
        let mut eq = Equalizer::new(4, 0.5);
        let modem = LinearModem::new(ModulationScheme::Bpsk);
        let source = DecisionSource::HardDecision(&modem);
        for i in 0..50 {
            eq.step(Sample::new(0.5, 0.2 * (i % 3) as f32), &source, i);
        }
        eq.reset();
        assert_eq!(eq.taps()[0], Sample::new(1.0, 0.0));
        assert!(eq.taps()[1..].iter().all(|w| *w == Sample::new(0.0, 0.0)));
        eq.push(Sample::new(2.0, 1.0));
        assert_eq!(eq.execute(), Sample::new(2.0, 1.0));
    }
}
