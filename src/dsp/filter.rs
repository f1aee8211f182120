//! Polyphase FIR filtering for complex samples with real taps

use crate::domain::Sample;

/// Bank of FIR branches sharing one delay line
///
/// Branch `b` holds prototype taps `b, b + n, b + 2n, ...` for an
/// `n`-branch bank, so branch `b` evaluates the prototype at a fractional
/// offset of `b / n` of the prototype's tap spacing.
#[derive(Debug, Clone)]
pub struct PolyphaseBank {
    branches: Vec<Vec<f32>>,
    delay_line: Vec<Sample>,
    position: usize,
}

impl PolyphaseBank {
    pub fn new(prototype: &[f32], num_branches: usize) -> Self {
        let num_branches = num_branches.max(1);
        let branch_len = prototype.len().div_ceil(num_branches).max(1);
        let mut branches = vec![vec![0.0f32; branch_len]; num_branches];
        for (i, &coef) in prototype.iter().enumerate() {
            branches[i % num_branches][i / num_branches] = coef;
        }
        Self {
            branches,
            delay_line: vec![Sample::new(0.0, 0.0); branch_len],
            position: 0,
        }
    }

    pub fn num_branches(&self) -> usize {
        self.branches.len()
    }

    pub fn branch(&self, index: usize) -> &[f32] {
        &self.branches[index]
    }

    /// Push a new sample into the shared delay line
    pub fn push(&mut self, sample: Sample) {
        self.delay_line[self.position] = sample;
        self.position = (self.position + 1) % self.delay_line.len();
    }

    /// Evaluate one branch against the delay line, newest sample first
    pub fn execute(&self, branch: usize) -> Sample {
        let taps = &self.branches[branch.min(self.branches.len() - 1)];
        let len = self.delay_line.len();
        let newest = self.position + len - 1;

        taps.iter()
            .enumerate()
            .fold(Sample::new(0.0, 0.0), |acc, (j, &c)| {
                acc + self.delay_line[(newest - j) % len] * c
            })
    }

    /// Reset the filter state
    pub fn reset(&mut self) {
        self.delay_line.fill(Sample::new(0.0, 0.0));
        self.position = 0;
    }
}

/// Symbol-rate to sample-rate interpolator (pulse shaping for the transmitter)
#[derive(Debug, Clone)]
pub struct Interpolator {
    bank: PolyphaseBank,
}

impl Interpolator {
    /// `taps` is the prototype designed at `samples_per_symbol`
    pub fn new(taps: &[f32], samples_per_symbol: usize) -> Self {
        Self {
            bank: PolyphaseBank::new(taps, samples_per_symbol),
        }
    }

    pub fn samples_per_symbol(&self) -> usize {
        self.bank.num_branches()
    }

    /// Push one symbol and append `samples_per_symbol` output samples to `out`
    pub fn execute(&mut self, symbol: Sample, out: &mut Vec<Sample>) {
        self.bank.push(symbol);
        out.extend((0..self.bank.num_branches()).map(|p| self.bank.execute(p)));
    }

    pub fn reset(&mut self) {
        self.bank.reset();
    }
}
