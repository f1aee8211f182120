//! Symbol timing recovery
//!
//! Matched filtering and resampling in one step: a polyphase bank of the
//! matched filter, designed at `k * npfb` samples/symbol, is evaluated once
//! per symbol at the branch nearest the desired fractional delay. A second
//! bank holding the filter derivative drives a first-order loop that keeps
//! nudging the branch index after the detector's initial estimate.

use super::filter::PolyphaseBank;
use crate::domain::{FilterType, Sample, SyncError, SyncResult};
use crate::ports::FilterDesign;

/// Loop filter memory
const LOOP_ALPHA: f32 = 0.99;
/// Loop gain applied to the timing error
const LOOP_BETA: f32 = 0.05;
/// Derivative taps are scaled so that max|h * dh| equals this value
const DERIVATIVE_SCALE: f32 = 0.06;

/// Central difference of the prototype, normalized against the prototype
fn derivative_taps(h: &[f32]) -> Vec<f32> {
    let n = h.len();
    let mut dh: Vec<f32> = (0..n)
        .map(|i| {
            let lo = if i > 0 { h[i - 1] } else { 0.0 };
            let hi = if i + 1 < n { h[i + 1] } else { 0.0 };
            hi - lo
        })
        .collect();

    let hdh_max = h
        .iter()
        .zip(&dh)
        .map(|(a, b)| (a * b).abs())
        .fold(0.0f32, f32::max);
    if hdh_max > 1e-10 {
        let scale = DERIVATIVE_SCALE / hdh_max;
        for coef in &mut dh {
            *coef *= scale;
        }
    }
    dh
}

/// Interpolating matched filter with fine timing tracking
#[derive(Debug, Clone)]
pub struct TimingRecovery {
    samples_per_symbol: usize,
    semi_length: usize,
    mf: PolyphaseBank,
    dmf: PolyphaseBank,
    /// Reciprocal of the matched filter's energy at the symbol rate
    scale: f32,
    /// Filtered timing error
    q: f32,
    /// Soft (fractional) branch index
    soft_index: f32,
    /// Hard branch index
    index: usize,
    /// Samples remaining until the next symbol
    timer: i64,
}

impl TimingRecovery {
    pub fn new(
        designer: &dyn FilterDesign,
        kind: FilterType,
        samples_per_symbol: usize,
        semi_length: usize,
        excess_bandwidth: f32,
        bank_size: usize,
    ) -> SyncResult<Self> {
        if samples_per_symbol < 2 || bank_size == 0 {
            return Err(SyncError::Config(format!(
                "timing recovery needs k >= 2 and a non-empty bank, got k={samples_per_symbol}, npfb={bank_size}"
            )));
        }
        let h = designer.design(kind, samples_per_symbol * bank_size, semi_length, excess_bandwidth)?;
        let dh = derivative_taps(&h);

        let mf = PolyphaseBank::new(&h, bank_size);
        let dmf = PolyphaseBank::new(&dh, bank_size);

        // branch 0 is the prototype sampled at k samples/symbol
        let energy: f32 = mf.branch(0).iter().map(|c| c * c).sum();
        if energy <= f32::EPSILON {
            return Err(SyncError::Config("matched filter has zero energy".to_string()));
        }

        Ok(Self {
            samples_per_symbol,
            semi_length,
            mf,
            dmf,
            scale: 1.0 / energy,
            q: 0.0,
            soft_index: 0.0,
            index: 0,
            timer: 0,
        })
    }

    fn bank_size(&self) -> usize {
        self.mf.num_branches()
    }

    /// Start a frame with fractional timing offset `tau` (samples)
    ///
    /// The first sample passed to [`execute`](Self::execute) afterwards must
    /// be the one immediately before the frame's first sample.
    pub fn init(&mut self, tau: f32) {
        self.mf.reset();
        self.dmf.reset();
        self.q = 0.0;

        let npfb = self.bank_size() as f32;
        let mut soft = tau * npfb;
        // nearest branch, ties broken toward zero
        let mut index = (soft.abs() - 0.5).ceil().copysign(soft) as i64;
        let mut delay = 0i64;
        if index < 0 {
            index += self.bank_size() as i64;
            soft += npfb;
            delay = -1;
        }
        let index = index.clamp(0, self.bank_size() as i64 - 1);

        self.soft_index = soft;
        self.index = index as usize;
        self.timer = (2 * self.samples_per_symbol * self.semi_length + 1) as i64 + delay;
        log::debug!(
            "timing recovery init: tau={tau:.4}, branch={}, timer={}",
            self.index,
            self.timer
        );
    }

    /// Push one sample; returns a symbol every `k` samples
    pub fn execute(&mut self, x: Sample) -> Option<Sample> {
        self.mf.push(x);
        self.dmf.push(x);

        let mut output = None;
        if self.timer <= 0 {
            self.timer = self.samples_per_symbol as i64;

            let mf = self.mf.execute(self.index) * self.scale;
            let dmf = self.dmf.execute(self.index) * self.scale;

            let error = (mf.conj() * dmf).re.clamp(-1.0, 1.0);
            self.q = LOOP_ALPHA * self.q + LOOP_BETA * error;
            self.soft_index += self.q;

            let npfb = self.bank_size() as f32;
            let mut index = self.soft_index.round() as i64;
            while index < 0 {
                index += self.bank_size() as i64;
                self.soft_index += npfb;
                self.timer -= 1;
            }
            while index > self.bank_size() as i64 - 1 {
                index -= self.bank_size() as i64;
                self.soft_index -= npfb;
                self.timer += 1;
            }
            self.index = index as usize;

            output = Some(mf);
        }
        self.timer -= 1;
        output
    }

    /// Current fractional timing estimate in samples
    pub fn tau(&self) -> f32 {
        self.soft_index / self.bank_size() as f32
    }

    pub fn reset(&mut self) {
        self.mf.reset();
        self.dmf.reset();
        self.q = 0.0;
        self.soft_index = 0.0;
        self.index = 0;
        self.timer = 0;
    }
}
