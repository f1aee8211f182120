//! Preamble detection
//!
//! Slides the expected preamble waveform over the input and computes a
//! normalized cross-correlation each sample. The two halves of the window
//! are correlated separately and their magnitudes added, so a carrier
//! offset up to [`PreambleDetector::capture_range`] costs little of the
//! metric. Once above threshold the detector keeps looking for a larger
//! value for one template length before it commits to the peak; sidelobes
//! of short sequences can cross the threshold ahead of the true peak.
//!
//! The three values around the peak give a sub-sample timing estimate.
//! Carrier frequency comes from the phase drift between the two halves,
//! carrier phase and gain from the same two correlations.

use std::f32::consts::PI;

use super::buffer::SampleBuffer;
use super::filter::Interpolator;
use crate::domain::{DetectionStatistics, Sample, SyncError, SyncResult};

/// Fraction of the unambiguous half-window phase slope treated as usable
const CAPTURE_FRACTION: f32 = 0.85;

/// Preamble waveform aligned to its symbol peaks
///
/// The reference is shaped with `taps` at `k` samples/symbol, followed by
/// `m` zero symbols to flush the filter. The first `k * m` outputs (the
/// filter's start-up ramp) are dropped, leaving `k * reference.len()`
/// samples whose every k-th sample sits on a preamble symbol.
pub fn shaped_preamble(reference: &[Sample], taps: &[f32], k: usize, m: usize) -> Vec<Sample> {
    let mut interp = Interpolator::new(taps, k);
    let mut shaped = Vec::with_capacity(k * (reference.len() + m));
    let flush = std::iter::repeat(Sample::new(0.0, 0.0)).take(m);
    for symbol in reference.iter().copied().chain(flush) {
        interp.execute(symbol, &mut shaped);
    }
    shaped.split_off((k * m).min(shaped.len()))
}

/// A confirmed detection
#[derive(Debug, Clone)]
pub struct Detection {
    pub stats: DetectionStatistics,
    /// Raw samples from one before the start of the transmitted preamble
    /// (including its `lead` ramp) up to the sample that confirmed the
    /// peak, oldest first. `buffer[1]` is the first sample of the frame.
    pub buffer: Vec<Sample>,
}

#[derive(Debug, Clone, Copy)]
struct Correlation {
    first_half: Sample,
    second_half: Sample,
}

#[derive(Debug, Clone, Copy)]
enum DetectorState {
    Seeking,
    /// Above threshold, holding the largest value seen so far
    Holding {
        before: f32,
        peak: f32,
        after: Option<f32>,
        correlation: Correlation,
        /// Samples pushed since the peak
        elapsed: usize,
    },
}

/// Normalized cross-correlation detector for a known preamble waveform
#[derive(Debug)]
pub struct PreambleDetector {
    template: Vec<Sample>,
    half: usize,
    energy: f32,
    /// Samples of the transmitted waveform ahead of the template
    lead: usize,
    /// Energy-weighted centre of the template, in samples
    centroid: f32,
    /// Distance between the centres of the two template halves
    half_separation: f32,
    threshold: f32,
    window: SampleBuffer,
    state: DetectorState,
    previous: f32,
}

fn energy_centroid(samples: &[Sample], offset: usize) -> Option<f32> {
    let energy: f32 = samples.iter().map(|s| s.norm_sqr()).sum();
    if energy <= f32::EPSILON {
        return None;
    }
    let moment: f32 = samples
        .iter()
        .enumerate()
        .map(|(i, s)| (offset + i) as f32 * s.norm_sqr())
        .sum();
    Some(moment / energy)
}

impl PreambleDetector {
    /// `template` is the preamble as received, at the sample rate; `lead`
    /// is how many samples of the transmitted waveform precede it
    pub fn new(template: Vec<Sample>, lead: usize, threshold: f32) -> SyncResult<Self> {
        if template.len() < 2 {
            return Err(SyncError::Config(format!(
                "detector template needs at least 2 samples, got {}",
                template.len()
            )));
        }
        let half = template.len() / 2;
        let energy: f32 = template.iter().map(|s| s.norm_sqr()).sum();
        let centroid = energy_centroid(&template, 0)
            .ok_or_else(|| SyncError::Config("detector template has zero energy".to_string()))?;
        let half_separation = match (
            energy_centroid(&template[..half], 0),
            energy_centroid(&template[half..], half),
        ) {
            (Some(c1), Some(c2)) => c2 - c1,
            // no frequency estimate possible from a one-sided template
            _ => 0.0,
        };
        // one sample ahead of the waveform, the hold period after the peak
        let window = SampleBuffer::new(1 + lead + 2 * template.len());

        Ok(Self {
            template,
            half,
            energy,
            lead,
            centroid,
            half_separation,
            threshold,
            window,
            state: DetectorState::Seeking,
            previous: 0.0,
        })
    }

    pub fn template_len(&self) -> usize {
        self.template.len()
    }

    /// Samples between the end of the peak window and the confirming sample
    pub fn confirmation_delay(&self) -> usize {
        self.template.len()
    }

    /// Largest carrier offset (rad/sample) the frequency estimate resolves
    pub fn capture_range(&self) -> f32 {
        if self.half_separation > 0.0 {
            CAPTURE_FRACTION * PI / self.half_separation
        } else {
            0.0
        }
    }

    /// Correlate the latest template-length window
    fn correlate(&self) -> (Correlation, f32) {
        let mut first_half = Sample::new(0.0, 0.0);
        let mut second_half = Sample::new(0.0, 0.0);
        let mut window_energy = 0.0f32;
        for (i, (x, t)) in self
            .window
            .latest(self.template.len())
            .zip(&self.template)
            .enumerate()
        {
            let product = x * t.conj();
            if i < self.half {
                first_half += product;
            } else {
                second_half += product;
            }
            window_energy += x.norm_sqr();
        }
        let rho = if window_energy > 0.0 {
            (first_half.norm() + second_half.norm()) / (self.energy * window_energy).sqrt()
        } else {
            0.0
        };
        (
            Correlation {
                first_half,
                second_half,
            },
            rho,
        )
    }

    /// Push one sample; returns a detection once a peak is confirmed
    pub fn push(&mut self, x: Sample) -> Option<Detection> {
        self.window.push(x);
        if self.window.len() < self.template.len() {
            return None;
        }

        let (correlation, rho) = self.correlate();
        let hold = self.confirmation_delay();
        let mut detection = None;

        self.state = match self.state {
            DetectorState::Seeking if rho > self.threshold => DetectorState::Holding {
                before: self.previous,
                peak: rho,
                after: None,
                correlation,
                elapsed: 0,
            },
            DetectorState::Seeking => DetectorState::Seeking,
            DetectorState::Holding { peak, .. } if rho > peak => DetectorState::Holding {
                before: self.previous,
                peak: rho,
                after: None,
                correlation,
                elapsed: 0,
            },
            DetectorState::Holding {
                before,
                peak,
                after,
                correlation: at_peak,
                elapsed,
            } => {
                let after = after.unwrap_or(rho);
                if elapsed + 1 >= hold {
                    detection = Some(self.confirm(before, peak, after, &at_peak));
                    DetectorState::Seeking
                } else {
                    DetectorState::Holding {
                        before,
                        peak,
                        after: Some(after),
                        correlation: at_peak,
                        elapsed: elapsed + 1,
                    }
                }
            }
        };
        self.previous = rho;

        if detection.is_some() {
            self.reset();
        }
        detection
    }

    fn confirm(&self, before: f32, peak: f32, after: f32, c: &Correlation) -> Detection {
        // quadratic interpolation of the correlation magnitude
        let denom = before - 2.0 * peak + after;
        let tau = if denom != 0.0 {
            (0.5 * (before - after) / denom).clamp(-0.5, 0.5)
        } else {
            0.0
        };

        let dphi = if self.half_separation > 0.0 {
            (c.second_half * c.first_half.conj()).arg() / self.half_separation
        } else {
            0.0
        };
        // phase referenced to the first sample of the transmitted waveform
        let full = c.first_half + c.second_half;
        let phi = full.arg() - dphi * (self.centroid + self.lead as f32);
        // halves added in magnitude so a frequency offset does not bias the gain low
        let gamma = (c.first_half.norm() + c.second_half.norm()) / self.energy;

        let stats = DetectionStatistics {
            tau,
            dphi,
            phi,
            gamma,
        };
        log::debug!(
            "preamble detected: rho={peak:.3}, tau={tau:.4}, dphi={dphi:.6}, phi={phi:.4}, gamma={gamma:.4}"
        );

        let capacity = self.window.capacity();
        let mut buffer = Vec::with_capacity(capacity);
        buffer.resize(capacity - self.window.len(), Sample::new(0.0, 0.0));
        buffer.extend(self.window.iter().copied());

        Detection { stats, buffer }
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.state = DetectorState::Seeking;
        self.previous = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::adapters::design_rrc;
    use crate::modem::sequence::msequence;

    /// Preamble waveform for `symbols` m-sequence symbols at 2 samples/symbol
    fn shaped_template(symbols: usize) -> Vec<Sample> {
        shaped_preamble(&msequence(symbols), &design_rrc(2, 7, 0.25), 2, 7)
    }

    fn zeros(n: usize) -> impl Iterator<Item = Sample> {
        std::iter::repeat(Sample::new(0.0, 0.0)).take(n)
    }

    /// Push `stream` rotated by `gamma * exp(j(phi + dphi (n - origin)))`
    fn detect_rotated(
        detector: &mut PreambleDetector,
        stream: &[Sample],
        origin: usize,
        (gamma, phi, dphi): (f32, f32, f32),
    ) -> Option<(usize, Detection)> {
        stream.iter().enumerate().find_map(|(n, x)| {
            let rotation = Sample::from_polar(gamma, phi + dphi * (n as f32 - origin as f32));
            detector.push(x * rotation).map(|d| (n, d))
        })
    }

    fn phase_error(a: f32, b: f32) -> f32 {
        (Sample::from_polar(1.0, a - b) - Sample::new(1.0, 0.0)).norm()
    }

    #[test]
    fn test_shaped_preamble_peaks_on_symbols() {
        let reference = msequence(16);
        let template = shaped_preamble(&reference, &design_rrc(2, 7, 0.25), 2, 7);
        assert_eq!(template.len(), 32);
        for (i, symbol) in reference.iter().enumerate() {
            assert_eq!(template[2 * i].re.signum(), symbol.re.signum(), "symbol {i}");
        }
    }

    #[test]
    fn test_detects_template_with_offsets() {
        let template = shaped_template(32);
        let mut detector = PreambleDetector::new(template.clone(), 0, 0.5).unwrap();
        let (gamma, phi, dphi) = (0.4f32, 1.1f32, 0.01f32);

        let stream: Vec<Sample> = zeros(20).chain(template.iter().copied()).chain(zeros(80)).collect();
        let (n, d) = detect_rotated(&mut detector, &stream, 20, (gamma, phi, dphi))
            .expect("preamble should be detected");

        // peak at the last template sample, confirmed one template later
        assert_eq!(n, 20 + 63 + 64);
        assert!(d.stats.tau.abs() < 0.05, "tau {}", d.stats.tau);
        assert!((d.stats.dphi - dphi).abs() < 1e-3, "dphi {}", d.stats.dphi);
        assert!(phase_error(d.stats.phi, phi) < 1e-2, "phi {}", d.stats.phi);
        assert!((d.stats.gamma - gamma).abs() < 0.02, "gamma {}", d.stats.gamma);
        assert_eq!(d.buffer.len(), 1 + 2 * 64);
        // buffer[1] is the first preamble sample
        let expected = template[0] * Sample::from_polar(gamma, phi);
        assert!((d.buffer[1] - expected).norm() < 1e-4);
    }

    #[test]
    fn test_sidelobes_ahead_of_the_peak_are_passed_over() {
        // 7 symbols at k=2: sidelobes cross the threshold before the peak
        let (k, m) = (2, 7);
        let taps = design_rrc(k, m, 0.25);
        let reference = msequence(7);
        let data = (0..40).map(|i| Sample::new(if (i * 5) % 7 < 3 { 1.0 } else { -1.0 }, 0.0));

        let mut interp = Interpolator::new(&taps, k);
        let mut stream: Vec<Sample> = zeros(30).collect();
        for symbol in reference.iter().copied().chain(data).chain(zeros(m)) {
            interp.execute(symbol, &mut stream);
        }

        let template = shaped_preamble(&reference, &taps, k, m);
        let mut detector = PreambleDetector::new(template, k * m, 0.5).unwrap();
        let (n, d) = detect_rotated(&mut detector, &stream, 0, (1.0, 0.0, 0.0))
            .expect("preamble should be detected");

        assert_eq!(n, 30 + k * m + 14 - 1 + detector.confirmation_delay());
        assert!(d.stats.tau.abs() < 0.1, "tau {}", d.stats.tau);
        assert!((d.stats.gamma - 1.0).abs() < 0.05, "gamma {}", d.stats.gamma);
        // the ramp ahead of the template is part of the buffer
        assert_eq!(d.buffer[1], stream[30]);
    }

    #[test]
    fn test_capture_range_of_default_preamble() {
        let detector = PreambleDetector::new(shaped_template(64), 14, 0.5).unwrap();
        let range = detector.capture_range();
        assert!(range > 0.04 && range < 0.045, "capture range {range}");
    }

    #[test]
    fn test_detects_at_edge_of_capture_range() {
        let template = shaped_template(32);
        let stream: Vec<Sample> = zeros(20).chain(template.iter().copied()).chain(zeros(80)).collect();
        for sign in [1.0f32, -1.0] {
            let mut detector = PreambleDetector::new(template.clone(), 0, 0.5).unwrap();
            let dphi = sign * 0.95 * detector.capture_range();
            let (_, d) = detect_rotated(&mut detector, &stream, 20, (0.4, 1.1, dphi))
                .unwrap_or_else(|| panic!("not detected at dphi {dphi}"));
            assert!((d.stats.dphi - dphi).abs() < 1e-3, "dphi {} vs {dphi}", d.stats.dphi);
            assert!(phase_error(d.stats.phi, 1.1) < 0.05, "phi {}", d.stats.phi);
        }
    }

    #[test]
    fn test_silence_never_detects() {
        let mut detector = PreambleDetector::new(shaped_template(16), 0, 0.5).unwrap();
        for _ in 0..1000 {
            assert!(detector.push(Sample::new(0.0, 0.0)).is_none());
        }
    }

    #[test]
    fn test_partial_template_is_not_detected() {
        let template = shaped_template(32);
        let mut detector = PreambleDetector::new(template.clone(), 0, 0.5).unwrap();
        for x in &template[..40] {
            assert!(detector.push(*x).is_none());
        }
    }

    #[test]
    fn test_short_buffer_is_zero_padded_at_front() {
        let template = shaped_template(8);
        let mut detector = PreambleDetector::new(template.clone(), 0, 0.5).unwrap();
        let mut detection = None;
        for x in template.iter().copied().chain(zeros(16)) {
            if let Some(d) = detector.push(x) {
                detection = Some(d);
            }
        }
        let d = detection.expect("detected at stream start");
        assert_eq!(d.buffer.len(), 33);
        assert_eq!(d.buffer[0], Sample::new(0.0, 0.0));
        assert_eq!(d.buffer[1], template[0]);
    }

    #[test]
    fn test_rejects_degenerate_templates() {
        assert!(PreambleDetector::new(vec![Sample::new(1.0, 0.0)], 0, 0.5).is_err());
        assert!(PreambleDetector::new(vec![Sample::new(0.0, 0.0); 8], 0, 0.5).is_err());
    }
}
