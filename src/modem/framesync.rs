//! Frame synchronizer
//!
//! Push-driven receiver state machine:
//!
//! ```text
//! Detect --(preamble)--> RxHeader --(valid header)--> RxPayload
//!    ^                      |                             |
//!    +----(invalid header)--+------(payload decoded)------+
//! ```
//!
//! While a frame is open every raw sample goes through the carrier mixer and
//! the timing-recovery matched filter. The first symbols out are the
//! preamble, used to refine the carrier estimate and train the equalizer;
//! header and payload symbols are then equalized with decision feedback,
//! demodulated and decoded. Every frame attempt ends in exactly one call to
//! the [`FrameHandler`].

use std::collections::VecDeque;
use std::fmt;

use super::demodulator::SymbolDemodulator;
use super::header::{FrameHeader, PayloadProperties};
use super::packetizer::IntegrityDecoder;
use super::scramble::unscramble;
use super::sequence::reference_symbols;
use crate::adapters::RootNyquistDesigner;
use crate::domain::{
    DetectionStatistics, FrameDataStats, FrameSyncStats, ReceivedFrame, Sample, SyncConfig,
    SyncError, SyncResult, MAX_FRAME_SYMBOLS,
};
use crate::dsp::{
    shaped_preamble, CarrierTracker, DecisionSource, Detection, Equalized, Equalizer,
    PreambleDetector, SampleBuffer, TimingRecovery,
};
use crate::ports::{FilterDesign, FrameHandler};

/// Which stage of a frame the synchronizer is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStateKind {
    Detect,
    RxHeader,
    RxPayload,
}

impl fmt::Display for SyncStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Detect => "detect",
            Self::RxHeader => "rx header",
            Self::RxPayload => "rx payload",
        };
        f.write_str(name)
    }
}

/// Per-frame measurements shared by the header and payload stages
#[derive(Debug, Clone, Copy)]
struct FrameContext {
    detection: DetectionStatistics,
    error_energy: f32,
    error_count: usize,
}

impl FrameContext {
    fn new(detection: DetectionStatistics) -> Self {
        Self {
            detection,
            error_energy: 0.0,
            error_count: 0,
        }
    }

    fn record(&mut self, eq: &Equalized) {
        self.error_energy += eq.error_power();
        self.error_count += 1;
    }

    fn evm_db(&self) -> f32 {
        if self.error_count == 0 {
            return 0.0;
        }
        let mse = self.error_energy / self.error_count as f32;
        10.0 * mse.max(1e-12).log10()
    }
}

struct HeaderReception {
    frame: FrameContext,
    /// Preamble symbols collected before refinement
    preamble: Vec<Sample>,
    demod: SymbolDemodulator,
}

struct PayloadReception {
    frame: FrameContext,
    header: FrameHeader,
    decoder: IntegrityDecoder,
    demod: SymbolDemodulator,
    symbols: Vec<Sample>,
}

enum SyncState {
    Detect,
    RxHeader(HeaderReception),
    RxPayload(PayloadReception),
}

/// Receiver frame synchronizer delivering frames to a [`FrameHandler`]
pub struct FrameSync<H: FrameHandler> {
    config: SyncConfig,
    handler: H,
    reference: Vec<Sample>,
    detector: PreambleDetector,
    carrier: CarrierTracker,
    timing: TimingRecovery,
    equalizer: Equalizer,
    header_decoder: IntegrityDecoder,
    state: SyncState,
    /// Raw samples still inside the matched filter's delay line
    history: SampleBuffer,
    /// Samples waiting to be (re)examined, oldest first
    pending: VecDeque<Sample>,
    data_stats: FrameDataStats,
}

impl<H: FrameHandler> FrameSync<H> {
    /// Build a synchronizer with the root-Nyquist filter designer
    pub fn new(config: SyncConfig, handler: H) -> SyncResult<Self> {
        Self::with_filter_design(config, handler, &RootNyquistDesigner)
    }

    pub fn with_filter_design(
        config: SyncConfig,
        handler: H,
        designer: &dyn FilterDesign,
    ) -> SyncResult<Self> {
        config.validate()?;
        let k = config.samples_per_symbol;
        let m = config.interp_filter_semi_length;

        let reference = reference_symbols(&config.reference_sequence);
        let taps = designer.design(config.interp_filter_type, k, m, config.excess_bandwidth)?;

        // expected preamble waveform, past the interpolator's k*m ramp
        let template = shaped_preamble(&reference, &taps, k, m);
        let detector = PreambleDetector::new(template, k * m, config.detection_threshold).map_err(
            |e| SyncError::Config(format!("reference sequence unusable for detection: {e}")),
        )?;

        let timing = TimingRecovery::new(
            designer,
            config.interp_filter_type,
            k,
            m,
            config.excess_bandwidth,
            config.filter_bank_size,
        )?;

        let header_decoder = IntegrityDecoder::new(
            config.header_decoded_len(),
            config.header_crc_scheme,
            config.header_fec_inner,
            config.header_fec_outer,
        );

        let history_len = 2 * k * m + 1;
        log::debug!(
            "frame sync ready: {} preamble symbols, {} header symbols, k={k}, m={m}",
            reference.len(),
            config.header_symbol_count()
        );

        Ok(Self {
            carrier: CarrierTracker::new(k),
            equalizer: Equalizer::new(config.equalizer_length, config.equalizer_step_size),
            reference,
            detector,
            timing,
            header_decoder,
            state: SyncState::Detect,
            history: SampleBuffer::new(history_len),
            pending: VecDeque::with_capacity(history_len + 1),
            data_stats: FrameDataStats::default(),
            config,
            handler,
        })
    }

    /// Push one sample
    pub fn push(&mut self, x: Sample) {
        self.pending.push_back(x);
        while let Some(sample) = self.pending.pop_front() {
            self.feed(sample);
        }
    }

    /// Push a block of samples in stream order
    pub fn push_block(&mut self, samples: &[Sample]) {
        for &x in samples {
            self.push(x);
        }
    }

    /// Abandon any frame in progress and return to detection
    ///
    /// Also clears the cumulative [`FrameDataStats`], leaving the
    /// synchronizer indistinguishable from a freshly built one.
    pub fn reset(&mut self) {
        self.reset_frame();
        self.pending.clear();
        self.data_stats = FrameDataStats::default();
    }

    pub fn state(&self) -> SyncStateKind {
        match self.state {
            SyncState::Detect => SyncStateKind::Detect,
            SyncState::RxHeader(_) => SyncStateKind::RxHeader,
            SyncState::RxPayload(_) => SyncStateKind::RxPayload,
        }
    }

    pub fn is_frame_open(&self) -> bool {
        !matches!(self.state, SyncState::Detect)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Largest carrier offset (rad/sample) the detector resolves
    pub fn capture_range(&self) -> f32 {
        self.detector.capture_range()
    }

    pub fn data_stats(&self) -> FrameDataStats {
        self.data_stats
    }

    pub fn reset_data_stats(&mut self) {
        self.data_stats = FrameDataStats::default();
    }

    fn feed(&mut self, x: Sample) {
        if self.is_frame_open() {
            self.feed_frame(x);
        } else if let Some(detection) = self.detector.push(x) {
            self.begin_frame(detection);
        }
    }

    fn feed_frame(&mut self, x: Sample) {
        self.history.push(x);
        let y = self.carrier.mix(x);
        if let Some(symbol) = self.timing.execute(y) {
            self.process_symbol(symbol);
        }
    }

    fn begin_frame(&mut self, detection: Detection) {
        let Detection { stats, buffer } = detection;
        self.data_stats.frames_detected += 1;

        // buffer[0] sits one sample ahead of the preamble
        self.carrier.init(stats.dphi, stats.phi - stats.dphi, stats.gamma);
        self.timing.init(stats.tau);
        self.equalizer.reset();
        self.history.clear();

        self.state = SyncState::RxHeader(HeaderReception {
            frame: FrameContext::new(stats),
            preamble: Vec::with_capacity(self.reference.len()),
            demod: SymbolDemodulator::new(
                self.config.header_modulation,
                self.config.header_encoded_len(),
            ),
        });
        log::debug!("state: {} -> {}", SyncStateKind::Detect, SyncStateKind::RxHeader);

        for x in buffer {
            self.feed(x);
        }
    }

    fn process_symbol(&mut self, symbol: Sample) {
        self.state = match std::mem::replace(&mut self.state, SyncState::Detect) {
            SyncState::Detect => SyncState::Detect,
            SyncState::RxHeader(rx) => self.receive_header(rx, symbol),
            SyncState::RxPayload(rx) => self.receive_payload(rx, symbol),
        };
    }

    fn receive_header(&mut self, mut rx: HeaderReception, symbol: Sample) -> SyncState {
        if rx.preamble.len() < self.reference.len() {
            rx.preamble.push(symbol);
            if rx.preamble.len() == self.reference.len() {
                self.carrier.refine(&mut rx.preamble, &self.reference);
                let training = DecisionSource::TrainingSequence(&self.reference);
                for (i, &s) in rx.preamble.iter().enumerate() {
                    self.equalizer.step(s, &training, i);
                }
            }
            return SyncState::RxHeader(rx);
        }

        let y = self.carrier.mix_symbol(symbol);
        let index = rx.demod.received();
        let eq = self
            .equalizer
            .step(y, &DecisionSource::HardDecision(rx.demod.modem()), index);
        rx.frame.record(&eq);
        if rx.demod.push(eq.output) {
            self.decode_header(rx)
        } else {
            SyncState::RxHeader(rx)
        }
    }

    fn decode_header(&mut self, rx: HeaderReception) -> SyncState {
        let user_length = self.config.header_user_length;
        let mut encoded = rx.demod.bytes();
        unscramble(&mut encoded);
        let decoded = self.header_decoder.decode(&encoded);
        let user = decoded.bytes[..user_length].to_vec();

        if !decoded.valid {
            log::warn!("header rejected: integrity check failed");
            return self.abort_frame(rx.frame, user);
        }
        let header = match FrameHeader::parse(&decoded.bytes, user_length) {
            Ok(header) => header,
            Err(e) => {
                log::warn!("header rejected: {e}");
                return self.abort_frame(rx.frame, user);
            }
        };
        self.data_stats.headers_valid += 1;

        let props = header.properties;
        let decoder = IntegrityDecoder::new(
            header.payload_len as usize,
            props.check,
            props.fec_inner,
            props.fec_outer,
        );
        let demod = SymbolDemodulator::new(props.modulation, decoder.encoded_len());
        log::debug!(
            "header valid: {} payload bytes, {} over {} symbols; state: {} -> {}",
            header.payload_len,
            props.modulation,
            demod.num_symbols(),
            SyncStateKind::RxHeader,
            SyncStateKind::RxPayload
        );

        let rx = PayloadReception {
            frame: rx.frame,
            symbols: Vec::with_capacity(demod.num_symbols().min(MAX_FRAME_SYMBOLS)),
            header,
            decoder,
            demod,
        };
        if rx.demod.is_complete() {
            self.decode_payload(rx)
        } else {
            SyncState::RxPayload(rx)
        }
    }

    fn receive_payload(&mut self, mut rx: PayloadReception, symbol: Sample) -> SyncState {
        let y = self.carrier.mix_symbol(symbol);
        let index = rx.demod.received();
        let eq = self
            .equalizer
            .step(y, &DecisionSource::HardDecision(rx.demod.modem()), index);
        rx.frame.record(&eq);
        if rx.symbols.len() < MAX_FRAME_SYMBOLS {
            rx.symbols.push(eq.output);
        }
        if rx.demod.push(eq.output) {
            self.decode_payload(rx)
        } else {
            SyncState::RxPayload(rx)
        }
    }

    fn decode_payload(&mut self, rx: PayloadReception) -> SyncState {
        let mut encoded = rx.demod.bytes();
        unscramble(&mut encoded);
        let decoded = rx.decoder.decode(&encoded);

        self.data_stats.bytes_received += decoded.bytes.len() as u64;
        if decoded.valid {
            self.data_stats.payloads_valid += 1;
        }
        log::info!(
            "frame received: {} payload bytes, payload {}",
            decoded.bytes.len(),
            if decoded.valid { "valid" } else { "invalid" }
        );

        let stats = self.frame_stats(&rx.frame, Some(rx.header.properties), rx.symbols);
        self.finish_frame(ReceivedFrame {
            header: rx.header.user,
            header_valid: true,
            payload: decoded.bytes,
            payload_valid: decoded.valid,
            stats,
        })
    }

    fn abort_frame(&mut self, frame: FrameContext, user: Vec<u8>) -> SyncState {
        let stats = self.frame_stats(&frame, None, Vec::new());
        self.finish_frame(ReceivedFrame {
            header: user,
            header_valid: false,
            payload: Vec::new(),
            payload_valid: false,
            stats,
        })
    }

    fn frame_stats(
        &self,
        frame: &FrameContext,
        properties: Option<PayloadProperties>,
        frame_symbols: Vec<Sample>,
    ) -> FrameSyncStats {
        let evm_db = frame.evm_db();
        FrameSyncStats {
            detection: frame.detection,
            evm_db,
            snr_db: -evm_db,
            rssi_db: 20.0 * frame.detection.gamma.max(1e-12).log10(),
            cfo: self.carrier.frequency_offset(),
            frame_symbols,
            modulation: properties.map(|p| p.modulation),
            bits_per_symbol: properties.map_or(0, |p| p.modulation.bits_per_symbol()),
            check: properties.map(|p| p.check),
            fec_inner: properties.map(|p| p.fec_inner),
            fec_outer: properties.map(|p| p.fec_outer),
        }
    }

    /// Hand the frame over, reset, and queue the trailing samples for detection
    fn finish_frame(&mut self, frame: ReceivedFrame) -> SyncState {
        self.handler.on_frame(frame);

        let trailing = self.history.to_vec();
        self.reset_frame();
        for x in trailing.into_iter().rev() {
            self.pending.push_front(x);
        }
        log::debug!("state: -> {}", SyncStateKind::Detect);
        SyncState::Detect
    }

    fn reset_frame(&mut self) {
        self.state = SyncState::Detect;
        self.detector.reset();
        self.carrier.reset();
        self.timing.reset();
        self.equalizer.reset();
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CrcScheme, FecScheme, ModulationScheme, ReferenceSequence};
    use crate::modem::framegen::FrameGenerator;
    use crate::ports::FrameCollector;

    fn zeros(n: usize) -> Vec<Sample> {
        vec![Sample::new(0.0, 0.0); n]
    }

    fn uncoded() -> PayloadProperties {
        PayloadProperties {
            modulation: ModulationScheme::Qpsk,
            check: CrcScheme::Crc32,
            fec_inner: FecScheme::None,
            fec_outer: FecScheme::None,
        }
    }

    #[test]
    fn test_noiseless_frame_is_received() {
        let config = SyncConfig::default();
        let generator = FrameGenerator::new(&config, uncoded()).unwrap();
        let payload: Vec<u8> = (0..40).collect();
        let mut signal = zeros(100);
        signal.extend(generator.generate(b"user", &payload).unwrap());
        signal.extend(zeros(100));

        let mut sync = FrameSync::new(config, FrameCollector::new()).unwrap();
        sync.push_block(&signal);

        let frames = sync.handler_mut().take();
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert!(frame.header_valid);
        assert!(frame.payload_valid);
        assert_eq!(frame.payload, payload);
        assert_eq!(&frame.header[..4], b"user");
        assert_eq!(frame.stats.modulation, Some(ModulationScheme::Qpsk));
        assert_eq!(frame.stats.bits_per_symbol, 2);
        assert!(frame.stats.evm_db < -20.0, "evm {}", frame.stats.evm_db);
        assert_eq!(sync.state(), SyncStateKind::Detect);

        let stats = sync.data_stats();
        assert_eq!(stats.frames_detected, 1);
        assert_eq!(stats.headers_valid, 1);
        assert_eq!(stats.payloads_valid, 1);
        assert_eq!(stats.bytes_received, 40);
    }

    #[test]
    fn test_state_advances_through_frame() {
        let config = SyncConfig::default();
        let generator = FrameGenerator::new(&config, uncoded()).unwrap();
        let mut signal = zeros(20);
        signal.extend(generator.generate(&[], &[0x55; 64]).unwrap());

        let mut sync = FrameSync::new(config, FrameCollector::new()).unwrap();
        let mut seen = vec![sync.state()];
        for x in signal {
            sync.push(x);
            if seen.last() != Some(&sync.state()) {
                seen.push(sync.state());
            }
        }
        assert_eq!(
            seen,
            vec![
                SyncStateKind::Detect,
                SyncStateKind::RxHeader,
                SyncStateKind::RxPayload,
                SyncStateKind::Detect
            ]
        );
    }

    #[test]
    fn test_closure_handler() {
        let config = SyncConfig::default();
        let generator = FrameGenerator::new(&config, uncoded()).unwrap();
        let signal = generator.generate(&[], b"closure").unwrap();

        let mut count = 0;
        {
            let mut sync = FrameSync::new(config, |frame: ReceivedFrame| {
                assert!(frame.payload_valid);
                count += 1;
            })
            .unwrap();
            sync.push_block(&zeros(10));
            sync.push_block(&signal);
        }
        assert_eq!(count, 1);
    }

    #[test]
    fn test_reset_mid_frame_returns_to_detect() {
        let config = SyncConfig::default();
        let generator = FrameGenerator::new(&config, uncoded()).unwrap();
        let signal = generator.generate(&[], &[1; 16]).unwrap();

        let mut sync = FrameSync::new(config, FrameCollector::new()).unwrap();
        sync.push_block(&zeros(10));
        sync.push_block(&signal[..400]);
        assert!(sync.is_frame_open());
        sync.reset();
        assert_eq!(sync.state(), SyncStateKind::Detect);
        assert_eq!(sync.data_stats(), FrameDataStats::default());

        sync.push_block(&signal[400..]);
        assert!(sync.handler().is_empty());
    }

    #[test]
    fn test_custom_reference_sequence() {
        // Zadoff-Chu style chirp
        let symbols: Vec<Sample> = (0..48)
            .map(|i| Sample::from_polar(1.0, std::f32::consts::PI * (i * i) as f32 / 48.0))
            .collect();
        let config = SyncConfig {
            reference_sequence: ReferenceSequence::Custom { symbols },
            ..SyncConfig::default()
        };
        let generator = FrameGenerator::new(&config, uncoded()).unwrap();
        let mut signal = zeros(30);
        signal.extend(generator.generate(b"c", b"custom preamble").unwrap());

        let mut sync = FrameSync::new(config, FrameCollector::new()).unwrap();
        sync.push_block(&signal);
        let frames = sync.into_handler().take();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, b"custom preamble");
    }

    #[test]
    fn test_short_reference_sequences() {
        for length in [7, 9, 15] {
            let config = SyncConfig {
                reference_sequence: ReferenceSequence::MSequence { length },
                ..SyncConfig::default()
            };
            let generator = FrameGenerator::new(&config, uncoded()).unwrap();
            let payload: Vec<u8> = (0..24).map(|i| i * 7).collect();
            let mut signal = zeros(40);
            signal.extend(generator.generate(b"short", &payload).unwrap());
            signal.extend(zeros(400));

            let mut sync = FrameSync::new(config, FrameCollector::new()).unwrap();
            sync.push_block(&signal);
            assert_eq!(sync.state(), SyncStateKind::Detect, "length {length}");
            let frames = sync.into_handler().take();
            assert_eq!(frames.len(), 1, "length {length}");
            assert!(frames[0].header_valid, "length {length}");
            assert!(frames[0].payload_valid, "length {length}");
            assert_eq!(frames[0].payload, payload);
        }
    }

    #[test]
    fn test_capture_range_is_exposed() {
        let sync = FrameSync::new(SyncConfig::default(), FrameCollector::new()).unwrap();
        let range = sync.capture_range();
        assert!(range > 0.04 && range < 0.045, "capture range {range}");
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = SyncConfig {
            reference_sequence: ReferenceSequence::Custom { symbols: vec![] },
            ..SyncConfig::default()
        };
        assert!(matches!(
            FrameSync::new(config, FrameCollector::new()),
            Err(SyncError::Config(_))
        ));
    }
}
