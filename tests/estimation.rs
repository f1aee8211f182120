//! Integration tests: detector estimate accuracy under noise
//!
//! Timing and carrier estimates are checked at 20 dB SNR over several
//! noise seeds. Signal power is ~1 per sample, so the SNR is per sample.

mod common;

use common::{awgn, carrier_offset, fractional_delay, init_logger, pad};
use framesync_lib::adapters::design_rrc;
use framesync_lib::domain::{
    CrcScheme, FecScheme, ModulationScheme, Sample, SyncConfig,
};
use framesync_lib::dsp::{shaped_preamble, PreambleDetector};
use framesync_lib::modem::{msequence, FrameGenerator, FrameSync, PayloadProperties};
use framesync_lib::ports::FrameCollector;

const PAD: usize = 50;
const SNR_DB: f32 = 20.0;

fn generator(config: &SyncConfig) -> FrameGenerator {
    let props = PayloadProperties {
        modulation: ModulationScheme::Bpsk,
        check: CrcScheme::Crc32,
        fec_inner: FecScheme::Hamming84,
        fec_outer: FecScheme::None,
    };
    FrameGenerator::new(config, props).unwrap()
}

const K: usize = 2;
const M: usize = 7;

/// The shaped preamble the synchronizer correlates against
fn preamble_template() -> Vec<Sample> {
    shaped_preamble(&msequence(64), &design_rrc(K, M, 0.25), K, M)
}

fn preamble_detector() -> PreambleDetector {
    PreambleDetector::new(preamble_template(), K * M, 0.5).unwrap()
}

/// Run the detector alone; returns (sample index of detection, tau estimate)
fn detect(signal: &[Sample]) -> Option<(usize, f32)> {
    let mut detector = preamble_detector();
    signal
        .iter()
        .enumerate()
        .find_map(|(n, &x)| detector.push(x).map(|d| (n, d.stats.tau)))
}

#[test]
fn test_timing_offset_accuracy_at_20db() {
    init_logger();
    let config = SyncConfig::default();
    let generator = generator(&config);
    let detector = preamble_detector();
    // with no delay the peak sits on the last template sample, past the ramp
    let nominal = PAD + K * M + detector.template_len() - 1 + detector.confirmation_delay();

    let mut worst = 0.0f32;
    for seed in 0..6u64 {
        let tx = pad(&generator.generate(&[seed as u8], &[0x3c; 24]).unwrap(), PAD, PAD);
        for tau in [-0.5f32, -0.3, -0.1, 0.0, 0.2, 0.4, 0.5] {
            let rx = awgn(
                &carrier_offset(&fractional_delay(&tx, tau), 0.0, 0.3, 1.0),
                SNR_DB,
                seed * 31 + 1,
            );
            let (index, tau_hat) = detect(&rx).expect("preamble not detected");
            // whole-sample shifts of the peak are part of the estimate
            let estimated = (index as f32 - nominal as f32) + tau_hat;
            worst = worst.max((estimated - tau).abs());
            assert!(
                (estimated - tau).abs() < 0.1,
                "seed {seed}, tau {tau}: estimated {estimated} (index {index}, tau_hat {tau_hat})"
            );
        }
    }
    log::info!("worst timing error: {worst:.4} samples");
}

#[test]
fn test_carrier_offset_accuracy_at_20db() {
    init_logger();
    let config = SyncConfig::default();
    let generator = generator(&config);
    let payload = b"carrier offset".to_vec();

    for seed in 0..4u64 {
        let tx = pad(&generator.generate(&[], &payload).unwrap(), PAD, PAD);
        for dphi in [-0.02f32, -0.01, 0.005, 0.015] {
            let rx = awgn(&carrier_offset(&tx, dphi, -1.0, 1.5), SNR_DB, seed + 100);

            let mut sync = FrameSync::new(config.clone(), FrameCollector::new()).unwrap();
            sync.push_block(&rx);
            let frames = sync.into_handler().take();

            assert_eq!(frames.len(), 1, "seed {seed}, dphi {dphi}");
            let stats = &frames[0].stats;
            assert!(
                (stats.detection.dphi - dphi).abs() < 0.01,
                "seed {seed}: dphi {dphi} estimated {}",
                stats.detection.dphi
            );
            assert!((stats.cfo - dphi).abs() < 0.01);
            assert!(frames[0].payload_valid, "seed {seed}, dphi {dphi}");
            assert_eq!(frames[0].payload, payload);
            assert!(stats.snr_db > 10.0, "snr estimate {}", stats.snr_db);
        }
    }
}

#[test]
fn test_carrier_offset_at_edge_of_capture_range() {
    init_logger();
    let config = SyncConfig::default();
    let generator = generator(&config);
    let payload = b"edge of capture".to_vec();
    let range = FrameSync::new(config.clone(), FrameCollector::new())
        .unwrap()
        .capture_range();

    for seed in 0..3u64 {
        let tx = pad(&generator.generate(&[], &payload).unwrap(), PAD, PAD);
        for dphi in [-0.95 * range, 0.95 * range] {
            let rx = awgn(&carrier_offset(&tx, dphi, 0.7, 1.0), SNR_DB, seed + 200);

            let mut sync = FrameSync::new(config.clone(), FrameCollector::new()).unwrap();
            sync.push_block(&rx);
            let frames = sync.into_handler().take();

            assert_eq!(frames.len(), 1, "seed {seed}, dphi {dphi}");
            let estimated = frames[0].stats.detection.dphi;
            assert!(
                (estimated - dphi).abs() < 0.01,
                "seed {seed}: dphi {dphi} estimated {estimated}"
            );
            assert!(frames[0].payload_valid, "seed {seed}, dphi {dphi}");
            assert_eq!(frames[0].payload, payload);
        }
    }
}

#[test]
fn test_gain_estimate_tracks_amplitude() {
    init_logger();
    let config = SyncConfig::default();
    let tx = pad(&generator(&config).generate(&[], &[1, 2, 3]).unwrap(), PAD, PAD);

    for gain in [0.05f32, 0.5, 4.0] {
        let rx = carrier_offset(&tx, 0.0, 0.0, gain);
        let mut sync = FrameSync::new(config.clone(), FrameCollector::new()).unwrap();
        sync.push_block(&rx);
        let frames = sync.into_handler().take();
        assert_eq!(frames.len(), 1, "gain {gain}");
        let gamma = frames[0].stats.detection.gamma;
        assert!((gamma / gain - 1.0).abs() < 0.02, "gain {gain}: gamma {gamma}");
        assert!(frames[0].payload_valid);
    }
}
