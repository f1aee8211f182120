//! Core domain types

use std::fmt;

use num_complex::Complex;
use serde::{Deserialize, Serialize};

/// Complex baseband sample (32-bit float I/Q)
pub type Sample = Complex<f32>;

/// Maximum number of payload symbols copied into [`FrameSyncStats`]
pub const MAX_FRAME_SYMBOLS: usize = 256;

/// Linear modulation schemes understood by the header protocol
///
/// Identifiers are carried in a single header byte; 0 is reserved as
/// "unknown" and never decodes to a scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModulationScheme {
    Bpsk,
    Qpsk,
    Psk8,
    Qam16,
}

impl ModulationScheme {
    pub const ALL: [ModulationScheme; 4] = [Self::Bpsk, Self::Qpsk, Self::Psk8, Self::Qam16];

    /// Header identifier
    pub fn id(self) -> u8 {
        match self {
            Self::Bpsk => 1,
            Self::Qpsk => 2,
            Self::Psk8 => 3,
            Self::Qam16 => 4,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    pub fn bits_per_symbol(self) -> u32 {
        match self {
            Self::Bpsk => 1,
            Self::Qpsk => 2,
            Self::Psk8 => 3,
            Self::Qam16 => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bpsk => "BPSK",
            Self::Qpsk => "QPSK",
            Self::Psk8 => "8-PSK",
            Self::Qam16 => "16-QAM",
        }
    }
}

impl fmt::Display for ModulationScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Forward error correction schemes (5-bit header identifiers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FecScheme {
    None,
    Repeat3,
    Hamming84,
}

impl FecScheme {
    pub const ALL: [FecScheme; 3] = [Self::None, Self::Repeat3, Self::Hamming84];

    pub fn id(self) -> u8 {
        match self {
            Self::None => 1,
            Self::Repeat3 => 2,
            Self::Hamming84 => 3,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    /// Encoded length in bytes of an `n`-byte message
    pub fn encoded_len(self, n: usize) -> usize {
        match self {
            Self::None => n,
            Self::Repeat3 => 3 * n,
            Self::Hamming84 => 2 * n,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Repeat3 => "repeat(3)",
            Self::Hamming84 => "Hamming(8,4)",
        }
    }
}

impl fmt::Display for FecScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Data integrity checks (3-bit header identifiers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrcScheme {
    None,
    Checksum,
    Crc8,
    Crc16,
    Crc32,
}

impl CrcScheme {
    pub const ALL: [CrcScheme; 5] = [
        Self::None,
        Self::Checksum,
        Self::Crc8,
        Self::Crc16,
        Self::Crc32,
    ];

    pub fn id(self) -> u8 {
        match self {
            Self::None => 1,
            Self::Checksum => 2,
            Self::Crc8 => 3,
            Self::Crc16 => 4,
            Self::Crc32 => 5,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    /// Length in bytes of the tag appended to a message
    pub fn tag_len(self) -> usize {
        match self {
            Self::None => 0,
            Self::Checksum | Self::Crc8 => 1,
            Self::Crc16 => 2,
            Self::Crc32 => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Checksum => "checksum",
            Self::Crc8 => "CRC-8",
            Self::Crc16 => "CRC-16",
            Self::Crc32 => "CRC-32",
        }
    }
}

impl fmt::Display for CrcScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Interpolating filter prototypes available for timing recovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterType {
    RootRaisedCosine,
}

/// Coarse estimates produced by the preamble detector at the moment of detection
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionStatistics {
    /// Fractional timing offset in samples, within [-0.5, 0.5]
    pub tau: f32,
    /// Carrier frequency offset in radians/sample
    pub dphi: f32,
    /// Carrier phase at the first preamble sample, in radians
    pub phi: f32,
    /// Channel gain magnitude
    pub gamma: f32,
}

/// Per-frame statistics handed to the frame callback
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameSyncStats {
    pub detection: DetectionStatistics,
    /// Mean squared decision error of the equalized symbols, in dB
    pub evm_db: f32,
    /// Signal-to-noise estimate derived from the EVM, in dB
    pub snr_db: f32,
    /// Received signal strength relative to unit gain, in dB
    pub rssi_db: f32,
    /// Total carrier frequency offset (coarse + fine), radians/sample
    pub cfo: f32,
    /// Equalized payload symbols (first [`MAX_FRAME_SYMBOLS`] at most)
    pub frame_symbols: Vec<Sample>,
    pub modulation: Option<ModulationScheme>,
    pub bits_per_symbol: u32,
    pub check: Option<CrcScheme>,
    pub fec_inner: Option<FecScheme>,
    pub fec_outer: Option<FecScheme>,
}

fn or_unknown<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

impl fmt::Display for FrameSyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "    EVM                 : {:>10.2} dB", self.evm_db)?;
        writeln!(f, "    SNR estimate        : {:>10.2} dB", self.snr_db)?;
        writeln!(f, "    RSSI                : {:>10.2} dB", self.rssi_db)?;
        writeln!(f, "    carrier offset      : {:>10.6} rad/sample", self.cfo)?;
        writeln!(f, "    timing offset       : {:>10.4} samples", self.detection.tau)?;
        writeln!(f, "    phase offset        : {:>10.4} rad", self.detection.phi)?;
        writeln!(
            f,
            "    modulation          : {} ({} bits/symbol)",
            or_unknown(self.modulation),
            self.bits_per_symbol
        )?;
        writeln!(f, "    validity check      : {}", or_unknown(self.check))?;
        writeln!(f, "    fec (inner)         : {}", or_unknown(self.fec_inner))?;
        write!(f, "    fec (outer)         : {}", or_unknown(self.fec_outer))
    }
}

/// Counters accumulated across every frame attempt since the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameDataStats {
    pub frames_detected: u64,
    pub headers_valid: u64,
    pub payloads_valid: u64,
    pub bytes_received: u64,
}

impl fmt::Display for FrameDataStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frames detected: {}, headers valid: {}, payloads valid: {}, bytes received: {}",
            self.frames_detected, self.headers_valid, self.payloads_valid, self.bytes_received
        )
    }
}

/// Everything the synchronizer knows about one completed or aborted frame
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedFrame {
    /// User-defined header bytes
    pub header: Vec<u8>,
    pub header_valid: bool,
    /// Decoded payload; empty when the header was invalid
    pub payload: Vec<u8>,
    pub payload_valid: bool,
    pub stats: FrameSyncStats,
}
