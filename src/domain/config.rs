//! Synchronizer configuration
//!
//! A `SyncConfig` fixes everything the receiver must agree on with the
//! transmitter: reference sequence, pulse shape, header protocol. It is
//! immutable once a synchronizer has been built from it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{SyncError, SyncResult};
use super::types::{CrcScheme, FecScheme, FilterType, ModulationScheme, Sample};

/// Number of protocol bytes following the user section of the header
pub const HEADER_PROTOCOL_BYTES: usize = 6;

/// Longest m-sequence preamble supported (degree-12 generator)
pub const MAX_MSEQUENCE_LENGTH: usize = 4096;

/// Known symbols the detector correlates against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ReferenceSequence {
    /// Antipodal maximal-length sequence of the given length
    MSequence { length: usize },
    /// Caller-supplied symbols
    Custom { symbols: Vec<Sample> },
}

impl ReferenceSequence {
    pub fn len(&self) -> usize {
        match self {
            Self::MSequence { length } => *length,
            Self::Custom { symbols } => symbols.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Construction-time configuration of a frame synchronizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Preamble symbols the detector correlates against
    ///
    /// Its length sets the carrier capture range: offsets up to about
    /// `0.85 * pi / (k * L / 2)` rad/sample are resolved, roughly 0.04 for
    /// the default 64 symbols at k = 2. Very short sequences detect
    /// reliably only on a clean channel.
    pub reference_sequence: ReferenceSequence,
    pub interp_filter_type: FilterType,
    /// Filter semi-length in symbols (m)
    pub interp_filter_semi_length: usize,
    /// Excess bandwidth factor (beta)
    pub excess_bandwidth: f32,
    /// Samples per symbol (k)
    pub samples_per_symbol: usize,
    /// Number of branches in the timing-recovery filter bank
    pub filter_bank_size: usize,
    /// Normalized correlation level that arms the detector
    pub detection_threshold: f32,
    pub equalizer_length: usize,
    pub equalizer_step_size: f32,
    /// User-defined bytes carried at the front of every header
    pub header_user_length: usize,
    pub header_modulation: ModulationScheme,
    pub header_fec_inner: FecScheme,
    pub header_fec_outer: FecScheme,
    pub header_crc_scheme: CrcScheme,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reference_sequence: ReferenceSequence::MSequence { length: 64 },
            interp_filter_type: FilterType::RootRaisedCosine,
            interp_filter_semi_length: 7,
            excess_bandwidth: 0.25,
            samples_per_symbol: 2,
            filter_bank_size: 32,
            detection_threshold: 0.5,
            equalizer_length: 7,
            equalizer_step_size: 0.05,
            header_user_length: 14,
            header_modulation: ModulationScheme::Bpsk,
            header_fec_inner: FecScheme::Hamming84,
            header_fec_outer: FecScheme::None,
            header_crc_scheme: CrcScheme::Crc32,
        }
    }
}

impl SyncConfig {
    /// Reject configurations no synchronizer can be built from
    pub fn validate(&self) -> SyncResult<()> {
        match &self.reference_sequence {
            ReferenceSequence::MSequence { length } => {
                if *length == 0 || *length > MAX_MSEQUENCE_LENGTH {
                    return Err(SyncError::Config(format!(
                        "m-sequence length must be in 1..={MAX_MSEQUENCE_LENGTH}, got {length}"
                    )));
                }
            }
            ReferenceSequence::Custom { symbols } => {
                if symbols.is_empty() {
                    return Err(SyncError::Config(
                        "reference sequence must contain at least one symbol".to_string(),
                    ));
                }
                if symbols.iter().all(|s| s.norm_sqr() == 0.0) {
                    return Err(SyncError::Config(
                        "reference sequence has zero energy".to_string(),
                    ));
                }
                if symbols.iter().any(|s| !s.re.is_finite() || !s.im.is_finite()) {
                    return Err(SyncError::Config(
                        "reference sequence contains non-finite symbols".to_string(),
                    ));
                }
            }
        }
        if self.samples_per_symbol < 2 {
            return Err(SyncError::Config(format!(
                "samples per symbol must be at least 2, got {}",
                self.samples_per_symbol
            )));
        }
        if self.interp_filter_semi_length == 0 {
            return Err(SyncError::Config(
                "interpolating filter semi-length must be at least 1".to_string(),
            ));
        }
        if !(self.excess_bandwidth > 0.0 && self.excess_bandwidth <= 1.0) {
            return Err(SyncError::Config(format!(
                "excess bandwidth must be in (0, 1], got {}",
                self.excess_bandwidth
            )));
        }
        if self.filter_bank_size == 0 {
            return Err(SyncError::Config(
                "filter bank must have at least one branch".to_string(),
            ));
        }
        if !(self.detection_threshold > 0.0 && self.detection_threshold < 1.0) {
            return Err(SyncError::Config(format!(
                "detection threshold must be in (0, 1), got {}",
                self.detection_threshold
            )));
        }
        if self.equalizer_length == 0 {
            return Err(SyncError::Config(
                "equalizer must have at least one tap".to_string(),
            ));
        }
        if !(self.equalizer_step_size > 0.0 && self.equalizer_step_size < 2.0) {
            return Err(SyncError::Config(format!(
                "equalizer step size must be in (0, 2), got {}",
                self.equalizer_step_size
            )));
        }
        Ok(())
    }

    /// Decoded header length: user bytes plus protocol bytes
    pub fn header_decoded_len(&self) -> usize {
        self.header_user_length + HEADER_PROTOCOL_BYTES
    }

    /// Header length after the integrity tag and both FEC stages
    pub fn header_encoded_len(&self) -> usize {
        let tagged = self.header_decoded_len() + self.header_crc_scheme.tag_len();
        self.header_fec_outer
            .encoded_len(self.header_fec_inner.encoded_len(tagged))
    }

    /// Number of encoded header bits carried over the air
    pub fn header_length_bits(&self) -> usize {
        8 * self.header_encoded_len()
    }

    /// Number of header symbols at the configured header modulation
    pub fn header_symbol_count(&self) -> usize {
        let bps = self.header_modulation.bits_per_symbol() as usize;
        self.header_length_bits().div_ceil(bps)
    }

    pub fn from_json(json: &str) -> SyncResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> SyncResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load and validate a configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        log::debug!("loaded synchronizer configuration from {}", path.display());
        Self::from_json(&json)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> SyncResult<()> {
        let json = self.to_json()?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
