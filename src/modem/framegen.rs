//! Frame generator (transmitter side)
//!
//! Produces the sample stream a [`FrameSync`](super::framesync::FrameSync)
//! built from the same [`SyncConfig`] expects:
//!
//! ```text
//! preamble | header symbols | payload symbols | 2m zero symbols
//! ```
//!
//! pulse-shaped with the configured root-Nyquist filter at `k`
//! samples/symbol.

use super::demodulator::pack_symbols;
use super::header::{FrameHeader, PayloadProperties};
use super::packetizer::IntegrityDecoder;
use super::scramble::scramble;
use super::sequence::reference_symbols;
use crate::adapters::{LinearModem, RootNyquistDesigner};
use crate::domain::{Sample, SyncConfig, SyncError, SyncResult};
use crate::dsp::Interpolator;
use crate::ports::{FilterDesign, Modem};

/// Header and payload after integrity tagging and FEC, before scrambling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledFrame {
    pub header: FrameHeader,
    pub encoded_header: Vec<u8>,
    pub encoded_payload: Vec<u8>,
}

impl AssembledFrame {
    /// Invert one bit of the encoded payload (bit 0 is the MSB of byte 0)
    pub fn flip_payload_bit(&mut self, bit: usize) {
        if let Some(byte) = self.encoded_payload.get_mut(bit / 8) {
            *byte ^= 0x80 >> (bit % 8);
        }
    }
}

/// Builds test-vector frames matching a synchronizer configuration
pub struct FrameGenerator {
    config: SyncConfig,
    properties: PayloadProperties,
    preamble: Vec<Sample>,
    taps: Vec<f32>,
    header_encoder: IntegrityDecoder,
    header_modem: LinearModem,
    payload_modem: LinearModem,
}

impl FrameGenerator {
    pub fn new(config: &SyncConfig, properties: PayloadProperties) -> SyncResult<Self> {
        Self::with_filter_design(config, properties, &RootNyquistDesigner)
    }

    pub fn with_filter_design(
        config: &SyncConfig,
        properties: PayloadProperties,
        designer: &dyn FilterDesign,
    ) -> SyncResult<Self> {
        config.validate()?;
        let taps = designer.design(
            config.interp_filter_type,
            config.samples_per_symbol,
            config.interp_filter_semi_length,
            config.excess_bandwidth,
        )?;
        Ok(Self {
            config: config.clone(),
            properties,
            preamble: reference_symbols(&config.reference_sequence),
            taps,
            header_encoder: IntegrityDecoder::new(
                config.header_decoded_len(),
                config.header_crc_scheme,
                config.header_fec_inner,
                config.header_fec_outer,
            ),
            header_modem: LinearModem::new(config.header_modulation),
            payload_modem: LinearModem::new(properties.modulation),
        })
    }

    pub fn properties(&self) -> PayloadProperties {
        self.properties
    }

    /// Tag and encode a header and payload
    pub fn assemble(&self, user: &[u8], payload: &[u8]) -> SyncResult<AssembledFrame> {
        let payload_len = u16::try_from(payload.len()).map_err(|_| {
            SyncError::Header(format!("payload of {} bytes does not fit the length field", payload.len()))
        })?;
        let header = FrameHeader {
            user: user.to_vec(),
            payload_len,
            properties: self.properties,
        };
        let header_bytes = header.encode(self.config.header_user_length)?;

        let payload_encoder = IntegrityDecoder::new(
            payload.len(),
            self.properties.check,
            self.properties.fec_inner,
            self.properties.fec_outer,
        );

        Ok(AssembledFrame {
            encoded_header: self.header_encoder.encode(&header_bytes),
            encoded_payload: payload_encoder.encode(payload),
            header,
        })
    }

    /// Frame symbols: preamble, header, payload and the filter flush tail
    pub fn symbols(&self, frame: &AssembledFrame) -> Vec<Sample> {
        let mut symbols = self.preamble.clone();
        symbols.extend(modulate_bytes(&self.header_modem, &frame.encoded_header));
        symbols.extend(modulate_bytes(&self.payload_modem, &frame.encoded_payload));
        let tail = 2 * self.config.interp_filter_semi_length;
        symbols.extend(std::iter::repeat(Sample::new(0.0, 0.0)).take(tail));
        symbols
    }

    /// Pulse-shaped samples for an assembled frame
    pub fn modulate(&self, frame: &AssembledFrame) -> Vec<Sample> {
        let symbols = self.symbols(frame);
        let mut interp = Interpolator::new(&self.taps, self.config.samples_per_symbol);
        let mut samples = Vec::with_capacity(symbols.len() * self.config.samples_per_symbol);
        for symbol in symbols {
            interp.execute(symbol, &mut samples);
        }
        samples
    }

    /// Assemble and modulate in one step
    pub fn generate(&self, user: &[u8], payload: &[u8]) -> SyncResult<Vec<Sample>> {
        let frame = self.assemble(user, payload)?;
        Ok(self.modulate(&frame))
    }
}

fn modulate_bytes(modem: &dyn Modem, encoded: &[u8]) -> Vec<Sample> {
    let mut bytes = encoded.to_vec();
    scramble(&mut bytes);
    pack_symbols(&bytes, modem.bits_per_symbol())
        .into_iter()
        .map(|s| modem.modulate(s))
        .collect()
}
