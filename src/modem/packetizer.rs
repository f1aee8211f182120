//! Packet encoding and integrity decoding
//!
//! A packet is the message followed by its integrity tag, passed through the
//! inner and then the outer FEC code. Decoding undoes the outer code first.

use crate::adapters::{fec_codec, CrcCheck};
use crate::domain::{CrcScheme, FecScheme};
use crate::ports::{FecCodec, IntegrityCheck};

/// Result of decoding one packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPacket {
    /// Best-effort message bytes, returned even when the check fails
    pub bytes: Vec<u8>,
    /// Integrity tag matched
    pub valid: bool,
    /// An FEC stage reported errors it could not correct
    pub fec_uncorrectable: bool,
}

/// FEC + integrity check pipeline for a fixed message length
pub struct IntegrityDecoder {
    message_len: usize,
    check: Box<dyn IntegrityCheck>,
    inner: Box<dyn FecCodec>,
    outer: Box<dyn FecCodec>,
}

impl IntegrityDecoder {
    pub fn new(
        message_len: usize,
        check: CrcScheme,
        fec_inner: FecScheme,
        fec_outer: FecScheme,
    ) -> Self {
        Self::with_codecs(
            message_len,
            Box::new(CrcCheck::new(check)),
            fec_codec(fec_inner),
            fec_codec(fec_outer),
        )
    }

    /// Build from caller-supplied collaborators
    pub fn with_codecs(
        message_len: usize,
        check: Box<dyn IntegrityCheck>,
        inner: Box<dyn FecCodec>,
        outer: Box<dyn FecCodec>,
    ) -> Self {
        Self {
            message_len,
            check,
            inner,
            outer,
        }
    }

    pub fn message_len(&self) -> usize {
        self.message_len
    }

    fn tagged_len(&self) -> usize {
        self.message_len + self.check.tag_len()
    }

    fn inner_len(&self) -> usize {
        self.inner.encoded_len(self.tagged_len())
    }

    /// Length in bytes of an encoded packet
    pub fn encoded_len(&self) -> usize {
        self.outer.encoded_len(self.inner_len())
    }

    /// Encode a message; it is truncated or zero-padded to the message length
    pub fn encode(&self, message: &[u8]) -> Vec<u8> {
        let mut tagged = message[..message.len().min(self.message_len)].to_vec();
        tagged.resize(self.message_len, 0);
        let tag = self.check.generate(&tagged);
        tagged.extend_from_slice(&tag);

        let inner = self.inner.encode(&tagged);
        self.outer.encode(&inner)
    }

    pub fn decode(&self, encoded: &[u8]) -> DecodedPacket {
        let outer = self.outer.decode(encoded, self.inner_len());
        let mut inner = self.inner.decode(&outer.bytes, self.tagged_len());
        // a codec may hand back a short block; treat the rest as erased
        let short = inner.bytes.len() < self.tagged_len();
        inner.bytes.resize(self.tagged_len(), 0);

        let (message, tag) = inner.bytes.split_at(self.message_len);
        let valid = self.check.verify(message, tag);
        DecodedPacket {
            bytes: message.to_vec(),
            valid,
            fec_uncorrectable: outer.uncorrectable || inner.uncorrectable || short,
        }
    }
}
