//! Forward error correction port trait

use crate::domain::FecScheme;

/// Outcome of a best-effort FEC decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FecDecoded {
    pub bytes: Vec<u8>,
    /// Set when the decoder saw errors it could not correct. The bytes are
    /// still returned; only the integrity check decides validity.
    pub uncorrectable: bool,
}

/// Trait for a block FEC codec
pub trait FecCodec {
    fn scheme(&self) -> FecScheme;

    fn encoded_len(&self, message_len: usize) -> usize {
        self.scheme().encoded_len(message_len)
    }

    fn encode(&self, message: &[u8]) -> Vec<u8>;

    /// Decode `encoded` into `message_len` bytes
    ///
    /// Never fails: short input is treated as erased (zero) bytes and
    /// flagged as uncorrectable.
    fn decode(&self, encoded: &[u8], message_len: usize) -> FecDecoded;
}
