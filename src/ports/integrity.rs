//! Integrity check port trait

use crate::domain::CrcScheme;

/// Trait for a CRC/checksum service
pub trait IntegrityCheck {
    fn scheme(&self) -> CrcScheme;

    fn tag_len(&self) -> usize {
        self.scheme().tag_len()
    }

    /// Compute the tag for `data`, least-significant byte first
    fn generate(&self, data: &[u8]) -> Vec<u8>;

    fn verify(&self, data: &[u8], tag: &[u8]) -> bool {
        tag.len() == self.tag_len() && self.generate(data) == tag
    }
}
