//! Integrity checks backed by the `crc` crate

use crc::{Crc, CRC_16_IBM_3740, CRC_32_ISO_HDLC, CRC_8_SMBUS};

use crate::domain::CrcScheme;
use crate::ports::IntegrityCheck;

const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Integrity check for any [`CrcScheme`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrcCheck {
    scheme: CrcScheme,
}

impl CrcCheck {
    pub fn new(scheme: CrcScheme) -> Self {
        Self { scheme }
    }
}

/// Two's complement of the byte sum, so that data + tag sums to zero
fn checksum(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    (!sum).wrapping_add(1)
}

impl IntegrityCheck for CrcCheck {
    fn scheme(&self) -> CrcScheme {
        self.scheme
    }

    fn generate(&self, data: &[u8]) -> Vec<u8> {
        match self.scheme {
            CrcScheme::None => Vec::new(),
            CrcScheme::Checksum => vec![checksum(data)],
            CrcScheme::Crc8 => vec![CRC8.checksum(data)],
            CrcScheme::Crc16 => CRC16.checksum(data).to_le_bytes().to_vec(),
            CrcScheme::Crc32 => CRC32.checksum(data).to_le_bytes().to_vec(),
        }
    }
}
