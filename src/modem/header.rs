//! Frame header codec
//!
//! Decoded header layout:
//!
//! ```text
//! user[n] | version | len_hi | len_lo | mod_id | crc_id<<5 + fec0_id | fec1_id
//! ```
//!
//! where the CRC and inner FEC identifiers share one byte (3 + 5 bits).

use crate::domain::{
    CrcScheme, FecScheme, ModulationScheme, SyncError, SyncResult, HEADER_PROTOCOL_BYTES,
};

/// Protocol version carried in every header
pub const PROTOCOL_VERSION: u8 = 101;

/// How a payload is checked, coded and modulated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadProperties {
    pub modulation: ModulationScheme,
    pub check: CrcScheme,
    pub fec_inner: FecScheme,
    pub fec_outer: FecScheme,
}

impl Default for PayloadProperties {
    fn default() -> Self {
        Self {
            modulation: ModulationScheme::Qpsk,
            check: CrcScheme::Crc32,
            fec_inner: FecScheme::None,
            fec_outer: FecScheme::Hamming84,
        }
    }
}

/// Decoded frame header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub user: Vec<u8>,
    /// Decoded payload length in bytes
    pub payload_len: u16,
    pub properties: PayloadProperties,
}

impl FrameHeader {
    /// Serialize into `user_length + 6` bytes, zero-padding the user section
    pub fn encode(&self, user_length: usize) -> SyncResult<Vec<u8>> {
        if self.user.len() > user_length {
            return Err(SyncError::Header(format!(
                "user section is {} bytes, header holds {user_length}",
                self.user.len()
            )));
        }
        let props = &self.properties;
        let mut bytes = Vec::with_capacity(user_length + HEADER_PROTOCOL_BYTES);
        bytes.extend_from_slice(&self.user);
        bytes.resize(user_length, 0);
        bytes.push(PROTOCOL_VERSION);
        bytes.extend_from_slice(&self.payload_len.to_be_bytes());
        bytes.push(props.modulation.id());
        bytes.push(((props.check.id() & 0x07) << 5) | (props.fec_inner.id() & 0x1f));
        bytes.push(props.fec_outer.id() & 0x1f);
        Ok(bytes)
    }

    /// Parse a decoded (integrity-checked) header
    pub fn parse(bytes: &[u8], user_length: usize) -> SyncResult<Self> {
        if bytes.len() != user_length + HEADER_PROTOCOL_BYTES {
            return Err(SyncError::Header(format!(
                "expected {} header bytes, got {}",
                user_length + HEADER_PROTOCOL_BYTES,
                bytes.len()
            )));
        }
        let (user, protocol) = bytes.split_at(user_length);

        if protocol[0] != PROTOCOL_VERSION {
            return Err(SyncError::Header(format!(
                "protocol version {} (expected {PROTOCOL_VERSION})",
                protocol[0]
            )));
        }
        let payload_len = u16::from_be_bytes([protocol[1], protocol[2]]);

        let modulation = ModulationScheme::from_id(protocol[3]).ok_or_else(|| {
            SyncError::Header(format!("unknown modulation scheme id {}", protocol[3]))
        })?;
        let check_id = (protocol[4] >> 5) & 0x07;
        let check = CrcScheme::from_id(check_id)
            .ok_or_else(|| SyncError::Header(format!("unknown check scheme id {check_id}")))?;
        let inner_id = protocol[4] & 0x1f;
        let fec_inner = FecScheme::from_id(inner_id)
            .ok_or_else(|| SyncError::Header(format!("unknown inner FEC id {inner_id}")))?;
        let outer_id = protocol[5] & 0x1f;
        let fec_outer = FecScheme::from_id(outer_id)
            .ok_or_else(|| SyncError::Header(format!("unknown outer FEC id {outer_id}")))?;

        Ok(Self {
            user: user.to_vec(),
            payload_len,
            properties: PayloadProperties {
                modulation,
                check,
                fec_inner,
                fec_outer,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> FrameHeader {
        FrameHeader {
            user: vec![1, 2, 3],
            payload_len: 300,
            properties: PayloadProperties {
                modulation: ModulationScheme::Psk8,
                check: CrcScheme::Crc16,
                fec_inner: FecScheme::Repeat3,
                fec_outer: FecScheme::Hamming84,
            },
        }
    }

    #[test]
    fn test_protocol_bytes() {
        let bytes = sample_header().encode(8).unwrap();
        assert_eq!(bytes.len(), 14);
        assert_eq!(&bytes[..8], &[1, 2, 3, 0, 0, 0, 0, 0]);
        // version, 300 big-endian, 8-PSK, CRC-16 | repeat(3), Hamming(8,4)
        assert_eq!(&bytes[8..], &[101, 0x01, 0x2c, 3, (4 << 5) | 2, 3]);
    }

    #[test]
    fn test_parse_encoded_header() {
        let header = sample_header();
        let bytes = header.encode(8).unwrap();
        let parsed = FrameHeader::parse(&bytes, 8).unwrap();
        assert_eq!(parsed.payload_len, 300);
        assert_eq!(parsed.properties, header.properties);
        assert_eq!(parsed.user, vec![1, 2, 3, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_rejects_oversized_user_section() {
        let header = FrameHeader {
            user: vec![0; 20],
            ..sample_header()
        };
        assert!(matches!(header.encode(14), Err(SyncError::Header(_))));
    }

    #[test]
    fn test_rejects_wrong_version() {
        let mut bytes = sample_header().encode(8).unwrap();
        bytes[8] = 100;
        assert!(matches!(FrameHeader::parse(&bytes, 8), Err(SyncError::Header(_))));
    }

    #[test]
    fn test_rejects_unknown_identifiers() {
        let good = sample_header().encode(8).unwrap();

        let mut bytes = good.clone();
        bytes[11] = 0;
        assert!(FrameHeader::parse(&bytes, 8).is_err(), "modulation id 0");

        let mut bytes = good.clone();
        bytes[12] = 7 << 5 | 2;
        assert!(FrameHeader::parse(&bytes, 8).is_err(), "check id 7");

        let mut bytes = good.clone();
        bytes[12] = (4 << 5) | 0x1f;
        assert!(FrameHeader::parse(&bytes, 8).is_err(), "inner fec id 31");

        let mut bytes = good;
        bytes[13] = 0;
        assert!(FrameHeader::parse(&bytes, 8).is_err(), "outer fec id 0");
    }

    #[test]
    fn test_rejects_wrong_length() {
        let bytes = sample_header().encode(8).unwrap();
        assert!(FrameHeader::parse(&bytes[..10], 8).is_err());
    }
}
