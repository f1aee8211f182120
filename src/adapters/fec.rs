//! Block FEC codecs: pass-through, repeat-3 and extended Hamming(8,4)

use crate::domain::FecScheme;
use crate::ports::{FecCodec, FecDecoded};

/// Build the codec for a scheme
pub fn fec_codec(scheme: FecScheme) -> Box<dyn FecCodec> {
    match scheme {
        FecScheme::None => Box::new(NoFec),
        FecScheme::Repeat3 => Box::new(Repeat3),
        FecScheme::Hamming84 => Box::new(Hamming84::new()),
    }
}

/// Copy `encoded` into a buffer of exactly `len` bytes, zero-filling any shortfall
fn fit(encoded: &[u8], len: usize) -> (Vec<u8>, bool) {
    let mut bytes = encoded[..encoded.len().min(len)].to_vec();
    let short = bytes.len() < len;
    bytes.resize(len, 0);
    (bytes, short)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoFec;

impl FecCodec for NoFec {
    fn scheme(&self) -> FecScheme {
        FecScheme::None
    }

    fn encode(&self, message: &[u8]) -> Vec<u8> {
        message.to_vec()
    }

    fn decode(&self, encoded: &[u8], message_len: usize) -> FecDecoded {
        let (bytes, short) = fit(encoded, message_len);
        FecDecoded {
            bytes,
            uncorrectable: short,
        }
    }
}

/// Message sent three times; decoded by bitwise majority vote
#[derive(Debug, Default, Clone, Copy)]
pub struct Repeat3;

impl FecCodec for Repeat3 {
    fn scheme(&self) -> FecScheme {
        FecScheme::Repeat3
    }

    fn encode(&self, message: &[u8]) -> Vec<u8> {
        message.repeat(3)
    }

    fn decode(&self, encoded: &[u8], message_len: usize) -> FecDecoded {
        let (buf, short) = fit(encoded, 3 * message_len);
        let mut uncorrectable = short;
        let bytes = (0..message_len)
            .map(|i| {
                let (a, b, c) = (buf[i], buf[i + message_len], buf[i + 2 * message_len]);
                if a != b && b != c && a != c {
                    uncorrectable = true;
                }
                (a & b) | (a & c) | (b & c)
            })
            .collect();
        FecDecoded {
            bytes,
            uncorrectable,
        }
    }
}

/// Extended Hamming(8,4): corrects one bit error per nibble, detects two
#[derive(Debug, Clone)]
pub struct Hamming84 {
    codewords: [u8; 16],
}

impl Hamming84 {
    pub fn new() -> Self {
        let mut codewords = [0u8; 16];
        for (nibble, word) in codewords.iter_mut().enumerate() {
            let d = |i: usize| ((nibble >> (3 - i)) & 1) as u8;
            let p1 = d(0) ^ d(1) ^ d(3);
            let p2 = d(0) ^ d(2) ^ d(3);
            let p3 = d(1) ^ d(2) ^ d(3);
            let bits = [p1, p2, d(0), p3, d(1), d(2), d(3)];
            let mut w = bits.iter().fold(0u8, |acc, &b| (acc << 1) | b);
            // overall parity in the least significant bit
            w = (w << 1) | (w.count_ones() as u8 & 1);
            *word = w;
        }
        Self { codewords }
    }

    /// Nearest codeword's nibble and Hamming distance to it
    fn decode_word(&self, received: u8) -> (u8, u32) {
        let mut best = (0u8, u32::MAX);
        for (nibble, &word) in self.codewords.iter().enumerate() {
            let dist = (received ^ word).count_ones();
            if dist < best.1 {
                best = (nibble as u8, dist);
            }
        }
        best
    }
}

impl Default for Hamming84 {
    fn default() -> Self {
        Self::new()
    }
}

impl FecCodec for Hamming84 {
    fn scheme(&self) -> FecScheme {
        FecScheme::Hamming84
    }

    fn encode(&self, message: &[u8]) -> Vec<u8> {
        message
            .iter()
            .flat_map(|&b| [self.codewords[(b >> 4) as usize], self.codewords[(b & 0x0f) as usize]])
            .collect()
    }

    fn decode(&self, encoded: &[u8], message_len: usize) -> FecDecoded {
        let (buf, short) = fit(encoded, 2 * message_len);
        let mut uncorrectable = short;
        let bytes = buf
            .chunks_exact(2)
            .map(|pair| {
                let (hi, d_hi) = self.decode_word(pair[0]);
                let (lo, d_lo) = self.decode_word(pair[1]);
                if d_hi > 1 || d_lo > 1 {
                    uncorrectable = true;
                }
                (hi << 4) | lo
            })
            .collect();
        FecDecoded {
            bytes,
            uncorrectable,
        }
    }
}
