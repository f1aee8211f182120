//! Data scrambler
//!
//! XORs every byte with a short repeating mask so long runs of identical
//! bytes do not turn into runs of identical symbols.

const SCRAMBLE_MASK: [u8; 4] = [0xb4, 0x6a, 0x8b, 0xc5];

pub fn scramble(data: &mut [u8]) {
    for (byte, mask) in data.iter_mut().zip(SCRAMBLE_MASK.iter().cycle()) {
        *byte ^= mask;
    }
}

/// Inverse of [`scramble`] (the mask is its own inverse)
pub fn unscramble(data: &mut [u8]) {
    scramble(data);
}
