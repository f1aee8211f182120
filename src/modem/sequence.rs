//! Reference sequence generation
//!
//! Maximal-length sequences from a right-shifting Fibonacci LFSR. The
//! generator degree `d` is the smallest with `2^d >= length`, so the period
//! `2^d - 1` can fall one short: a 64-symbol preamble uses degree 6 and its
//! last symbol repeats the first. Lengths past the largest degree repeat
//! its period.

use crate::domain::{ReferenceSequence, Sample};

/// Feedback taps indexed by generator degree, each giving a maximal period
const GENERATOR_MASKS: [(u32, u32); 11] = [
    (2, 0b11),
    (3, 0b11),
    (4, 0b11),
    (5, 0b101),
    (6, 0b11),
    (7, 0b11),
    (8, 0x1d),
    (9, 0x11),
    (10, 0x9),
    (11, 0x5),
    (12, 0x53),
];

fn generator_for(length: usize) -> (u32, u32) {
    GENERATOR_MASKS
        .iter()
        .copied()
        .find(|&(degree, _)| (1usize << degree) >= length)
        .unwrap_or(GENERATOR_MASKS[GENERATOR_MASKS.len() - 1])
}

/// Antipodal m-sequence: bit 1 maps to +1, bit 0 to -1
pub fn msequence(length: usize) -> Vec<Sample> {
    let (degree, mask) = generator_for(length);
    let mut state: u32 = 1;
    (0..length)
        .map(|_| {
            let bit = state & 1;
            let feedback = (state & mask).count_ones() & 1;
            state = (state >> 1) | (feedback << (degree - 1));
            Sample::new(if bit == 1 { 1.0 } else { -1.0 }, 0.0)
        })
        .collect()
}

/// Expand a configured reference sequence into preamble symbols
pub fn reference_symbols(reference: &ReferenceSequence) -> Vec<Sample> {
    match reference {
        ReferenceSequence::MSequence { length } => msequence(*length),
        ReferenceSequence::Custom { symbols } => symbols.clone(),
    }
}
