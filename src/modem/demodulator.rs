//! Symbol demodulation and bit repacking
//!
//! Bytes travel MSB first: each symbol takes the next `bps` bits of the
//! byte stream and the final symbol is zero-padded.

use crate::adapters::LinearModem;
use crate::domain::{ModulationScheme, Sample};
use crate::ports::Modem;

/// Number of `bps`-bit symbols needed to carry `num_bytes`
pub fn symbol_count(num_bytes: usize, bits_per_symbol: u32) -> usize {
    (8 * num_bytes).div_ceil(bits_per_symbol.max(1) as usize)
}

/// Split bytes into `bps`-bit symbol indices
pub fn pack_symbols(bytes: &[u8], bits_per_symbol: u32) -> Vec<u32> {
    let bps = bits_per_symbol.max(1);
    let mut symbols = Vec::with_capacity(symbol_count(bytes.len(), bps));
    let mut acc: u32 = 0;
    let mut held = 0u32;
    for &byte in bytes {
        for bit in (0..8).rev() {
            acc = (acc << 1) | ((byte >> bit) & 1) as u32;
            held += 1;
            if held == bps {
                symbols.push(acc);
                acc = 0;
                held = 0;
            }
        }
    }
    if held > 0 {
        symbols.push(acc << (bps - held));
    }
    symbols
}

/// Reassemble `num_bytes` from symbol indices; missing bits read as zero
pub fn unpack_symbols(symbols: &[u32], bits_per_symbol: u32, num_bytes: usize) -> Vec<u8> {
    let bps = bits_per_symbol.max(1);
    let mut bytes = vec![0u8; num_bytes];
    let bits = symbols
        .iter()
        .flat_map(|&s| (0..bps).rev().map(move |bit| ((s >> bit) & 1) as u8));
    for (i, bit) in bits.take(8 * num_bytes).enumerate() {
        bytes[i / 8] |= bit << (7 - i % 8);
    }
    bytes
}

/// Collects hard decisions for a fixed number of bytes
pub struct SymbolDemodulator {
    modem: Box<dyn Modem>,
    num_bytes: usize,
    num_symbols: usize,
    symbols: Vec<u32>,
}

impl SymbolDemodulator {
    pub fn new(scheme: ModulationScheme, num_bytes: usize) -> Self {
        Self::with_modem(Box::new(LinearModem::new(scheme)), num_bytes)
    }

    pub fn with_modem(modem: Box<dyn Modem>, num_bytes: usize) -> Self {
        let num_symbols = symbol_count(num_bytes, modem.bits_per_symbol());
        Self {
            modem,
            num_bytes,
            num_symbols,
            symbols: Vec::with_capacity(num_symbols),
        }
    }

    pub fn modem(&self) -> &dyn Modem {
        self.modem.as_ref()
    }

    /// Symbols needed before [`is_complete`](Self::is_complete)
    pub fn num_symbols(&self) -> usize {
        self.num_symbols
    }

    /// Symbols received so far
    pub fn received(&self) -> usize {
        self.symbols.len()
    }

    /// Demodulate one equalized symbol; returns true once all symbols are in
    pub fn push(&mut self, sample: Sample) -> bool {
        if self.symbols.len() < self.num_symbols {
            self.symbols.push(self.modem.demodulate(sample));
        }
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.symbols.len() >= self.num_symbols
    }

    /// Bytes decided so far (unreceived bits read as zero)
    pub fn bytes(&self) -> Vec<u8> {
        unpack_symbols(&self.symbols, self.modem.bits_per_symbol(), self.num_bytes)
    }

    pub fn reset(&mut self) {
        self.symbols.clear();
    }
}
