//! Frame modem
//!
//! Protocol layer on top of the DSP blocks: reference sequences, header
//! codec, packet coding, symbol demodulation, the test-vector transmitter
//! and the receiver state machine.

pub mod demodulator;
pub mod framegen;
pub mod framesync;
pub mod header;
pub mod packetizer;
pub mod scramble;
pub mod sequence;

pub use demodulator::SymbolDemodulator;
pub use framegen::{AssembledFrame, FrameGenerator};
pub use framesync::{FrameSync, SyncStateKind};
pub use header::{FrameHeader, PayloadProperties, PROTOCOL_VERSION};
pub use packetizer::{DecodedPacket, IntegrityDecoder};
pub use sequence::{msequence, reference_symbols};
