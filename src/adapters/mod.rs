//! Adapters (implementations of port traits)
//!
//! Concrete collaborators the synchronizer is built with by default:
//! root-Nyquist filter design, constellation modems, FEC and CRC services.

pub mod crc;
pub mod fec;
pub mod linear_modem;
pub mod rnyquist;

pub use self::crc::CrcCheck;
pub use fec::{fec_codec, Hamming84, NoFec, Repeat3};
pub use linear_modem::LinearModem;
pub use rnyquist::{design_rrc, RootNyquistDesigner};
