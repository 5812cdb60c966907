//! NMEA 0183 Protocol Implementation
//!
//! This crate turns the raw GNSS serial byte stream into typed fix updates.
//! It provides a byte-at-a-time sentence framer, XOR checksum verification
//! and decoders for the GGA, RMC and VTG sentence kinds.

mod decoder;
mod error;
mod framer;
mod sentence;

pub use decoder::{decode, FixUpdate, GgaUpdate, RmcUpdate, VtgUpdate};
pub use error::DecodeError;
pub use framer::{Framer, MAX_PAYLOAD_LEN};
pub use sentence::{CandidateSentence, SentenceKind};

/// NMEA 0183 framing constants
pub mod framing {
    /// Sentence start delimiter
    pub const START: u8 = b'$';
    /// Checksum field delimiter
    pub const CHECKSUM: u8 = b'*';
    /// First byte of the line terminator
    pub const CR: u8 = b'\r';
    /// Second byte of the line terminator
    pub const LF: u8 = b'\n';
}

/// Conversion factor from knots (RMC ground speed) to km/h
pub const KNOTS_TO_KMH: f64 = 1.852;
